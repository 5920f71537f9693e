//! Annotation synonym table.
//!
//! Several annotation vocabularies say the same thing ("this field is
//! required", "use this JSON name"). The table maps each of them to one
//! canonical effect. It is data: supporting another vocabulary means adding
//! rows, never touching the builder.
//!
//! Resolution walks the rows in table order and the first row that yields a
//! value wins. Conflicting annotations are not an error; the order below is
//! the tie-break and it is fixed.
use serde_json::Value;

use crate::decl::{Annotation, find_annotation};

pub const COMPILED_JSON: &str = "compiled_json::CompiledJson";
pub const JSON_ATTRIBUTE: &str = "compiled_json::JsonAttribute";
pub const JSON_CONVERTER: &str = "compiled_json::JsonConverter";
pub const CONFIGURATION_TRAIT: &str = "compiled_json::Configuration";
pub const JACKSON_CREATOR: &str = "com.fasterxml.jackson.annotation.JsonCreator";
pub const JSONB_CREATOR: &str = "javax.json.bind.annotation.JsonbCreator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    Native,
    BeanValidation,
    Jsr305,
    Android,
    JetBrains,
    Jackson,
    Gson,
    Jsonb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Ignore,
    NonNull,
    Alias,
    Required,
    Creator,
    Index,
}

/// How a row reads its annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Presence alone yields `true`.
    Present,
    /// The accessor's value, when written.
    Accessor(&'static str),
    /// `true` when the accessor is written and equals the boolean.
    Equals(&'static str, bool),
    /// Presence yields `true` unless the accessor matches one of the gates;
    /// a `None` gate matches an accessor that was not written.
    Unless(&'static str, &'static [Option<bool>]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synonym {
    pub vocabulary: Vocabulary,
    pub annotation: &'static str,
    pub effect: Effect,
    pub rule: Rule,
}

const fn row(vocabulary: Vocabulary, annotation: &'static str, effect: Effect, rule: Rule) -> Synonym {
    Synonym { vocabulary, annotation, effect, rule }
}

use Effect::*;
use Rule::*;
use Vocabulary::*;

/// Priority-ordered. Native rows first, then third-party vocabularies.
pub static SYNONYMS: &[Synonym] = &[
    // ignore
    row(Native, JSON_ATTRIBUTE, Ignore, Equals("ignore", true)),
    row(Jackson, "com.fasterxml.jackson.annotation.JsonIgnore", Ignore, Present),
    row(Jsonb, "javax.json.bind.annotation.JsonbTransient", Ignore, Present),
    // non-null
    row(Native, JSON_ATTRIBUTE, NonNull, Equals("nullable", false)),
    row(BeanValidation, "javax.validation.constraints.NotNull", NonNull, Present),
    row(Jsr305, "javax.annotation.Nonnull", NonNull, Present),
    row(Android, "android.support.annotation.NonNull", NonNull, Present),
    row(JetBrains, "org.jetbrains.annotations.NotNull", NonNull, Present),
    row(Jsonb, "javax.json.bind.annotation.JsonbNillable", NonNull, Unless("value", &[None, Some(true)])),
    row(Jsonb, "javax.json.bind.annotation.JsonbProperty", NonNull, Unless("nillable", &[Some(true)])),
    // alias
    row(Native, JSON_ATTRIBUTE, Alias, Accessor("name")),
    row(Jackson, "com.fasterxml.jackson.annotation.JsonProperty", Alias, Accessor("value")),
    row(Gson, "com.google.gson.annotations.SerializedName", Alias, Accessor("value")),
    row(Jsonb, "javax.json.bind.annotation.JsonbProperty", Alias, Accessor("value")),
    // required
    row(Native, JSON_ATTRIBUTE, Required, Accessor("mandatory")),
    row(Jackson, "com.fasterxml.jackson.annotation.JsonProperty", Required, Equals("required", true)),
    // constructor marker
    row(Native, COMPILED_JSON, Creator, Present),
    row(Jackson, JACKSON_CREATOR, Creator, Present),
    row(Jsonb, JSONB_CREATOR, Creator, Present),
    // index
    row(Native, JSON_ATTRIBUTE, Index, Accessor("index")),
    row(Jackson, "com.fasterxml.jackson.annotation.JsonProperty", Index, Accessor("index")),
];

/// A resolved effect together with the row that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub value: Value,
    pub synonym: &'static Synonym,
    pub annotation: &'a Annotation,
}

impl Synonym {
    fn apply(&self, annotation: &Annotation) -> Option<Value> {
        match self.rule {
            Present => Some(Value::Bool(true)),
            Accessor(key) => annotation.value(key).filter(|v| !is_unset(v)).cloned(),
            Equals(key, expected) => {
                (annotation.bool_value(key) == Some(expected)).then_some(Value::Bool(true))
            }
            Unless(key, gates) => {
                let actual = annotation.bool_value(key);
                let gated = gates.iter().any(|gate| match gate {
                    None => annotation.value(key).is_none(),
                    Some(b) => actual == Some(*b),
                });
                (!gated).then_some(Value::Bool(true))
            }
        }
    }
}

/// Placeholder values that third-party vocabularies use for "not set".
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_i64().is_some_and(|i| i < 0),
        _ => false,
    }
}

/// First table row for `effect` that yields a value on `annotations`.
pub fn resolve<'a>(annotations: &'a [Annotation], effect: Effect) -> Option<Resolved<'a>> {
    SYNONYMS
        .iter()
        .filter(|s| s.effect == effect)
        .find_map(|synonym| {
            let annotation = find_annotation(annotations, synonym.annotation)?;
            let value = synonym.apply(annotation)?;
            Some(Resolved { value, synonym, annotation })
        })
}

pub fn resolve_bool(annotations: &[Annotation], effect: Effect) -> Option<bool> {
    resolve(annotations, effect).and_then(|r| r.value.as_bool())
}

pub fn resolve_str(annotations: &[Annotation], effect: Effect) -> Option<String> {
    resolve(annotations, effect).and_then(|r| r.value.as_str().map(str::to_string))
}

pub fn resolve_index(annotations: &[Annotation], effect: Effect) -> Option<u32> {
    resolve(annotations, effect).and_then(|r| r.value.as_u64()).and_then(|i| u32::try_from(i).ok())
}

/// Every row that would apply, in table order. Used to report interop
/// conflicts at INFO level.
pub fn matches<'a>(annotations: &'a [Annotation], effect: Effect) -> Vec<Resolved<'a>> {
    SYNONYMS
        .iter()
        .filter(|s| s.effect == effect)
        .filter_map(|synonym| {
            let annotation = find_annotation(annotations, synonym.annotation)?;
            let value = synonym.apply(annotation)?;
            Some(Resolved { value, synonym, annotation })
        })
        .collect()
}
