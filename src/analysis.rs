//! Type graph builder.
//!
//! Runs in two phases. `collect` registers every marked declaration by name
//! without looking at its members; `resolve` then builds the descriptors. An
//! attribute may therefore reference any declaration of the round regardless
//! of order, cycles included: references are by name, never by value.
pub mod attr;
pub mod ctor;
pub mod family;

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde_json::Value;

use crate::builtins::{self, Form, Prim};
use crate::decl::{
    find_annotation, Annotation, DeclId, DeclKind, Declaration, DeclarationSource, KnownTypes, VariantDecl, Visibility,
};
use crate::diagnostics::{Diagnostics, Location};
use crate::error::SchemaError;
use crate::ir::{
    AttributeDescriptor, EnumConstant, EnumInfo, ExternalInfo, FamilyInfo, Literal, Materialization, Nullability,
    StructInfo, TypeDescriptor, TypeGraph, TypeKind, ValueCodec, WireShape, WireShapes,
};
use crate::settings::{AnnotationUsage, Settings, UnknownTypes};
use crate::synonyms::{self, Effect, COMPILED_JSON, CONFIGURATION_TRAIT, JSON_ATTRIBUTE, JSON_CONVERTER};
use crate::types::{Container, ValueType};

use attr::Property;
use ctor::Selected;

pub const DEFAULT_DISCRIMINATOR: &str = "$type";
pub const DEFAULT_READER: &str = "JSON_READER";
pub const DEFAULT_WRITER: &str = "JSON_WRITER";

/// Build the closed type graph for one round.
///
/// Errors are reported into `diags`; the returned graph is only meaningful
/// when `diags.has_errors()` is false.
#[tracing::instrument(level = "debug", skip_all)]
pub fn analyze(
    source: &dyn DeclarationSource,
    known: &dyn KnownTypes,
    settings: &Settings,
    diags: &mut Diagnostics,
) -> TypeGraph {
    let mut analysis = Analysis::new(source, known, settings);
    analysis.process_converters(diags);
    analysis.collect(COMPILED_JSON);
    if settings.jackson {
        analysis.collect(synonyms::JACKSON_CREATOR);
    }
    if settings.jsonb {
        analysis.collect(synonyms::JSONB_CREATOR);
    }
    let graph = analysis.resolve(diags);
    tracing::debug!(types = graph.len(), configurations = graph.configurations.len(), "type graph built");
    graph
}

pub struct Analysis<'a> {
    source: &'a dyn DeclarationSource,
    known: &'a dyn KnownTypes,
    settings: &'a Settings,
    graph: TypeGraph,
    /// Declarations waiting for phase two; grows while resolving in
    /// implicit mode.
    pending: IndexMap<String, DeclId>,
}

impl<'a> Analysis<'a> {
    pub fn new(source: &'a dyn DeclarationSource, known: &'a dyn KnownTypes, settings: &'a Settings) -> Self {
        Self { source, known, settings, graph: TypeGraph::default(), pending: IndexMap::new() }
    }

    // ————————————————————————————————————————————————————————————————————————
    // PHASE ONE
    // ————————————————————————————————————————————————————————————————————————

    /// Register converter declarations. Their targets become external codecs;
    /// converters that are also a `Configuration` are listed separately.
    pub fn process_converters(&mut self, diags: &mut Diagnostics) {
        let source = self.source;
        for id in source.declarations_marked_with(JSON_CONVERTER) {
            let decl = source.declaration(id);
            let Some(marker) = decl.annotation(JSON_CONVERTER) else { continue };
            let location = || Location::decl(&decl.name).annotation(JSON_CONVERTER);

            let Some(target) = marker.str_value("target").filter(|t| !t.trim().is_empty()) else {
                let err = SchemaError::MissingConverterTarget { converter: decl.name.clone() };
                diags.error(err.to_string(), location());
                continue;
            };
            let target = match ValueType::parse(target) {
                Ok(ty) => ty.to_string(),
                Err(source) => {
                    let err = SchemaError::InvalidValueType { ty: decl.name.clone(), attribute: "target".into(), source };
                    diags.error(err.to_string(), location());
                    continue;
                }
            };
            let reader = marker.str_value("reader").unwrap_or(DEFAULT_READER);
            let writer = marker.str_value("writer").unwrap_or(DEFAULT_WRITER);

            let mut valid = true;
            for item in [reader, writer] {
                let exposed = decl
                    .fields
                    .iter()
                    .any(|f| f.name == item && f.is_static && f.visibility == Visibility::Public);
                if !exposed {
                    let err = SchemaError::InvalidConverter { converter: decl.name.clone(), item: item.to_string() };
                    diags.error(err.to_string(), location().member(item));
                    valid = false;
                }
            }
            if !valid {
                continue;
            }
            if let Some(existing) = self.graph.types.get(&target) {
                diags.warning(
                    format!("{target} already has converter {}; ignoring {}", existing.binary_name, decl.name),
                    location(),
                );
                continue;
            }

            let self_registering = decl.supertypes.iter().any(|s| s == CONFIGURATION_TRAIT);
            if self_registering {
                self.graph.configurations.insert(decl.name.clone(), id);
            }
            let descriptor = TypeDescriptor {
                name: target.clone(),
                binary_name: decl.name.clone(),
                decl: id,
                namespace_sealed: decl.sealed,
                kind: TypeKind::External(ExternalInfo {
                    converter: decl.name.clone(),
                    reader: reader.to_string(),
                    writer: writer.to_string(),
                    self_registering,
                }),
            };
            self.graph.types.insert(target, descriptor);
        }
    }

    /// Schedule every declaration carrying `marker`.
    pub fn collect(&mut self, marker: &str) {
        let source = self.source;
        for id in source.declarations_marked_with(marker) {
            let decl = source.declaration(id);
            if decl.is_marked_with(JSON_CONVERTER) {
                continue;
            }
            self.pending.entry(decl.name.clone()).or_insert(id);
        }
    }

    // ————————————————————————————————————————————————————————————————————————
    // PHASE TWO
    // ————————————————————————————————————————————————————————————————————————

    pub fn resolve(mut self, diags: &mut Diagnostics) -> TypeGraph {
        let source = self.source;
        let mut next = 0;
        while let Some((name, id)) = self.pending.get_index(next).map(|(n, id)| (n.clone(), *id)) {
            next += 1;
            if self.graph.types.contains_key(&name) {
                diags.info(format!("{name} is handled by a converter"), Location::decl(&name));
                continue;
            }
            if let Some(descriptor) = self.describe(id, diags) {
                self.graph.types.insert(name, descriptor);
            }
        }
        family::link(&mut self.graph, source, diags);
        self.graph
    }

    fn describe(&mut self, id: DeclId, diags: &mut Diagnostics) -> Option<TypeDescriptor> {
        let source = self.source;
        let decl = source.declaration(id);
        let kind = match decl.kind {
            DeclKind::Enum => TypeKind::Enum(describe_enum(decl, diags)?),
            DeclKind::Trait => TypeKind::Family(describe_family(decl)),
            DeclKind::Struct => TypeKind::Struct(self.describe_struct(decl, diags)?),
        };
        Some(TypeDescriptor {
            name: decl.name.clone(),
            binary_name: decl.name.clone(),
            decl: id,
            namespace_sealed: decl.sealed,
            kind,
        })
    }

    fn describe_struct(&mut self, decl: &'a Declaration, diags: &mut Diagnostics) -> Option<StructInfo> {
        let (shapes, preferred) = match wire_shapes(decl) {
            Ok(shapes) => shapes,
            Err(err) => {
                diags.error(err.to_string(), Location::decl(&decl.name).annotation(COMPILED_JSON));
                return None;
            }
        };

        let mut props = attr::collect_properties(decl);
        let selected = match ctor::select(decl, &props) {
            Ok(selected) => selected,
            Err(err) => {
                diags.error(err.to_string(), Location::decl(&decl.name));
                return None;
            }
        };

        // Which properties become attributes. A default-constructed struct
        // can only read what it can assign.
        let (kept, bindings): (Vec<usize>, Vec<usize>) = match &selected {
            Selected::Default { .. } => {
                let mut kept = Vec::new();
                for (i, prop) in props.iter().enumerate() {
                    if prop.write.is_some() {
                        kept.push(i);
                    } else {
                        diags.info(
                            format!("read-only property '{}' is not serialized", prop.name),
                            Location::decl(&decl.name).member(&prop.name),
                        );
                    }
                }
                (kept, Vec::new())
            }
            Selected::Construct { params, bindings, .. } => {
                if let Some(ctor) = params {
                    for (slot, &prop) in bindings.iter().enumerate() {
                        props[prop].annotations.extend(ctor.params[slot].annotations.iter().cloned());
                    }
                }
                ((0..props.len()).collect(), bindings.clone())
            }
        };

        let mut attributes = Vec::with_capacity(kept.len());
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut failed = false;
        for &i in &kept {
            match self.describe_attribute(decl, &props[i], diags) {
                Some(attribute) => {
                    position.insert(i, attributes.len());
                    attributes.push(attribute);
                }
                None => failed = true,
            }
        }
        if failed {
            return None;
        }

        assign_ordinals(&mut attributes);
        let collisions = check_collisions(&decl.name, &attributes);
        for err in &collisions {
            diags.error(err.to_string(), Location::decl(&decl.name).annotation(JSON_ATTRIBUTE));
        }
        if !collisions.is_empty() {
            return None;
        }

        let materialization = match selected {
            Selected::Default { via } => Materialization::DefaultThenMutate { via },
            Selected::Construct { ctor, .. } => Materialization::ConstructFromArgs {
                ctor,
                args: bindings.iter().filter_map(|p| position.get(p).copied()).collect(),
            },
        };

        let type_alias = decl
            .annotation(COMPILED_JSON)
            .and_then(|m| m.str_value("name"))
            .filter(|n| !n.is_empty())
            .unwrap_or(decl.name.as_str())
            .to_string();

        Some(StructInfo { shapes, preferred, materialization, attributes, type_alias })
    }

    fn describe_attribute(
        &mut self,
        decl: &Declaration,
        prop: &Property<'_>,
        diags: &mut Diagnostics,
    ) -> Option<AttributeDescriptor> {
        let annotations = prop.annotations.as_slice();
        let location = || Location::decl(&decl.name).member(&prop.name);

        let value_type = match ValueType::parse(prop.ty) {
            Ok(ty) => ty,
            Err(source) => {
                let err = SchemaError::InvalidValueType { ty: decl.name.clone(), attribute: prop.name.clone(), source };
                diags.error(err.to_string(), location());
                return None;
            }
        };

        for effect in [Effect::Ignore, Effect::NonNull, Effect::Alias, Effect::Required, Effect::Index] {
            report_conflicts(annotations, effect, diags, location());
        }

        let ignored = synonyms::resolve_bool(annotations, Effect::Ignore).unwrap_or(false);
        let external_name = synonyms::resolve_str(annotations, Effect::Alias).unwrap_or_else(|| prop.name.clone());
        let non_null = synonyms::resolve_bool(annotations, Effect::NonNull).unwrap_or(false);
        let nullability =
            if value_type.is_option() && !non_null { Nullability::Nullable } else { Nullability::NonNull };
        let required = synonyms::resolve_bool(annotations, Effect::Required).unwrap_or(false);
        let explicit_index = synonyms::resolve_index(annotations, Effect::Index);

        // ignored attributes never reach a codec, so their types need not resolve
        let codec = if ignored {
            ValueCodec::Generic { type_name: value_type.to_string() }
        } else {
            self.codec_for(&value_type, decl, &prop.name, diags)
        };

        let explicit = find_annotation(annotations, JSON_ATTRIBUTE)
            .and_then(|a| a.value("default"))
            .filter(|v| !v.is_null());
        let (default, explicit_default) = match explicit.map(|v| (v, Literal::from_json(v))) {
            Some((raw, Some(literal))) => {
                let checked = match (&codec, builtins::lookup(&value_type)) {
                    (ValueCodec::Generic { .. }, Some(builtin)) => {
                        self.typed_default(literal, &ValueCodec::Builtin(builtin))
                    }
                    (ValueCodec::Generic { .. }, None) => Ok(literal),
                    _ => self.typed_default(literal, &codec),
                };
                match checked {
                    Ok(literal) => (literal, true),
                    Err(expected) => {
                        let err = SchemaError::InvalidDefault {
                            ty: decl.name.clone(),
                            attribute: prop.name.clone(),
                            value: raw.to_string(),
                            expected,
                        };
                        diags.error(err.to_string(), location().annotation(JSON_ATTRIBUTE));
                        return None;
                    }
                }
            }
            Some((raw, None)) => {
                diags.warning(format!("default {raw} is not a literal; using the type default"), location());
                (builtins::default_literal(&value_type), false)
            }
            None => (builtins::default_literal(&value_type), false),
        };

        Some(AttributeDescriptor {
            name: prop.name.clone(),
            external_name,
            value_type,
            codec,
            nullability,
            required,
            ordinal: 0,
            explicit_index,
            ignored,
            default,
            explicit_default,
            read: prop.read.clone(),
            write: prop.write.clone(),
        })
    }

    // ————————————————————————————————————————————————————————————————————————
    // CODEC RESOLUTION
    // ————————————————————————————————————————————————————————————————————————

    fn codec_for(&mut self, ty: &ValueType, owner: &Declaration, attribute: &str, diags: &mut Diagnostics) -> ValueCodec {
        match self.resolve_codec(ty) {
            Ok(codec) => codec,
            Err(Unresolved::Unboxed(family)) => {
                let err = SchemaError::UnboxedFamily { ty: owner.name.clone(), attribute: attribute.to_string(), family };
                diags.error(err.to_string(), Location::decl(&owner.name).member(attribute));
                ValueCodec::Generic { type_name: ty.to_string() }
            }
            Err(Unresolved::Unknown(unresolved)) => {
                let err = SchemaError::UnknownType {
                    ty: owner.name.clone(),
                    attribute: attribute.to_string(),
                    value_type: unresolved,
                };
                let location = Location::decl(&owner.name).member(attribute);
                match self.settings.unknown_types {
                    UnknownTypes::Error => diags.error(err.to_string(), location),
                    UnknownTypes::Warning => diags.warning(err.to_string(), location),
                    UnknownTypes::Ignore => {}
                }
                ValueCodec::Generic { type_name: ty.to_string() }
            }
        }
    }

    /// Built-in first, then containers, then graph, known and (in implicit
    /// mode) unmarked declarations.
    fn resolve_codec(&mut self, ty: &ValueType) -> Result<ValueCodec, Unresolved> {
        if let Some(builtin) = builtins::lookup(ty) {
            return Ok(ValueCodec::Builtin(builtin));
        }
        match ty.container() {
            Some(Container::Option(inner)) => return Ok(ValueCodec::Optional(Box::new(self.resolve_codec(inner)?))),
            Some(Container::List(inner)) => return Ok(ValueCodec::List(Box::new(self.resolve_codec(inner)?))),
            Some(Container::Map(inner)) => return Ok(ValueCodec::Map(Box::new(self.resolve_codec(inner)?))),
            Some(Container::Boxed(inner)) if inner.is_dyn => {
                return match self.is_family(&inner.path) && self.is_scheduled(&inner.path) {
                    true => Ok(ValueCodec::Family { type_name: inner.path.clone() }),
                    false => Err(Unresolved::Unknown(inner.to_string())),
                };
            }
            Some(Container::Boxed(inner)) => return Ok(ValueCodec::Boxed(Box::new(self.resolve_codec(inner)?))),
            None => {}
        }
        if ty.is_dyn || self.is_family(&ty.path) {
            return Err(Unresolved::Unboxed(ty.path.clone()));
        }

        let name = ty.to_string();
        if self.is_scheduled(&name) {
            return Ok(ValueCodec::Reference { type_name: name });
        }
        if self.known.is_known(&name) {
            return Ok(ValueCodec::Known { type_name: name });
        }
        if self.settings.annotation_usage == AnnotationUsage::Implicit && ty.args.is_empty() {
            let source = self.source;
            if let Some(id) = source.lookup(&name) {
                if !source.declaration(id).is_marked_with(JSON_CONVERTER) {
                    tracing::debug!(ty = %name, "unmarked declaration pulled into the graph");
                    self.pending.insert(name.clone(), id);
                    return Ok(ValueCodec::Reference { type_name: name });
                }
            }
        }
        Err(Unresolved::Unknown(name))
    }

    /// Marked, or already pulled in.
    fn is_scheduled(&self, name: &str) -> bool {
        self.pending.contains_key(name) || self.graph.types.contains_key(name)
    }

    fn is_family(&self, name: &str) -> bool {
        self.source.lookup(name).is_some_and(|id| self.source.declaration(id).kind == DeclKind::Trait)
    }

    /// Enum declared in this round, unless a converter owns the type.
    fn enum_decl(&self, name: &str) -> Option<&'a Declaration> {
        if matches!(self.graph.get(name).map(|d| &d.kind), Some(TypeKind::External(_))) {
            return None;
        }
        let source = self.source;
        let decl = source.declaration(source.lookup(name)?);
        (decl.kind == DeclKind::Enum).then_some(decl)
    }

    /// Check an explicit default against the attribute's codec. `Err` says
    /// what was expected.
    fn typed_default(&self, literal: Literal, codec: &ValueCodec) -> Result<Literal, &'static str> {
        match codec {
            ValueCodec::Builtin(builtin) if builtin.form == Form::List => match literal {
                Literal::EmptyList => Ok(literal),
                _ => Err("an empty list"),
            },
            ValueCodec::Builtin(builtin) => prim_default(literal, builtin.prim),
            ValueCodec::Optional(inner) => self.typed_default(literal, inner),
            ValueCodec::List(_) => match literal {
                Literal::EmptyList => Ok(literal),
                _ => Err("an empty list"),
            },
            ValueCodec::Map(_) => match literal {
                Literal::EmptyMap => Ok(literal),
                _ => Err("an empty object"),
            },
            ValueCodec::Boxed(_) => match literal {
                Literal::EmptyMap => Ok(Literal::TypeDefault),
                _ => Err("an empty object"),
            },
            ValueCodec::Family { .. } => Err("supported on a family attribute"),
            ValueCodec::Reference { type_name } => match (self.enum_decl(type_name), literal) {
                (Some(decl), Literal::Str(value)) => enum_constant(decl, &value)
                    .map(|name| Literal::Variant { type_name: type_name.clone(), name })
                    .ok_or("one of the enum's constants"),
                (Some(_), _) => Err("one of the enum's constants"),
                (None, Literal::EmptyMap) => Ok(Literal::TypeDefault),
                (None, _) => Err("an empty object"),
            },
            ValueCodec::Known { .. } | ValueCodec::Generic { .. } => Ok(literal),
        }
    }
}

/// Why an attribute type has no codec.
enum Unresolved {
    /// Innermost type nobody knows.
    Unknown(String),
    /// A family (or `dyn` type) held without `Box<dyn _>`.
    Unboxed(String),
}

// ————————————————————————————————————————————————————————————————————————————
// HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn prim_default(literal: Literal, prim: Prim) -> Result<Literal, &'static str> {
    if let Some((min, max)) = prim.int_range() {
        return match literal {
            Literal::Int(i) if (min..=max).contains(&i128::from(i)) => Ok(literal),
            _ => Err("an integer in range"),
        };
    }
    match (prim, literal) {
        (Prim::F32 | Prim::F64, literal @ (Literal::Int(_) | Literal::Float(_))) => Ok(literal),
        (Prim::F32 | Prim::F64, _) => Err("a number"),
        (Prim::Bool, literal @ Literal::Bool(_)) => Ok(literal),
        (Prim::Bool, _) => Err("a boolean"),
        (Prim::Str, literal @ Literal::Str(_)) => Ok(literal),
        (Prim::Str, _) => Err("a string"),
        (Prim::Char, Literal::Str(s)) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Literal::Char(c)),
                _ => Err("a single character"),
            }
        }
        (Prim::Char, _) => Err("a single character"),
        _ => Err("expressible as a literal"),
    }
}

/// Variant for a default given by external or declared name.
fn enum_constant(decl: &Declaration, value: &str) -> Option<String> {
    let external =
        |v: &VariantDecl| synonyms::resolve_str(&v.annotations, Effect::Alias).unwrap_or_else(|| v.name.clone());
    decl.variants
        .iter()
        .find(|v| external(v) == value)
        .or_else(|| decl.variants.iter().find(|v| v.name == value))
        .map(|v| v.name.clone())
}

fn describe_enum(decl: &Declaration, diags: &mut Diagnostics) -> Option<EnumInfo> {
    let mut constants: Vec<EnumConstant> = Vec::new();
    let mut failed = false;
    let mut partial = false;
    for variant in &decl.variants {
        if synonyms::resolve_bool(&variant.annotations, Effect::Ignore) == Some(true) {
            partial = true;
            continue;
        }
        let external_name =
            synonyms::resolve_str(&variant.annotations, Effect::Alias).unwrap_or_else(|| variant.name.clone());
        if let Some(first) = constants.iter().find(|c| c.external_name == external_name) {
            let err = SchemaError::DuplicateName {
                ty: decl.name.clone(),
                name: external_name.clone(),
                first: first.name.clone(),
                second: variant.name.clone(),
            };
            diags.error(err.to_string(), Location::decl(&decl.name).member(&variant.name));
            failed = true;
            continue;
        }
        constants.push(EnumConstant { name: variant.name.clone(), external_name });
    }
    (!failed).then_some(EnumInfo { constants, partial })
}

fn describe_family(decl: &Declaration) -> FamilyInfo {
    let marker = decl.annotation(COMPILED_JSON);
    let discriminator = marker
        .and_then(|m| m.str_value("discriminator"))
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DISCRIMINATOR)
        .to_string();
    let deserialize_as = marker
        .and_then(|m| m.str_value("deserialize_as"))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    FamilyInfo { discriminator, members: Vec::new(), deserialize_as }
}

/// Shapes from `CompiledJson.formats`; object only when unset.
fn wire_shapes(decl: &Declaration) -> Result<(WireShapes, WireShape), SchemaError> {
    let marker = decl.annotation(COMPILED_JSON);
    let invalid = |value: String| SchemaError::InvalidFormat { ty: decl.name.clone(), value };

    let names: Vec<&Value> = match marker.and_then(|m| m.value("formats")) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };
    let mut shapes = WireShapes::default();
    for name in names {
        match name.as_str().map(str::to_ascii_lowercase).as_deref() {
            Some("object") => shapes.object = true,
            Some("array") => shapes.array = true,
            Some(other) => return Err(invalid(other.to_string())),
            None => return Err(invalid(name.to_string())),
        }
    }
    if shapes.is_empty() {
        shapes = WireShapes::OBJECT;
    }

    let object_first = marker.and_then(|m| m.bool_value("object_format_first")).unwrap_or(true);
    let preferred = match (shapes.object, shapes.array) {
        (true, true) if !object_first => WireShape::Array,
        (true, _) => WireShape::Object,
        _ => WireShape::Array,
    };
    Ok((shapes, preferred))
}

/// Explicit indices first (ascending), then declaration order. Ignored
/// attributes go last.
fn assign_ordinals(attributes: &mut [AttributeDescriptor]) {
    let mut order: Vec<usize> = (0..attributes.len()).collect();
    order.sort_by_key(|&i| {
        let a = &attributes[i];
        (a.ignored, a.explicit_index.is_none(), a.explicit_index, i)
    });
    for (ordinal, i) in order.into_iter().enumerate() {
        attributes[i].ordinal = ordinal;
    }
}

fn check_collisions(ty: &str, attributes: &[AttributeDescriptor]) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let mut names: HashMap<&str, &str> = HashMap::new();
    let mut indices: HashMap<u32, &str> = HashMap::new();
    for attribute in attributes.iter().filter(|a| !a.ignored) {
        if let Some(first) = names.insert(&attribute.external_name, &attribute.name) {
            errors.push(SchemaError::DuplicateName {
                ty: ty.to_string(),
                name: attribute.external_name.clone(),
                first: first.to_string(),
                second: attribute.name.clone(),
            });
        }
        if let Some(index) = attribute.explicit_index {
            if let Some(first) = indices.insert(index, &attribute.name) {
                errors.push(SchemaError::DuplicateIndex {
                    ty: ty.to_string(),
                    index,
                    first: first.to_string(),
                    second: attribute.name.clone(),
                });
            }
        }
    }
    errors
}

/// Conflicting vocabularies are allowed; the table order decides. Tell the
/// user at INFO level which row won.
fn report_conflicts(annotations: &[Annotation], effect: Effect, diags: &mut Diagnostics, location: Location) {
    let matches = synonyms::matches(annotations, effect);
    let distinct: BTreeSet<String> = matches.iter().map(|m| m.value.to_string()).collect();
    if distinct.len() > 1 {
        let winner = &matches[0];
        diags.info(
            format!("conflicting {effect:?} annotations; using {} from {}", winner.value, winner.annotation.name),
            location.annotation(winner.annotation.name.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{InMemorySource, KnownBy, NoKnownTypes};
    use crate::ir::{Access, Constructor};
    use crate::settings::LogLevel;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn source(decls: Value) -> InMemorySource {
        let decls: Vec<Declaration> = serde_json::from_value(decls).unwrap();
        decls.into_iter().collect()
    }

    fn run(source: &InMemorySource, settings: &Settings) -> (TypeGraph, Diagnostics) {
        let mut diags = Diagnostics::new(LogLevel::Info);
        let graph = analyze(source, &NoKnownTypes, settings, &mut diags);
        (graph, diags)
    }

    fn errors(diags: &Diagnostics) -> Vec<String> {
        diags
            .iter()
            .filter(|d| d.severity == crate::diagnostics::Severity::Error)
            .map(|d| d.message.clone())
            .collect()
    }

    fn marked(extra: Value) -> Value {
        let mut annotation = json!({ "name": COMPILED_JSON });
        if !extra.is_null() {
            annotation["values"] = extra;
        }
        json!([annotation])
    }

    #[test]
    fn point_with_default_materializer() {
        let src = source(json!([{
            "name": "geo::Point",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [{ "name": "x", "ty": "i32" }, { "name": "y", "ty": "i32" }]
        }]));
        let (graph, diags) = run(&src, &Settings::default());
        assert!(!diags.has_errors(), "{:?}", diags.into_vec());
        let point = graph.get("geo::Point").unwrap().as_struct().unwrap();
        assert_eq!(point.shapes, WireShapes::OBJECT);
        assert_eq!(point.materialization, Materialization::DefaultThenMutate { via: None });
        assert_eq!(point.type_alias, "geo::Point");
        let names: Vec<_> = point.by_ordinal().iter().map(|a| a.external_name.clone()).collect();
        assert_eq!(names, ["x", "y"]);
        assert!(matches!(point.attributes[0].codec, ValueCodec::Builtin(b) if b.key == "i32"));
        assert_eq!(point.attributes[0].write, Some(Access::Field("x".into())));
    }

    #[test]
    fn both_shapes_and_preferred_array() {
        let src = source(json!([{
            "name": "P",
            "annotations": marked(json!({ "formats": ["array", "object"], "object_format_first": false })),
            "fields": [{ "name": "x", "ty": "i32" }]
        }]));
        let (graph, _) = run(&src, &Settings::default());
        let p = graph.get("P").unwrap().as_struct().unwrap();
        assert!(p.shapes.is_both());
        assert_eq!(p.preferred, WireShape::Array);
        assert!(matches!(
            &p.materialization,
            Materialization::ConstructFromArgs { ctor: Constructor::Literal, args } if args == &vec![0]
        ));
    }

    #[test]
    fn unknown_format_is_an_error() {
        let src = source(json!([{ "name": "P", "annotations": marked(json!({ "formats": "xml" })) }]));
        let (_, diags) = run(&src, &Settings::default());
        assert_eq!(errors(&diags), ["P declares unknown format 'xml' (expected 'object' or 'array')"]);
    }

    #[test]
    fn explicit_indices_come_first() {
        let src = source(json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [
                { "name": "a", "ty": "i32" },
                { "name": "b", "ty": "i32", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "index": 1 } }] },
                { "name": "c", "ty": "i32", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "index": 0 } }] },
                { "name": "d", "ty": "i32" }
            ]
        }]));
        let (graph, _) = run(&src, &Settings::default());
        let r = graph.get("R").unwrap().as_struct().unwrap();
        let order: Vec<_> = r.by_ordinal().iter().map(|a| a.name.clone()).collect();
        assert_eq!(order, ["c", "b", "a", "d"]);
    }

    #[test]
    fn duplicate_index_is_a_schema_error() {
        let index = |i: u32| json!([{ "name": JSON_ATTRIBUTE, "values": { "index": i } }]);
        let src = source(json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [
                { "name": "a", "ty": "i32", "annotations": index(1) },
                { "name": "b", "ty": "i32", "annotations": index(1) }
            ]
        }]));
        let (graph, diags) = run(&src, &Settings::default());
        assert_eq!(errors(&diags), ["duplicate index 1 on R (attributes 'a' and 'b')"]);
        assert!(graph.get("R").is_none());
    }

    #[test]
    fn ignored_attributes_do_not_collide() {
        let src = source(json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [
                { "name": "a", "ty": "i32", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "name": "v" } }] },
                { "name": "b", "ty": "mystery::Blob", "annotations": [
                    { "name": "com.fasterxml.jackson.annotation.JsonIgnore" },
                    { "name": JSON_ATTRIBUTE, "values": { "name": "v" } }
                ] }
            ]
        }]));
        let (graph, diags) = run(&src, &Settings::default());
        assert!(!diags.has_errors());
        let r = graph.get("R").unwrap().as_struct().unwrap();
        assert!(r.attributes[1].ignored);
        assert_eq!(r.by_ordinal().len(), 1);
    }

    #[test]
    fn duplicate_alias_is_a_schema_error() {
        let alias = json!([{ "name": "com.google.gson.annotations.SerializedName", "values": { "value": "n" } }]);
        let src = source(json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [
                { "name": "n", "ty": "i32" },
                { "name": "m", "ty": "i32", "annotations": alias }
            ]
        }]));
        let (_, diags) = run(&src, &Settings::default());
        assert_eq!(errors(&diags), ["duplicate JSON name 'n' on R (attributes 'n' and 'm')"]);
    }

    #[test]
    fn unknown_type_policy() {
        let decls = json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [{ "name": "blob", "ty": "Vec<mystery::Blob>" }]
        }]);
        let src = source(decls);

        let (_, diags) = run(&src, &Settings::default());
        assert_eq!(
            errors(&diags),
            ["unable to resolve JSON codec for type 'mystery::Blob' used by R.blob"]
        );

        let warn = Settings { unknown_types: UnknownTypes::Warning, ..Settings::default() };
        let (graph, diags) = run(&src, &warn);
        assert!(!diags.has_errors());
        assert_eq!(diags.iter().filter(|d| d.severity == crate::diagnostics::Severity::Warning).count(), 1);
        let r = graph.get("R").unwrap().as_struct().unwrap();
        assert_eq!(r.attributes[0].codec, ValueCodec::Generic { type_name: "Vec<mystery::Blob>".into() });

        let ignore = Settings { unknown_types: UnknownTypes::Ignore, ..Settings::default() };
        let (_, diags) = run(&src, &ignore);
        assert_eq!(diags.iter().count(), 0);
    }

    #[test]
    fn implicit_mode_pulls_unmarked_declarations() {
        let src = source(json!([
            {
                "name": "shop::Order",
                "annotations": marked(Value::Null),
                "supertypes": ["Default"],
                "fields": [{ "name": "lines", "ty": "Vec<shop::Line>" }]
            },
            {
                "name": "shop::Line",
                "supertypes": ["Default"],
                "fields": [{ "name": "qty", "ty": "i32" }, { "name": "order", "ty": "Option<shop::Order>" }]
            }
        ]));
        let (graph, diags) = run(&src, &Settings::default());
        assert!(!diags.has_errors());
        let names: Vec<_> = graph.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["shop::Order", "shop::Line"]);
        let line = graph.get("shop::Line").unwrap().as_struct().unwrap();
        assert_eq!(
            line.attributes[1].codec,
            ValueCodec::Optional(Box::new(ValueCodec::Reference { type_name: "shop::Order".into() }))
        );
        assert_eq!(line.attributes[1].nullability, Nullability::Nullable);

        let explicit = Settings { annotation_usage: AnnotationUsage::Explicit, ..Settings::default() };
        let (graph, diags) = run(&src, &explicit);
        assert!(diags.has_errors());
        assert!(graph.get("shop::Line").is_none());
    }

    #[test]
    fn families_collect_members_and_check_default() {
        let src = source(json!([
            {
                "name": "zoo::Animal",
                "kind": "trait",
                "annotations": marked(json!({ "discriminator": "kind", "deserialize_as": "zoo::Cat" }))
            },
            {
                "name": "zoo::Dog",
                "annotations": marked(json!({ "name": "dog" })),
                "supertypes": ["Default", "zoo::Animal"],
                "fields": [{ "name": "name", "ty": "String" }]
            }
        ]));
        let (graph, diags) = run(&src, &Settings::default());
        let TypeKind::Family(family) = &graph.get("zoo::Animal").unwrap().kind else { panic!("not a family") };
        assert_eq!(family.discriminator, "kind");
        assert_eq!(family.members, ["zoo::Dog"]);
        assert_eq!(graph.get("zoo::Dog").unwrap().as_struct().unwrap().type_alias, "dog");
        assert_eq!(errors(&diags), ["deserialize_as target 'zoo::Cat' is not a member of family zoo::Animal"]);
    }

    #[test]
    fn converters_become_external_codecs() {
        let converter = |name: &str, supertypes: Value| {
            json!({
                "name": name,
                "annotations": [{ "name": JSON_CONVERTER, "values": { "target": "money::Money" } }],
                "supertypes": supertypes,
                "fields": [
                    { "name": "JSON_READER", "ty": "Reader", "is_static": true },
                    { "name": "JSON_WRITER", "ty": "Writer", "is_static": true }
                ]
            })
        };
        let src = source(json!([converter("money::MoneyConverter", json!([CONFIGURATION_TRAIT]))]));
        let (graph, diags) = run(&src, &Settings::default());
        assert!(!diags.has_errors());
        let money = graph.get("money::Money").unwrap();
        assert_eq!(money.binary_name, "money::MoneyConverter");
        assert!(matches!(&money.kind, TypeKind::External(e) if e.self_registering && e.reader == "JSON_READER"));
        assert_eq!(graph.configurations.keys().collect::<Vec<_>>(), ["money::MoneyConverter"]);

        let broken = source(json!([{
            "name": "c::Broken",
            "annotations": [{ "name": JSON_CONVERTER, "values": { "target": "X", "reader": "READ" } }],
            "fields": [{ "name": "JSON_WRITER", "ty": "W", "is_static": true }]
        }]));
        let (_, diags) = run(&broken, &Settings::default());
        assert_eq!(errors(&diags), ["converter c::Broken does not expose 'READ'"]);
    }

    #[test]
    fn constructor_parameters_carry_annotations() {
        let src = source(json!([{
            "name": "Money",
            "fields": [{ "name": "amount", "ty": "i64" }, { "name": "currency", "ty": "String", "visibility": "private" }],
            "methods": [{ "name": "currency", "returns": "String" }],
            "constructors": [{
                "name": "of",
                "params": [
                    { "name": "amount", "ty": "i64" },
                    { "name": "currency", "ty": "String", "annotations": [
                        { "name": "com.fasterxml.jackson.annotation.JsonProperty", "values": { "value": "ccy", "required": true } }
                    ] }
                ],
                "annotations": [{ "name": synonyms::JACKSON_CREATOR }]
            }]
        }]));
        let jackson = Settings { jackson: true, ..Settings::default() };
        let (graph, diags) = run(&src, &jackson);
        assert!(!diags.has_errors(), "{:?}", diags.into_vec());
        let money = graph.get("Money").unwrap().as_struct().unwrap();
        assert_eq!(
            money.materialization,
            Materialization::ConstructFromArgs { ctor: Constructor::Function("of".into()), args: vec![0, 1] }
        );
        assert_eq!(money.attributes[1].external_name, "ccy");
        assert!(money.attributes[1].required);
        assert_eq!(money.attributes[1].read, Access::Method("currency".into()));

        // without the interop flag the creator marker discovers nothing
        let (graph, _) = run(&src, &Settings::default());
        assert!(graph.is_empty());
    }

    #[test]
    fn conflicting_vocabularies_are_reported_at_info() {
        let src = source(json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [{ "name": "a", "ty": "i32", "annotations": [
                { "name": "com.fasterxml.jackson.annotation.JsonProperty", "values": { "required": true } },
                { "name": JSON_ATTRIBUTE, "values": { "mandatory": false } }
            ] }]
        }]));
        let (graph, diags) = run(&src, &Settings::default());
        assert!(!graph.get("R").unwrap().as_struct().unwrap().attributes[0].required);
        let infos: Vec<_> = diags.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            infos,
            ["info: conflicting Required annotations; using false from compiled_json::JsonAttribute [R.a (@compiled_json::JsonAttribute)]"]
        );
    }

    #[test]
    fn explicit_default_literal() {
        let src = source(json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [
                { "name": "n", "ty": "i32", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "default": 7 } }] },
                { "name": "s", "ty": "Option<String>" }
            ]
        }]));
        let (graph, _) = run(&src, &Settings::default());
        let r = graph.get("R").unwrap().as_struct().unwrap();
        assert_eq!(r.attributes[0].default, Literal::Int(7));
        assert!(r.attributes[0].explicit_default);
        assert_eq!(r.attributes[1].default, Literal::Null);
        assert!(!r.attributes[1].explicit_default);
    }

    #[test]
    fn enum_aliases() {
        let src = source(json!([{
            "name": "Color",
            "kind": "enum",
            "annotations": marked(Value::Null),
            "variants": [
                { "name": "Red" },
                { "name": "Green", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "name": "verde" } }] }
            ]
        }]));
        let (graph, _) = run(&src, &Settings::default());
        let TypeKind::Enum(info) = &graph.get("Color").unwrap().kind else { panic!("not an enum") };
        let names: Vec<_> = info.constants.iter().map(|c| c.external_name.as_str()).collect();
        assert_eq!(names, ["Red", "verde"]);
    }

    #[test]
    fn boxed_values_and_families() {
        let mut decls = json!([
            {
                "name": "list::Node",
                "annotations": marked(Value::Null),
                "supertypes": ["Default"],
                "fields": [
                    { "name": "next", "ty": "Option<Box<list::Node>>" },
                    { "name": "pet", "ty": "Box<dyn zoo::Animal>" }
                ]
            },
            { "name": "zoo::Animal", "kind": "trait", "annotations": marked(json!({ "discriminator": "kind" })) }
        ]);
        let (graph, diags) = run(&source(decls.clone()), &Settings::default());
        assert!(!diags.has_errors(), "{:?}", diags.into_vec());
        let node = graph.get("list::Node").unwrap().as_struct().unwrap();
        assert_eq!(
            node.attributes[0].codec,
            ValueCodec::Optional(Box::new(ValueCodec::Boxed(Box::new(ValueCodec::Reference {
                type_name: "list::Node".into()
            }))))
        );
        assert_eq!(node.attributes[1].codec, ValueCodec::Family { type_name: "zoo::Animal".into() });

        decls[0]["fields"][1]["ty"] = json!("zoo::Animal");
        let (_, diags) = run(&source(decls), &Settings::default());
        assert_eq!(
            errors(&diags),
            ["list::Node.pet holds family zoo::Animal by value; use Box<dyn zoo::Animal>"]
        );
    }

    #[test]
    fn explicit_defaults_are_checked_against_the_type() {
        let field = |name: &str, ty: &str, default: Value| {
            json!({ "name": name, "ty": ty, "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "default": default } }] })
        };
        let src = source(json!([
            {
                "name": "shop::Shop",
                "annotations": marked(Value::Null),
                "supertypes": ["Default"],
                "fields": [
                    field("status", "Option<shop::Status>", json!("closed")),
                    field("grade", "char", json!("A")),
                    field("ratio", "f64", json!(1))
                ]
            },
            {
                "name": "shop::Status",
                "kind": "enum",
                "annotations": marked(Value::Null),
                "variants": [
                    { "name": "Open" },
                    { "name": "Closed", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "name": "closed" } }] }
                ]
            }
        ]));
        let (graph, diags) = run(&src, &Settings::default());
        assert!(!diags.has_errors(), "{:?}", diags.into_vec());
        let shop = graph.get("shop::Shop").unwrap().as_struct().unwrap();
        assert_eq!(
            shop.attributes[0].default,
            Literal::Variant { type_name: "shop::Status".into(), name: "Closed".into() }
        );
        assert_eq!(shop.attributes[1].default, Literal::Char('A'));
        assert_eq!(shop.attributes[2].default, Literal::Int(1));

        let src = source(json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [
                field("n", "i32", json!("seven")),
                field("b", "u8", json!(300)),
                field("c", "char", json!("ab"))
            ]
        }]));
        let (graph, diags) = run(&src, &Settings::default());
        assert_eq!(
            errors(&diags),
            [
                "default \"seven\" of R.n is not an integer in range",
                "default 300 of R.b is not an integer in range",
                "default \"ab\" of R.c is not a single character",
            ]
        );
        assert!(diags.iter().all(|d| d.to_string().contains(JSON_ATTRIBUTE)));
        assert!(graph.get("R").is_none());
    }

    #[test]
    fn known_types_resolve_without_declarations() {
        let src = source(json!([{
            "name": "R",
            "annotations": marked(Value::Null),
            "supertypes": ["Default"],
            "fields": [{ "name": "at", "ty": "time::Instant" }, { "name": "blob", "ty": "mystery::Blob" }]
        }]));
        let known = KnownBy(|name: &str| name.starts_with("time::"));
        let mut diags = Diagnostics::new(LogLevel::Info);
        let graph = analyze(&src, &known, &Settings::default(), &mut diags);
        assert_eq!(errors(&diags), ["unable to resolve JSON codec for type 'mystery::Blob' used by R.blob"]);
        let r = graph.get("R").unwrap().as_struct().unwrap();
        assert_eq!(r.attributes[0].codec, ValueCodec::Known { type_name: "time::Instant".into() });
    }
}
