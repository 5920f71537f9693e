//! Reference registry: executes codec plans over `serde_json::Value`.
//!
//! Generated sources are the product, but they only run inside the user's
//! crate. The registry walks the very same `CodecPlan`s dynamically, so the
//! read and write rules (required attributes, defaults, array ordinals,
//! discriminator dispatch) can be exercised without compiling anything.
//!
//! Instances are modelled by [`Data`]. Struct instances are keyed by attribute
//! name, not by wire key.
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::builtins::{BuiltinCodec, Form, Prim};
use crate::error::ReadError;
use crate::ir::{Literal, TypeGraph, WireShape};
use crate::lower::lower;
use crate::plan::{
    CodecPlan, CodecRef, ConstructPlan, EnumPlan, ExternalPlan, FamilyPlan, FieldPlan, PlanBody, Store, StructPlan,
};

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").expect("static regex")
});

const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";
const EPOCH_DATE: &str = "1970-01-01";
const EPOCH_DATE_TIME: &str = "1970-01-01T00:00:00+00:00";

// ————————————————————————————————————————————————————————————————————————————
// INSTANCES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    /// Strings, chars, UUIDs and dates.
    Str(String),
    List(Vec<Data>),
    Map(IndexMap<String, Data>),
    /// Instance of a declared struct, keyed by attribute name.
    Struct { type_name: String, fields: IndexMap<String, Data> },
    Variant { type_name: String, name: String },
    /// Untyped JSON passed through a dynamic codec.
    Opaque(Value),
    /// `Default::default()` of whatever type is expected.
    Default,
}

impl Data {
    pub fn record<K: Into<String>>(type_name: &str, fields: impl IntoIterator<Item = (K, Data)>) -> Data {
        Data::Struct {
            type_name: type_name.to_string(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn variant(type_name: &str, name: &str) -> Data {
        Data::Variant { type_name: type_name.to_string(), name: name.to_string() }
    }

    pub fn str(value: &str) -> Data {
        Data::Str(value.to_string())
    }

    pub fn field(&self, name: &str) -> Option<&Data> {
        match self {
            Data::Struct { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        match self {
            Data::Struct { type_name, .. } | Data::Variant { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    fn kind(&self) -> String {
        let kind = match self {
            Data::Struct { type_name, .. } | Data::Variant { type_name, .. } => return type_name.clone(),
            Data::Null => "null",
            Data::Bool(_) => "bool",
            Data::Int(_) => "integer",
            Data::Float(_) => "float",
            Data::Str(_) => "string",
            Data::List(_) => "list",
            Data::Map(_) => "map",
            Data::Opaque(_) => "json",
            Data::Default => "default",
        };
        kind.to_string()
    }

    /// Plain JSON rendering, used for values nobody has a codec for.
    pub fn to_json(&self) -> Value {
        match self {
            Data::Null | Data::Default => Value::Null,
            Data::Bool(b) => Value::Bool(*b),
            Data::Int(i) => int_json(*i),
            Data::Float(f) => Value::from(*f),
            Data::Str(s) => Value::String(s.clone()),
            Data::List(items) => Value::Array(items.iter().map(Data::to_json).collect()),
            Data::Map(entries) | Data::Struct { fields: entries, .. } => {
                Value::Object(entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            Data::Variant { name, .. } => Value::String(name.clone()),
            Data::Opaque(value) => value.clone(),
        }
    }
}

impl From<&Literal> for Data {
    fn from(literal: &Literal) -> Data {
        match literal {
            Literal::Null => Data::Null,
            Literal::Bool(b) => Data::Bool(*b),
            Literal::Int(i) => Data::Int(i128::from(*i)),
            Literal::Float(f) => Data::Float(f.0),
            Literal::Char(c) => Data::Str(c.to_string()),
            Literal::Str(s) => Data::Str(s.clone()),
            Literal::EmptyList => Data::List(Vec::new()),
            Literal::EmptyMap => Data::Map(IndexMap::new()),
            Literal::Variant { type_name, name } => Data::variant(type_name, name),
            Literal::TypeDefault => Data::Default,
        }
    }
}

fn int_json(i: i128) -> Value {
    if let Ok(i) = i64::try_from(i) {
        return Value::from(i);
    }
    if let Ok(u) = u64::try_from(i) {
        return Value::from(u);
    }
    Number::from_f64(i as f64).map_or(Value::Null, Value::Number)
}

fn json_kind(value: &Value) -> String {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    kind.to_string()
}

fn prim_name(prim: Prim) -> &'static str {
    match prim {
        Prim::I8 => "i8",
        Prim::I16 => "i16",
        Prim::I32 => "i32",
        Prim::I64 => "i64",
        Prim::U8 => "u8",
        Prim::U16 => "u16",
        Prim::U32 => "u32",
        Prim::U64 => "u64",
        Prim::F32 => "f32",
        Prim::F64 => "f64",
        Prim::Bool => "bool",
        Prim::Char => "char",
        Prim::Str => "string",
        Prim::Uuid => "uuid",
        Prim::Date => "date",
        Prim::DateTime => "date-time",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

pub type ReadFn = Arc<dyn Fn(&Value) -> Result<Data, ReadError> + Send + Sync>;
pub type WriteFn = Arc<dyn Fn(&Data) -> Result<Value, ReadError> + Send + Sync>;

/// Plans by type name, plus hand-bound functions for converter symbols
/// (`conv::InstantConverter::JSON_READER`) and for known types.
#[derive(Clone, Default)]
pub struct Registry {
    plans: IndexMap<String, CodecPlan>,
    readers: HashMap<String, ReadFn>,
    writers: HashMap<String, WriteFn>,
    /// What `Default::default()` produces, for types where that is not all zeros.
    defaults: HashMap<String, Data>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower every descriptor of the graph.
    pub fn from_graph(graph: &TypeGraph) -> Self {
        let mut registry = Self::new();
        for desc in graph.iter() {
            registry.register(lower(desc, graph));
        }
        registry
    }

    pub fn register(&mut self, plan: CodecPlan) {
        self.plans.insert(plan.type_name.clone(), plan);
    }

    pub fn plan(&self, type_name: &str) -> Option<&CodecPlan> {
        self.plans.get(type_name)
    }

    pub fn bind_reader(
        &mut self,
        symbol: impl Into<String>,
        read: impl Fn(&Value) -> Result<Data, ReadError> + Send + Sync + 'static,
    ) {
        self.readers.insert(symbol.into(), Arc::new(read));
    }

    pub fn bind_writer(
        &mut self,
        symbol: impl Into<String>,
        write: impl Fn(&Data) -> Result<Value, ReadError> + Send + Sync + 'static,
    ) {
        self.writers.insert(symbol.into(), Arc::new(write));
    }

    pub fn bind_default(&mut self, type_name: impl Into<String>, instance: Data) {
        self.defaults.insert(type_name.into(), instance);
    }

    /// Read into an existing instance: attributes absent from `value` keep
    /// their current values unless they carry an explicit default.
    pub fn bind(&self, type_name: &str, value: &Value, instance: &mut Data) -> Result<(), ReadError> {
        let Some(plan) = self.plans.get(type_name) else {
            return Err(ReadError::UnknownCodec { ty: type_name.to_string() });
        };
        match &plan.body {
            PlanBody::Struct(info) if info.has_binder() => self.bind_struct(plan, info, value, instance),
            _ => Err(ReadError::NotBindable { ty: type_name.to_string() }),
        }
    }

    pub fn read(&self, type_name: &str, value: &Value) -> Result<Data, ReadError> {
        let Some(plan) = self.plans.get(type_name) else {
            return self.known_reader(type_name)?(value);
        };
        match &plan.body {
            PlanBody::Struct(info) => self.read_struct(plan, info, value),
            PlanBody::Enum(info) => read_enum(plan, info, value),
            PlanBody::External(info) => self.bound_reader(&symbol(info, &info.reader))?(value),
            PlanBody::Family(info) => self.read_family(plan, info, value),
        }
    }

    /// Write in the type's preferred shape.
    pub fn write(&self, type_name: &str, data: &Data) -> Result<Value, ReadError> {
        let Some(plan) = self.plans.get(type_name) else {
            return self.known_writer(type_name)?(data);
        };
        match &plan.body {
            PlanBody::Struct(info) => self.write_struct(plan, info, info.preferred, data),
            PlanBody::Enum(info) => write_enum(plan, info, data),
            PlanBody::External(info) => self.bound_writer(&symbol(info, &info.writer))?(data),
            PlanBody::Family(info) => self.write_family(plan, info, data),
        }
    }

    /// Write a struct in a specific shape.
    pub fn write_shape(&self, type_name: &str, shape: WireShape, data: &Data) -> Result<Value, ReadError> {
        match self.plans.get(type_name) {
            Some(plan) => match &plan.body {
                PlanBody::Struct(info) => self.write_struct(plan, info, shape, data),
                _ => self.write(type_name, data),
            },
            None => self.known_writer(type_name)?(data),
        }
    }

    fn bound_reader(&self, symbol: &str) -> Result<&ReadFn, ReadError> {
        self.readers.get(symbol).ok_or_else(|| ReadError::UnboundSymbol { symbol: symbol.to_string() })
    }

    fn bound_writer(&self, symbol: &str) -> Result<&WriteFn, ReadError> {
        self.writers.get(symbol).ok_or_else(|| ReadError::UnboundSymbol { symbol: symbol.to_string() })
    }

    /// Types without a plan must have been bound by name.
    fn known_reader(&self, type_name: &str) -> Result<&ReadFn, ReadError> {
        self.readers.get(type_name).ok_or_else(|| ReadError::UnknownCodec { ty: type_name.to_string() })
    }

    fn known_writer(&self, type_name: &str) -> Result<&WriteFn, ReadError> {
        self.writers.get(type_name).ok_or_else(|| ReadError::UnknownCodec { ty: type_name.to_string() })
    }

    // ————————————————————————————————————————————————————————————————————————
    // STRUCTS
    // ————————————————————————————————————————————————————————————————————————

    /// Default-constructed instance of a struct.
    fn instance(&self, plan: &CodecPlan) -> Data {
        let ty = plan.type_name.as_str();
        self.defaults
            .get(ty)
            .filter(|d| d.type_name() == Some(ty))
            .cloned()
            .unwrap_or_else(|| Data::Struct { type_name: ty.to_string(), fields: IndexMap::new() })
    }

    fn read_struct(&self, plan: &CodecPlan, info: &StructPlan, value: &Value) -> Result<Data, ReadError> {
        let ty = plan.type_name.as_str();
        let params = match &info.construct {
            ConstructPlan::Mutate { .. } => {
                let mut instance = self.instance(plan);
                self.bind_struct(plan, info, value, &mut instance)?;
                return Ok(instance);
            }
            ConstructPlan::Args { params, .. } => params,
        };
        let mut fields = IndexMap::new();
        for (field, data) in self.read_present(ty, info, value)? {
            fields.insert(field.attribute.clone(), data.unwrap_or_else(|| Data::from(&field.default)));
        }
        for param in params.iter().filter(|p| p.ignored) {
            fields.insert(param.attribute.clone(), Data::from(&param.default));
        }
        Ok(Data::Struct { type_name: ty.to_string(), fields })
    }

    fn bind_struct(
        &self,
        plan: &CodecPlan,
        info: &StructPlan,
        value: &Value,
        instance: &mut Data,
    ) -> Result<(), ReadError> {
        let ty = plan.type_name.as_str();
        if *instance == Data::Default {
            *instance = self.instance(plan);
        }
        match &*instance {
            Data::Struct { type_name, .. } if type_name == ty => {}
            other => return Err(ReadError::WrongInstance { ty: ty.to_string(), found: other.kind() }),
        }
        let read = self.read_present(ty, info, value)?;
        let Data::Struct { fields, .. } = instance else { return Ok(()) };
        for (field, data) in read {
            match data {
                Some(data) => {
                    fields.insert(field.attribute.clone(), data);
                }
                None if field.explicit_default => {
                    fields.insert(field.attribute.clone(), Data::from(&field.default));
                }
                None => {
                    fields.entry(field.attribute.clone()).or_insert_with(|| Data::from(&field.default));
                }
            }
        }
        Ok(())
    }

    /// Every stored field of the input's shape, with `None` when absent.
    /// A required absent field fails.
    fn read_present<'p>(
        &self,
        ty: &str,
        info: &'p StructPlan,
        value: &Value,
    ) -> Result<Vec<(&'p FieldPlan, Option<Data>)>, ReadError> {
        let mut out = Vec::new();
        match value {
            Value::Object(map) if info.object.is_some() => {
                for field in info.object.iter().flatten().filter(|f| f.store != Store::Skip) {
                    let data = match map.get(&field.key) {
                        Some(v) => Some(self.read_field(ty, field, v)?),
                        None => absent(ty, field)?,
                    };
                    out.push((field, data));
                }
            }
            Value::Array(items) if info.array.is_some() => {
                let shape = info.array.as_deref().unwrap_or_default();
                if items.len() > shape.len() {
                    return Err(ReadError::TooManyElements { ty: ty.to_string(), max: shape.len(), found: items.len() });
                }
                for (i, field) in shape.iter().enumerate() {
                    if field.store == Store::Skip {
                        continue;
                    }
                    let data = match items.get(i) {
                        Some(v) => Some(self.read_field(ty, field, v)?),
                        None => absent(ty, field)?,
                    };
                    out.push((field, data));
                }
            }
            other => {
                return Err(ReadError::UnexpectedShape {
                    ty: ty.to_string(),
                    expected: expected_shape(info),
                    found: json_kind(other),
                });
            }
        }
        Ok(out)
    }

    fn read_field(&self, ty: &str, field: &FieldPlan, value: &Value) -> Result<Data, ReadError> {
        if value.is_null() {
            if !field.nullable {
                return Err(ReadError::NullNotAllowed { ty: ty.to_string(), attribute: field.key.clone() });
            }
            return Ok(Data::Null);
        }
        self.read_codec(&field.codec, value)
    }

    fn write_struct(&self, plan: &CodecPlan, info: &StructPlan, shape: WireShape, data: &Data) -> Result<Value, ReadError> {
        let ty = plan.type_name.as_str();
        let fields = match data {
            Data::Struct { type_name, fields } if type_name == ty => fields,
            Data::Default => return self.write_struct(plan, info, shape, &self.instance(plan)),
            other => return Err(ReadError::WrongInstance { ty: ty.to_string(), found: other.kind() }),
        };
        let Some(shape_fields) = info.shape(shape) else {
            let found = match shape {
                WireShape::Object => "object",
                WireShape::Array => "array",
            };
            return Err(ReadError::UnexpectedShape {
                ty: ty.to_string(),
                expected: expected_shape(info),
                found: found.to_string(),
            });
        };
        let mut written = Vec::with_capacity(shape_fields.len());
        for field in shape_fields {
            let value = fields.get(&field.attribute).map_or_else(|| Cow::Owned(Data::from(&field.default)), Cow::Borrowed);
            written.push((field.key.clone(), self.write_field(ty, field, &value)?));
        }
        Ok(match shape {
            WireShape::Object => Value::Object(written.into_iter().collect()),
            WireShape::Array => Value::Array(written.into_iter().map(|(_, v)| v).collect()),
        })
    }

    fn write_field(&self, ty: &str, field: &FieldPlan, data: &Data) -> Result<Value, ReadError> {
        if *data == Data::Null {
            if !field.nullable {
                return Err(ReadError::NullNotAllowed { ty: ty.to_string(), attribute: field.key.clone() });
            }
            return Ok(Value::Null);
        }
        self.write_codec(&field.codec, data)
    }

    // ————————————————————————————————————————————————————————————————————————
    // NESTED VALUES
    // ————————————————————————————————————————————————————————————————————————

    fn read_codec(&self, codec: &CodecRef, value: &Value) -> Result<Data, ReadError> {
        match codec {
            CodecRef::Builtin(builtin) => read_builtin(builtin, value),
            CodecRef::Lookup { type_name, .. } | CodecRef::Family { type_name } => self.read(type_name, value),
            CodecRef::Boxed(inner) => self.read_codec(inner, value),
            CodecRef::Dynamic { .. } => Ok(Data::Opaque(value.clone())),
            CodecRef::Optional(_) if value.is_null() => Ok(Data::Null),
            CodecRef::Optional(inner) => self.read_codec(inner, value),
            CodecRef::List(inner) => match value {
                Value::Array(items) => {
                    items.iter().map(|v| self.read_codec(inner, v)).collect::<Result<_, _>>().map(Data::List)
                }
                other => Err(ReadError::InvalidValue { kind: "list", found: other.to_string() }),
            },
            CodecRef::Map(inner) => match value {
                Value::Object(map) => map
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.read_codec(inner, v)?)))
                    .collect::<Result<_, ReadError>>()
                    .map(Data::Map),
                other => Err(ReadError::InvalidValue { kind: "map", found: other.to_string() }),
            },
        }
    }

    fn write_codec(&self, codec: &CodecRef, data: &Data) -> Result<Value, ReadError> {
        match codec {
            CodecRef::Builtin(builtin) => write_builtin(builtin, data),
            CodecRef::Lookup { type_name, .. } | CodecRef::Family { type_name } => self.write(type_name, data),
            CodecRef::Boxed(inner) => self.write_codec(inner, data),
            CodecRef::Dynamic { .. } => Ok(data.to_json()),
            CodecRef::Optional(_) if *data == Data::Null => Ok(Value::Null),
            CodecRef::Optional(inner) => self.write_codec(inner, data),
            CodecRef::List(inner) => match data {
                Data::List(items) => {
                    items.iter().map(|d| self.write_codec(inner, d)).collect::<Result<_, _>>().map(Value::Array)
                }
                Data::Default => Ok(Value::Array(Vec::new())),
                other => Err(ReadError::WrongInstance { ty: "list".into(), found: other.kind() }),
            },
            CodecRef::Map(inner) => match data {
                Data::Map(entries) => entries
                    .iter()
                    .map(|(k, d)| Ok((k.clone(), self.write_codec(inner, d)?)))
                    .collect::<Result<Map<_, _>, ReadError>>()
                    .map(Value::Object),
                Data::Default => Ok(Value::Object(Map::new())),
                other => Err(ReadError::WrongInstance { ty: "map".into(), found: other.kind() }),
            },
        }
    }

    // ————————————————————————————————————————————————————————————————————————
    // FAMILIES
    // ————————————————————————————————————————————————————————————————————————

    fn read_family(&self, plan: &CodecPlan, info: &FamilyPlan, value: &Value) -> Result<Data, ReadError> {
        let family = plan.type_name.as_str();
        let (tag, body): (Option<&str>, Cow<'_, Value>) = match value {
            Value::Object(map) => (map.get(&info.discriminator).and_then(Value::as_str), Cow::Borrowed(value)),
            // a leading string only counts as a tag when it names a member
            Value::Array(items) => match items.split_first() {
                Some((Value::String(tag), rest)) if info.member_by_tag(tag).is_some() => {
                    (Some(tag.as_str()), Cow::Owned(Value::Array(rest.to_vec())))
                }
                _ => (None, Cow::Borrowed(value)),
            },
            other => {
                return Err(ReadError::UnexpectedShape {
                    ty: family.to_string(),
                    expected: "object or array",
                    found: json_kind(other),
                });
            }
        };
        let member = match tag {
            Some(tag) => info.member_by_tag(tag).or_else(|| info.default_member()).ok_or_else(|| {
                ReadError::UnknownDiscriminator { family: family.to_string(), found: tag.to_string() }
            })?,
            None => info
                .default_member()
                .ok_or_else(|| ReadError::MissingDiscriminator { family: family.to_string() })?,
        };
        self.read(&member.type_name, &body)
    }

    fn write_family(&self, plan: &CodecPlan, info: &FamilyPlan, data: &Data) -> Result<Value, ReadError> {
        let family = plan.type_name.as_str();
        let Some(member) = data.type_name().and_then(|t| info.member_by_type(t)) else {
            return Err(ReadError::WrongInstance { ty: family.to_string(), found: data.kind() });
        };
        let tag = Value::String(member.tag.clone());
        Ok(match self.write(&member.type_name, data)? {
            Value::Object(fields) => {
                let mut tagged = Map::new();
                tagged.insert(info.discriminator.clone(), tag);
                tagged.extend(fields);
                Value::Object(tagged)
            }
            Value::Array(items) => Value::Array(std::iter::once(tag).chain(items).collect()),
            other => other,
        })
    }
}

fn symbol(info: &ExternalPlan, item: &str) -> String {
    format!("{}::{item}", info.converter)
}

fn expected_shape(info: &StructPlan) -> &'static str {
    match (info.object.is_some(), info.array.is_some()) {
        (true, true) => "object or array",
        (false, true) => "array",
        _ => "object",
    }
}

fn absent(ty: &str, field: &FieldPlan) -> Result<Option<Data>, ReadError> {
    if field.required {
        return Err(ReadError::MissingRequired { ty: ty.to_string(), attribute: field.key.clone() });
    }
    Ok(None)
}

fn read_enum(plan: &CodecPlan, info: &EnumPlan, value: &Value) -> Result<Data, ReadError> {
    let ty = plan.type_name.as_str();
    let Some(name) = value.as_str() else {
        return Err(ReadError::UnexpectedShape { ty: ty.to_string(), expected: "string", found: json_kind(value) });
    };
    info.constants
        .iter()
        .find(|(_, external)| external == name)
        .map(|(variant, _)| Data::variant(ty, variant))
        .ok_or_else(|| ReadError::UnknownVariant { ty: ty.to_string(), found: name.to_string() })
}

fn write_enum(plan: &CodecPlan, info: &EnumPlan, data: &Data) -> Result<Value, ReadError> {
    let ty = plan.type_name.as_str();
    let variant = match data {
        Data::Variant { type_name, name } if type_name == ty => Some(name.as_str()),
        Data::Default => info.constants.first().map(|(variant, _)| variant.as_str()),
        other => return Err(ReadError::WrongInstance { ty: ty.to_string(), found: other.kind() }),
    };
    variant
        .and_then(|v| info.constants.iter().find(|(name, _)| name == v))
        .map(|(_, external)| Value::String(external.clone()))
        .ok_or_else(|| ReadError::UnknownVariant { ty: ty.to_string(), found: data.kind() })
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-INS
// ————————————————————————————————————————————————————————————————————————————

fn read_builtin(builtin: &BuiltinCodec, value: &Value) -> Result<Data, ReadError> {
    match (builtin.form, value) {
        (Form::Nullable, Value::Null) => Ok(Data::Null),
        (Form::List, Value::Array(items)) => {
            items.iter().map(|v| read_prim(builtin.prim, v)).collect::<Result<_, _>>().map(Data::List)
        }
        (Form::List, other) => Err(ReadError::InvalidValue { kind: builtin.key, found: other.to_string() }),
        _ => read_prim(builtin.prim, value),
    }
}

fn read_prim(prim: Prim, value: &Value) -> Result<Data, ReadError> {
    let invalid = || ReadError::InvalidValue { kind: prim_name(prim), found: value.to_string() };
    if let Some((min, max)) = prim.int_range() {
        let n = value.as_i64().map(i128::from).or_else(|| value.as_u64().map(i128::from)).ok_or_else(invalid)?;
        return if (min..=max).contains(&n) { Ok(Data::Int(n)) } else { Err(invalid()) };
    }
    if let Prim::F32 | Prim::F64 = prim {
        return value.as_f64().map(Data::Float).ok_or_else(invalid);
    }
    if prim == Prim::Bool {
        return value.as_bool().map(Data::Bool).ok_or_else(invalid);
    }
    let text = value.as_str().ok_or_else(invalid)?;
    let valid = match prim {
        Prim::Char => text.chars().count() == 1,
        Prim::Uuid => UUID.is_match(text),
        Prim::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
        Prim::DateTime => DateTime::parse_from_rfc3339(text).is_ok(),
        _ => true,
    };
    if !valid {
        return Err(invalid());
    }
    match prim {
        Prim::Uuid => Ok(Data::Str(text.to_ascii_lowercase())),
        _ => Ok(Data::str(text)),
    }
}

fn write_builtin(builtin: &BuiltinCodec, data: &Data) -> Result<Value, ReadError> {
    match (builtin.form, data) {
        (Form::Nullable, Data::Null) => Ok(Value::Null),
        (Form::List, Data::List(items)) => {
            items.iter().map(|d| write_prim(builtin.prim, d)).collect::<Result<_, _>>().map(Value::Array)
        }
        (Form::List, Data::Default) => Ok(Value::Array(Vec::new())),
        (Form::List, other) => Err(ReadError::WrongInstance { ty: builtin.key.to_string(), found: other.kind() }),
        _ => write_prim(builtin.prim, data),
    }
}

fn write_prim(prim: Prim, data: &Data) -> Result<Value, ReadError> {
    let wrong = || ReadError::WrongInstance { ty: prim_name(prim).to_string(), found: data.kind() };
    if let Some((min, max)) = prim.int_range() {
        return match data {
            Data::Int(i) if (min..=max).contains(i) => Ok(int_json(*i)),
            Data::Default => Ok(Value::from(0)),
            _ => Err(wrong()),
        };
    }
    match (prim, data) {
        (Prim::F32 | Prim::F64, Data::Float(f)) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| ReadError::InvalidValue { kind: prim_name(prim), found: f.to_string() }),
        (Prim::F32 | Prim::F64, Data::Int(i)) => Ok(Value::from(*i as f64)),
        (Prim::F32 | Prim::F64, Data::Default) => Ok(Value::from(0.0)),
        (Prim::Bool, Data::Bool(b)) => Ok(Value::Bool(*b)),
        (Prim::Bool, Data::Default) => Ok(Value::Bool(false)),
        (Prim::Str, Data::Str(s)) => Ok(Value::String(s.clone())),
        (Prim::Str, Data::Default) => Ok(Value::String(String::new())),
        (Prim::Char, Data::Str(s)) if s.chars().count() == 1 => Ok(Value::String(s.clone())),
        (Prim::Char, Data::Default) => Ok(Value::String("\0".into())),
        (Prim::Uuid, Data::Str(s)) if UUID.is_match(s) => Ok(Value::String(s.to_ascii_lowercase())),
        (Prim::Uuid, Data::Default) => Ok(Value::String(NIL_UUID.into())),
        (Prim::Date, Data::Str(s)) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => Ok(Value::String(s.clone())),
        (Prim::Date, Data::Default) => Ok(Value::String(EPOCH_DATE.into())),
        (Prim::DateTime, Data::Str(s)) if DateTime::parse_from_rfc3339(s).is_ok() => Ok(Value::String(s.clone())),
        (Prim::DateTime, Data::Default) => Ok(Value::String(EPOCH_DATE_TIME.into())),
        _ => Err(wrong()),
    }
}
