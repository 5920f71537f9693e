// Built-in codec table. Primitive and common types have hand-written
// reader/writer functions in the runtime; generated code calls them directly.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;

use crate::ir::Literal;
use crate::types::{Container, ValueType};

/// Primitive family of a built-in, used by the reference registry to check
/// and convert values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Char,
    Str,
    Uuid,
    Date,
    DateTime,
}

impl Prim {
    /// Accepted range for the integer primitives.
    pub fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            Prim::I8 => (i8::MIN as i128, i8::MAX as i128),
            Prim::I16 => (i16::MIN as i128, i16::MAX as i128),
            Prim::I32 => (i32::MIN as i128, i32::MAX as i128),
            Prim::I64 => (i64::MIN as i128, i64::MAX as i128),
            Prim::U8 => (0, u8::MAX as i128),
            Prim::U16 => (0, u16::MAX as i128),
            Prim::U32 => (0, u32::MAX as i128),
            Prim::U64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Plain,
    Nullable,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuiltinCodec {
    pub key: &'static str,
    /// Runtime module holding the functions, e.g. `number`.
    pub module: &'static str,
    pub writer: &'static str,
    pub reader: &'static str,
    pub default: Literal,
    pub prim: Prim,
    pub form: Form,
}

impl BuiltinCodec {
    pub fn writer_path(&self) -> String {
        format!("{}::{}", self.module, self.writer)
    }

    pub fn reader_path(&self) -> String {
        format!("{}::{}", self.module, self.reader)
    }
}

static BUILTINS: Lazy<IndexMap<&'static str, BuiltinCodec>> = Lazy::new(|| {
    let mut table = IndexMap::new();
    let mut put = |key: &'static str, module, writer, reader, default: Literal, prim, form| {
        table.insert(key, BuiltinCodec { key, module, writer, reader, default, prim, form });
    };
    let zero_f = Literal::Float(OrderedFloat(0.0));

    put("i32", "number", "write_i32", "read_i32", Literal::Int(0), Prim::I32, Form::Plain);
    put("Option<i32>", "number", "write_nullable_i32", "read_nullable_i32", Literal::Null, Prim::I32, Form::Nullable);
    put("Vec<i32>", "number", "write_i32_list", "read_i32_list", Literal::EmptyList, Prim::I32, Form::List);
    put("i64", "number", "write_i64", "read_i64", Literal::Int(0), Prim::I64, Form::Plain);
    put("Option<i64>", "number", "write_nullable_i64", "read_nullable_i64", Literal::Null, Prim::I64, Form::Nullable);
    put("Vec<i64>", "number", "write_i64_list", "read_i64_list", Literal::EmptyList, Prim::I64, Form::List);
    put("f32", "number", "write_f32", "read_f32", zero_f.clone(), Prim::F32, Form::Plain);
    put("Option<f32>", "number", "write_nullable_f32", "read_nullable_f32", Literal::Null, Prim::F32, Form::Nullable);
    put("Vec<f32>", "number", "write_f32_list", "read_f32_list", Literal::EmptyList, Prim::F32, Form::List);
    put("f64", "number", "write_f64", "read_f64", zero_f, Prim::F64, Form::Plain);
    put("Option<f64>", "number", "write_nullable_f64", "read_nullable_f64", Literal::Null, Prim::F64, Form::Nullable);
    put("Vec<f64>", "number", "write_f64_list", "read_f64_list", Literal::EmptyList, Prim::F64, Form::List);
    put("i8", "number", "write_i8", "read_i8", Literal::Int(0), Prim::I8, Form::Plain);
    put("i16", "number", "write_i16", "read_i16", Literal::Int(0), Prim::I16, Form::Plain);
    put("u8", "number", "write_u8", "read_u8", Literal::Int(0), Prim::U8, Form::Plain);
    put("u16", "number", "write_u16", "read_u16", Literal::Int(0), Prim::U16, Form::Plain);
    put("u32", "number", "write_u32", "read_u32", Literal::Int(0), Prim::U32, Form::Plain);
    put("u64", "number", "write_u64", "read_u64", Literal::Int(0), Prim::U64, Form::Plain);
    put("bool", "boolean", "write_bool", "read_bool", Literal::Bool(false), Prim::Bool, Form::Plain);
    put("Option<bool>", "boolean", "write_nullable_bool", "read_nullable_bool", Literal::Null, Prim::Bool, Form::Nullable);
    put("Vec<bool>", "boolean", "write_bool_list", "read_bool_list", Literal::EmptyList, Prim::Bool, Form::List);
    put("char", "string", "write_char", "read_char", Literal::Char('\0'), Prim::Char, Form::Plain);
    put("String", "string", "write_str", "read_string", Literal::Str(String::new()), Prim::Str, Form::Plain);
    put("uuid::Uuid", "uuid", "write_uuid", "read_uuid", Literal::TypeDefault, Prim::Uuid, Form::Plain);
    put("chrono::NaiveDate", "time", "write_local_date", "read_local_date", Literal::TypeDefault, Prim::Date, Form::Plain);
    put(
        "chrono::DateTime<chrono::FixedOffset>",
        "time",
        "write_date_time",
        "read_date_time",
        Literal::TypeDefault,
        Prim::DateTime,
        Form::Plain,
    );
    table
});

/// Literals for types that have no built-in codec but a well-known zero value.
static DEFAULTS: Lazy<IndexMap<&'static str, Literal>> = Lazy::new(|| {
    let mut table = IndexMap::new();
    for key in ["usize", "isize", "u128", "i128"] {
        table.insert(key, Literal::Int(0));
    }
    table
});

pub fn lookup(ty: &ValueType) -> Option<&'static BuiltinCodec> {
    BUILTINS.get(ty.to_string().as_str())
}

pub fn lookup_name(name: &str) -> Option<&'static BuiltinCodec> {
    BUILTINS.get(name)
}

/// Default used when an optional attribute is absent and no explicit default
/// was declared.
pub fn default_literal(ty: &ValueType) -> Literal {
    if let Some(builtin) = lookup(ty) {
        return builtin.default.clone();
    }
    match ty.container() {
        Some(Container::Option(_)) => Literal::Null,
        Some(Container::List(_)) => Literal::EmptyList,
        Some(Container::Map(_)) => Literal::EmptyMap,
        Some(Container::Boxed(_)) => Literal::TypeDefault,
        None => DEFAULTS.get(ty.path.as_str()).cloned().unwrap_or(Literal::TypeDefault),
    }
}
