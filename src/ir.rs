// Strongly-typed type graph. Built once per round by `analysis`, read-only after.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::builtins::BuiltinCodec;
use crate::decl::DeclId;
use crate::types::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WireShape {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireShapes {
    pub object: bool,
    pub array: bool,
}

impl WireShapes {
    pub const OBJECT: WireShapes = WireShapes { object: true, array: false };
    pub const ARRAY: WireShapes = WireShapes { object: false, array: true };
    pub const BOTH: WireShapes = WireShapes { object: true, array: true };

    pub fn contains(&self, shape: WireShape) -> bool {
        match shape {
            WireShape::Object => self.object,
            WireShape::Array => self.array,
        }
    }

    pub fn is_both(&self) -> bool {
        self.object && self.array
    }

    pub fn is_empty(&self) -> bool {
        !self.object && !self.array
    }
}

/// A value literal usable both as generated code and as a runtime value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Char(char),
    Str(String),
    EmptyList,
    EmptyMap,
    /// Constant of an enum declared in this round.
    Variant { type_name: String, name: String },
    /// `Default::default()` of the declared type.
    TypeDefault,
}

impl Literal {
    pub fn from_json(value: &serde_json::Value) -> Option<Literal> {
        use serde_json::Value;
        match value {
            Value::Null => Some(Literal::Null),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Literal::Int(i)),
                None => n.as_f64().map(|f| Literal::Float(OrderedFloat(f))),
            },
            Value::String(s) => Some(Literal::Str(s.clone())),
            Value::Array(xs) if xs.is_empty() => Some(Literal::EmptyList),
            Value::Object(m) if m.is_empty() => Some(Literal::EmptyMap),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    Nullable,
    NonNull,
}

/// How a value of some attribute type is read and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueCodec {
    /// Inlined fast path.
    Builtin(&'static BuiltinCodec),
    /// Another codec synthesized in this round.
    Reference { type_name: String },
    /// Registered outside this compilation.
    Known { type_name: String },
    /// Unresolved type let through by the unknown-type policy; looked up in
    /// the registry at runtime.
    Generic { type_name: String },
    /// `Box<dyn Family>`: dispatched on the discriminator.
    Family { type_name: String },
    Optional(Box<ValueCodec>),
    List(Box<ValueCodec>),
    Map(Box<ValueCodec>),
    Boxed(Box<ValueCodec>),
}

/// Member used to read or assign an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Field(String),
    Method(String),
}

impl Access {
    pub fn name(&self) -> &str {
        match self {
            Access::Field(n) | Access::Method(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    /// Declared (Rust-side) name.
    pub name: String,
    pub external_name: String,
    pub value_type: ValueType,
    pub codec: ValueCodec,
    pub nullability: Nullability,
    pub required: bool,
    /// Position in the array shape.
    pub ordinal: usize,
    pub explicit_index: Option<u32>,
    pub ignored: bool,
    pub default: Literal,
    pub explicit_default: bool,
    pub read: Access,
    pub write: Option<Access>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constructor {
    /// Associated function, e.g. `new`.
    Function(String),
    /// Struct expression `T { a, b }`; every field is public.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialization {
    /// `via` is the zero-argument constructor, or `None` for `Default::default()`.
    DefaultThenMutate { via: Option<String> },
    /// `args[i]` is the attribute bound to the i-th constructor parameter.
    ConstructFromArgs { ctor: Constructor, args: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructInfo {
    pub shapes: WireShapes,
    pub preferred: WireShape,
    pub materialization: Materialization,
    /// Declaration order.
    pub attributes: Vec<AttributeDescriptor>,
    /// Discriminator used when this struct is written as a family member.
    pub type_alias: String,
}

impl StructInfo {
    pub fn has_default_ctor(&self) -> bool {
        matches!(self.materialization, Materialization::DefaultThenMutate { .. })
    }

    /// Non-ignored attributes in array order.
    pub fn by_ordinal(&self) -> Vec<&AttributeDescriptor> {
        let mut out: Vec<_> = self.attributes.iter().filter(|a| !a.ignored).collect();
        out.sort_by_key(|a| a.ordinal);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    pub external_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumInfo {
    pub constants: Vec<EnumConstant>,
    /// At least one variant is ignored.
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalInfo {
    pub converter: String,
    pub reader: String,
    pub writer: String,
    /// The converter is also a `Configuration` and registers itself.
    pub self_registering: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyInfo {
    /// Key holding the discriminator in the object shape.
    pub discriminator: String,
    /// Member type names, discovery order.
    pub members: Vec<String>,
    pub deserialize_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Struct(StructInfo),
    Enum(EnumInfo),
    External(ExternalInfo),
    Family(FamilyInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub binary_name: String,
    /// Declaration the generated artifact is attributed to.
    pub decl: DeclId,
    pub namespace_sealed: bool,
    pub kind: TypeKind,
}

impl TypeDescriptor {
    pub fn namespace(&self) -> Option<&str> {
        self.binary_name.rsplit_once("::").map(|(ns, _)| ns)
    }

    pub fn simple_name(&self) -> &str {
        self.binary_name.rsplit_once("::").map_or(self.binary_name.as_str(), |(_, n)| n)
    }

    pub fn as_struct(&self) -> Option<&StructInfo> {
        match &self.kind {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }
}

/// The closed graph for one round, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    pub types: IndexMap<String, TypeDescriptor>,
    /// Converters that register themselves, with their declarations.
    pub configurations: IndexMap<String, DeclId>,
}

impl TypeGraph {
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
