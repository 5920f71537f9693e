// Codec plans: the resolved, shape-specific read/write program for one type.
// `codegen` renders a plan to source text, `runtime` executes it over
// `serde_json::Value`.

use crate::builtins::BuiltinCodec;
use crate::decl::DeclId;
use crate::ir::{Access, Constructor, Literal, WireShape};

/// Path of a declared type as seen from generated code.
pub fn local_path(type_name: &str) -> String {
    format!("crate::{type_name}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodecPlan {
    /// Qualified name of the target type.
    pub type_name: String,
    /// Path the generated code uses for it.
    pub type_path: String,
    /// Codec module path; also the artifact name.
    pub ident: String,
    pub attributed_to: DeclId,
    pub body: PlanBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanBody {
    Struct(StructPlan),
    Enum(EnumPlan),
    External(ExternalPlan),
    Family(FamilyPlan),
}

/// How a nested value is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecRef {
    Builtin(&'static BuiltinCodec),
    /// Looked up in the registry by type. `local` types are declared in the
    /// compiled crate.
    Lookup { type_name: String, local: bool },
    /// Untyped fallback for a type nobody resolved at compile time.
    Dynamic { type_name: String },
    /// Family member behind `Box<dyn Family>`; the family is always local.
    Family { type_name: String },
    Optional(Box<CodecRef>),
    List(Box<CodecRef>),
    Map(Box<CodecRef>),
    Boxed(Box<CodecRef>),
}

impl CodecRef {
    /// Path used in generated code for a looked-up type.
    pub fn lookup_path(type_name: &str, local: bool) -> String {
        if local { local_path(type_name) } else { type_name.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    /// Declared attribute name.
    pub attribute: String,
    /// Key in the object shape.
    pub key: String,
    pub codec: CodecRef,
    pub nullable: bool,
    pub required: bool,
    pub default: Literal,
    pub explicit_default: bool,
    pub read: Access,
    /// Where a value read from input goes.
    pub store: Store,
    pub ignored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Store {
    Assign(Access),
    /// Constructor argument slot.
    Arg(usize),
    /// Written only.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstructPlan {
    Mutate { via: Option<String> },
    /// `params[i]` is the attribute passed as the i-th argument (for the
    /// struct expression, the field). Ignored attributes only contribute
    /// their default.
    Args { ctor: Constructor, params: Vec<FieldPlan> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructPlan {
    /// Declaration order.
    pub object: Option<Vec<FieldPlan>>,
    /// Ordinal order.
    pub array: Option<Vec<FieldPlan>>,
    pub preferred: WireShape,
    pub type_alias: String,
    pub construct: ConstructPlan,
}

impl StructPlan {
    /// A struct with both shapes is registered through a format description.
    pub fn both_shapes(&self) -> bool {
        self.object.is_some() && self.array.is_some()
    }

    /// Default-constructible structs also get a binder (read into an
    /// existing instance).
    pub fn has_binder(&self) -> bool {
        matches!(self.construct, ConstructPlan::Mutate { .. })
    }

    pub fn shape(&self, shape: WireShape) -> Option<&[FieldPlan]> {
        match shape {
            WireShape::Object => self.object.as_deref(),
            WireShape::Array => self.array.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumPlan {
    /// (variant, external name)
    pub constants: Vec<(String, String)>,
    /// Some variants are ignored and cannot be written.
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPlan {
    pub converter: String,
    pub reader: String,
    pub writer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPlan {
    pub type_name: String,
    pub ident: String,
    pub tag: String,
    pub object: bool,
    pub array: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyPlan {
    pub discriminator: String,
    pub members: Vec<MemberPlan>,
    /// Index into `members`.
    pub default: Option<usize>,
}

impl FamilyPlan {
    pub fn member_by_tag(&self, tag: &str) -> Option<&MemberPlan> {
        self.members.iter().find(|m| m.tag == tag)
    }

    pub fn member_by_type(&self, type_name: &str) -> Option<&MemberPlan> {
        self.members.iter().find(|m| m.type_name == type_name)
    }

    pub fn default_member(&self) -> Option<&MemberPlan> {
        self.default.and_then(|i| self.members.get(i))
    }
}
