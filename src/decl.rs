// Declarations as plain data, plus the two input capabilities the core consumes.
use std::collections::{BTreeMap, BTreeSet, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Handle to a declaration inside a `DeclarationSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    #[default]
    Struct,
    Enum,
    /// Interface-like declaration; a marked trait roots a polymorphic family.
    Trait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// One annotation instance with its explicitly written accessor values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), values: BTreeMap::new() }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn bool_value(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(|v| v.as_bool())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub returns: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtorDecl {
    #[serde(default = "default_ctor_name")]
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

fn default_ctor_name() -> String {
    "new".to_string()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Declaration {
    /// Crate-relative path, e.g. `shop::model::Point`.
    pub name: String,
    #[serde(default)]
    pub kind: DeclKind,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub constructors: Vec<CtorDecl>,
    /// Implemented traits / base markers.
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub variants: Vec<VariantDecl>,
    /// The enclosing namespace cannot receive generated code.
    #[serde(default)]
    pub sealed: bool,
}

impl Declaration {
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, name)
    }

    /// True when the declaration itself or any of its members carries `marker`.
    pub fn is_marked_with(&self, marker: &str) -> bool {
        self.annotation(marker).is_some()
            || self.constructors.iter().any(|c| find_annotation(&c.annotations, marker).is_some())
            || self.methods.iter().any(|m| find_annotation(&m.annotations, marker).is_some())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.name.rsplit_once("::").map(|(ns, _)| ns)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit_once("::").map_or(self.name.as_str(), |(_, n)| n)
    }
}

pub fn find_annotation<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.name == name)
}

// ————————————————————————————————————————————————————————————————————————————
// INPUT CAPABILITIES
// ————————————————————————————————————————————————————————————————————————————

/// Abstract access to the declared types of one compilation round.
pub trait DeclarationSource {
    /// Declarations carrying `marker` on themselves or on one of their members,
    /// in declaration order.
    fn declarations_marked_with(&self, marker: &str) -> Vec<DeclId>;
    fn declaration(&self, id: DeclId) -> &Declaration;
    /// Find an (unmarked) declaration by qualified name.
    fn lookup(&self, name: &str) -> Option<DeclId>;
}

/// Types whose codecs are registered outside this compilation.
pub trait KnownTypes {
    fn is_known(&self, name: &str) -> bool;
}

impl KnownTypes for HashSet<String> {
    fn is_known(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl KnownTypes for BTreeSet<String> {
    fn is_known(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// Adapter for an oracle given as a closure.
pub struct KnownBy<F>(pub F);

impl<F: Fn(&str) -> bool> KnownTypes for KnownBy<F> {
    fn is_known(&self, name: &str) -> bool {
        (self.0)(name)
    }
}

/// Nothing is known beyond the built-ins.
pub struct NoKnownTypes;

impl KnownTypes for NoKnownTypes {
    fn is_known(&self, _name: &str) -> bool {
        false
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IN-MEMORY SOURCE
// ————————————————————————————————————————————————————————————————————————————

/// A declaration set held in memory, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    decls: IndexMap<String, Declaration>,
}

/// On-disk shape of a declaration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclarationDocument {
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    #[serde(default)]
    pub known_types: Vec<String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration; a later declaration with the same name replaces the
    /// earlier one but keeps its position.
    pub fn add(&mut self, decl: Declaration) -> DeclId {
        let (index, _) = self.decls.insert_full(decl.name.clone(), decl);
        DeclId(index)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl FromIterator<Declaration> for InMemorySource {
    fn from_iter<T: IntoIterator<Item = Declaration>>(iter: T) -> Self {
        let mut source = InMemorySource::new();
        for decl in iter {
            source.add(decl);
        }
        source
    }
}

impl DeclarationSource for InMemorySource {
    fn declarations_marked_with(&self, marker: &str) -> Vec<DeclId> {
        self.decls
            .values()
            .enumerate()
            .filter(|(_, d)| d.is_marked_with(marker))
            .map(|(i, _)| DeclId(i))
            .collect()
    }

    fn declaration(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0]
    }

    fn lookup(&self, name: &str) -> Option<DeclId> {
        self.decls.get_index_of(name).map(DeclId)
    }
}
