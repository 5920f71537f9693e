//! Declared value types.
//!
//! Attribute types arrive as text (`Option<Vec<shop::Item>>`). They are parsed
//! once into a small tree so the builder can decompose containers and the
//! built-in table can be keyed by a canonical spelling.
use std::fmt;

use crate::error::TypeSyntaxError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueType {
    pub path: String,
    pub args: Vec<ValueType>,
    /// `dyn Path`: a trait object, only meaningful inside `Box`.
    pub is_dyn: bool,
}

/// Container shapes the codecs know how to decompose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container<'a> {
    Option(&'a ValueType),
    List(&'a ValueType),
    /// String-keyed map; the payload is the value type.
    Map(&'a ValueType),
    /// `Box<T>`, read and written as `T`.
    Boxed(&'a ValueType),
}

const OPTION_PATHS: &[&str] = &["Option", "std::option::Option", "core::option::Option"];
const LIST_PATHS: &[&str] = &["Vec", "std::vec::Vec", "alloc::vec::Vec"];
const BOX_PATHS: &[&str] = &["Box", "std::boxed::Box", "alloc::boxed::Box"];
const MAP_PATHS: &[&str] = &[
    "BTreeMap",
    "std::collections::BTreeMap",
    "HashMap",
    "std::collections::HashMap",
    "IndexMap",
    "indexmap::IndexMap",
];

impl ValueType {
    pub fn named(path: impl Into<String>) -> Self {
        Self { path: path.into(), args: Vec::new(), is_dyn: false }
    }

    pub fn generic(path: impl Into<String>, args: Vec<ValueType>) -> Self {
        Self { path: path.into(), args, is_dyn: false }
    }

    pub fn parse(text: &str) -> Result<Self, TypeSyntaxError> {
        let mut p = Parser { text, pos: 0 };
        p.skip_ws();
        let ty = p.ty()?;
        p.skip_ws();
        if p.pos != text.len() {
            return Err(p.error("trailing input"));
        }
        Ok(ty)
    }

    pub fn container(&self) -> Option<Container<'_>> {
        let path = self.path.as_str();
        match self.args.as_slice() {
            [inner] if OPTION_PATHS.contains(&path) => Some(Container::Option(inner)),
            [inner] if LIST_PATHS.contains(&path) => Some(Container::List(inner)),
            [inner] if BOX_PATHS.contains(&path) => Some(Container::Boxed(inner)),
            [key, value] if MAP_PATHS.contains(&path) && key.is_string() => Some(Container::Map(value)),
            _ => None,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self.container(), Some(Container::Option(_)))
    }

    pub fn is_string(&self) -> bool {
        self.args.is_empty() && matches!(self.path.as_str(), "String" | "std::string::String")
    }

    /// Namespace part of the path, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.path.rsplit_once("::").map(|(ns, _)| ns)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dyn {
            f.write_str("dyn ")?;
        }
        f.write_str(&self.path)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &'static str) -> TypeSyntaxError {
        TypeSyntaxError { text: self.text.to_string(), offset: self.pos, reason }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<&str, TypeSyntaxError> {
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map_or(self.rest().len(), |(i, _)| i);
        if len == 0 || self.rest().starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("expected identifier"));
        }
        self.pos += len;
        Ok(&self.text[start..self.pos])
    }

    /// `dyn` followed by whitespace; `dynamo::X` is a plain path.
    fn eat_dyn(&mut self) -> bool {
        let rest = self.rest();
        if rest.starts_with("dyn") && rest[3..].starts_with(char::is_whitespace) {
            self.pos += 3;
            self.skip_ws();
            true
        } else {
            false
        }
    }

    fn ty(&mut self) -> Result<ValueType, TypeSyntaxError> {
        let is_dyn = self.eat_dyn();
        let mut path = String::new();
        if self.eat("::") {
            path.push_str("::");
        }
        path.push_str(self.ident()?);
        while self.eat("::") {
            path.push_str("::");
            path.push_str(self.ident()?);
        }
        self.skip_ws();
        let mut args = Vec::new();
        if self.eat("<") {
            loop {
                self.skip_ws();
                args.push(self.ty()?);
                self.skip_ws();
                if self.eat(",") {
                    continue;
                }
                if self.eat(">") {
                    break;
                }
                return Err(self.error("expected ',' or '>'"));
            }
            if args.is_empty() {
                return Err(self.error("empty generic argument list"));
            }
        }
        if is_dyn && !args.is_empty() {
            return Err(self.error("generic trait objects are not supported"));
        }
        Ok(ValueType { path, args, is_dyn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_spelling_normalizes_whitespace() {
        let ty = ValueType::parse(" chrono::DateTime< chrono::FixedOffset >").unwrap();
        assert_eq!(ty.to_string(), "chrono::DateTime<chrono::FixedOffset>");
        let nested = ValueType::parse("Option<Vec<shop::Item>>").unwrap();
        assert_eq!(nested.to_string(), "Option<Vec<shop::Item>>");
    }

    #[test]
    fn containers_decompose() {
        let opt = ValueType::parse("Option<i32>").unwrap();
        assert!(matches!(opt.container(), Some(Container::Option(t)) if t.path == "i32"));
        let map = ValueType::parse("BTreeMap<String, shop::Item>").unwrap();
        assert!(matches!(map.container(), Some(Container::Map(t)) if t.path == "shop::Item"));
        let keyed = ValueType::parse("HashMap<i32, String>").unwrap();
        assert_eq!(keyed.container(), None);
    }

    #[test]
    fn boxed_trait_objects() {
        let ty = ValueType::parse("Box< dyn  zoo::Animal >").unwrap();
        assert_eq!(ty.to_string(), "Box<dyn zoo::Animal>");
        let Some(Container::Boxed(inner)) = ty.container() else { panic!("not boxed") };
        assert!(inner.is_dyn);
        assert_eq!(inner.path, "zoo::Animal");

        let plain = ValueType::parse("Option<Box<list::Node>>").unwrap();
        let Some(Container::Option(boxed)) = plain.container() else { panic!("not optional") };
        assert!(matches!(boxed.container(), Some(Container::Boxed(t)) if !t.is_dyn && t.path == "list::Node"));
        assert!(!ValueType::parse("dynamo::X").unwrap().is_dyn);
        assert!(ValueType::parse("Box<dyn a::T<i32>>").is_err());
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(ValueType::parse("Vec<i32").unwrap_err().reason, "expected ',' or '>'");
        assert!(ValueType::parse("Vec<>").is_err());
        assert!(ValueType::parse("a::").is_err());
        assert!(ValueType::parse("i32 x").is_err());
    }
}
