//! Output identifiers for generated codecs.
//!
//! A codec lives next to its type (`shop::Point` → `shop::_Point_JsonCodec`)
//! unless the type's namespace cannot receive code; those codecs move under
//! the library namespace, mirroring the type's own path.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::TypeDescriptor;

pub const CODEC_SUFFIX: &str = "_JsonCodec";
pub const LIBRARY_NAMESPACE: &str = "compiled_json";

static RESERVED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(std|core|alloc)(::|$)").expect("static regex"));
static PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").expect("static regex"));

/// System namespaces nothing may be generated into.
pub fn is_reserved(namespace: &str) -> bool {
    RESERVED.is_match(namespace)
}

/// `a::b::C` shaped, no generics.
pub fn is_valid_path(path: &str) -> bool {
    PATH.is_match(path)
}

pub fn namespace_of(path: &str) -> Option<&str> {
    path.rsplit_once("::").map(|(ns, _)| ns)
}

pub fn codec_ident(desc: &TypeDescriptor) -> String {
    let local = format!("_{}{CODEC_SUFFIX}", desc.simple_name());
    match desc.namespace() {
        Some(ns) if desc.namespace_sealed || is_reserved(ns) => format!("{LIBRARY_NAMESPACE}::{ns}::{local}"),
        Some(ns) => format!("{ns}::{local}"),
        None => local,
    }
}

/// Relative file path of an artifact: `a::b::C` → `a/b/C.rs`.
pub fn artifact_path(ident: &str) -> String {
    format!("{}.rs", ident.replace("::", "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::DeclId;
    use crate::ir::{EnumInfo, TypeKind};

    fn desc(name: &str, sealed: bool) -> TypeDescriptor {
        TypeDescriptor {
            name: name.into(),
            binary_name: name.into(),
            decl: DeclId(0),
            namespace_sealed: sealed,
            kind: TypeKind::Enum(EnumInfo { constants: vec![], partial: false }),
        }
    }

    #[test]
    fn sibling_identifier() {
        assert_eq!(codec_ident(&desc("shop::model::Point", false)), "shop::model::_Point_JsonCodec");
        assert_eq!(codec_ident(&desc("Point", false)), "_Point_JsonCodec");
    }

    #[test]
    fn sealed_and_reserved_namespaces_move() {
        assert_eq!(codec_ident(&desc("vendor::Money", true)), "compiled_json::vendor::_Money_JsonCodec");
        assert_eq!(codec_ident(&desc("std::time::Duration", false)), "compiled_json::std::time::_Duration_JsonCodec");
        // the root namespace is never sealed off
        assert_eq!(codec_ident(&desc("Root", true)), "_Root_JsonCodec");
        // prefix only, not substring
        assert_eq!(codec_ident(&desc("stdlib::X", false)), "stdlib::_X_JsonCodec");
    }

    #[test]
    fn paths() {
        assert_eq!(artifact_path("a::b::_C_JsonCodec"), "a/b/_C_JsonCodec.rs");
        assert_eq!(artifact_path("JsonConfiguration"), "JsonConfiguration.rs");
        assert!(is_valid_path("app::JsonConfiguration"));
        assert!(!is_valid_path("app::"));
        assert!(!is_valid_path("Vec<i32>"));
    }
}
