//! Polymorphic families: a marked trait plus every analyzed struct that
//! reaches it through its supertypes.
use std::collections::HashSet;

use crate::decl::DeclarationSource;
use crate::diagnostics::{Diagnostics, Location};
use crate::error::SchemaError;
use crate::ir::{TypeGraph, TypeKind};

/// Transitive supertypes of `name`, nearest first. Declarations unknown to
/// the source end the walk on that branch.
pub fn ancestors(source: &dyn DeclarationSource, name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = std::collections::VecDeque::new();
    if let Some(id) = source.lookup(name) {
        queue.extend(source.declaration(id).supertypes.iter().cloned());
    }
    while let Some(next) = queue.pop_front() {
        if !seen.insert(next.clone()) {
            continue;
        }
        if let Some(id) = source.lookup(&next) {
            queue.extend(source.declaration(id).supertypes.iter().cloned());
        }
        out.push(next);
    }
    out
}

/// Fill family member lists and check their default members.
///
/// A struct may belong to more than one family.
pub fn link(graph: &mut TypeGraph, source: &dyn DeclarationSource, diags: &mut Diagnostics) {
    let structs: Vec<String> =
        graph.iter().filter(|t| matches!(t.kind, TypeKind::Struct(_))).map(|t| t.name.clone()).collect();

    for member in &structs {
        for ancestor in ancestors(source, member) {
            if let Some(TypeKind::Family(info)) = graph.types.get_mut(&ancestor).map(|t| &mut t.kind) {
                if !info.members.contains(member) {
                    info.members.push(member.clone());
                }
            }
        }
    }

    for family in graph.iter() {
        let TypeKind::Family(info) = &family.kind else { continue };
        if let Some(target) = &info.deserialize_as {
            if !info.members.contains(target) {
                let err = SchemaError::MissingDefaultMember { family: family.name.clone(), member: target.clone() };
                diags.error(err.to_string(), Location::decl(&family.name).annotation("deserialize_as"));
            }
        }
        if info.members.is_empty() {
            diags.warning(format!("{} has no analyzed members", family.name), Location::decl(&family.name));
        }
    }
}
