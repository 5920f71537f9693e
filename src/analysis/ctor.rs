use crate::decl::{CtorDecl, Declaration, Visibility};
use crate::error::SchemaError;
use crate::ir::Constructor;
use crate::synonyms::{self, Effect};
use crate::types::ValueType;

use super::attr::Property;

const DEFAULT_TRAITS: &[&str] = &["Default", "std::default::Default", "core::default::Default"];

#[derive(Debug, Clone, PartialEq)]
pub enum Selected<'d> {
    Default { via: Option<String> },
    /// `bindings[i]` is the property bound to the i-th parameter.
    Construct { ctor: Constructor, params: Option<&'d CtorDecl>, bindings: Vec<usize> },
}

/// A default materializer wins; otherwise one constructor must be usable.
///
/// Marked constructors (any `Creator` synonym) are considered first. Without
/// one, a single public constructor is used. A declaration with no
/// constructors at all and only public fields is built with a struct
/// expression.
pub fn select<'d>(decl: &'d Declaration, props: &[Property<'_>]) -> Result<Selected<'d>, SchemaError> {
    if let Some(ctor) = decl.constructors.iter().find(|c| c.params.is_empty() && c.visibility == Visibility::Public) {
        return Ok(Selected::Default { via: Some(ctor.name.clone()) });
    }
    if decl.supertypes.iter().any(|s| DEFAULT_TRAITS.contains(&s.as_str())) {
        return Ok(Selected::Default { via: None });
    }

    let marked: Vec<&CtorDecl> = decl
        .constructors
        .iter()
        .filter(|c| synonyms::resolve_bool(&c.annotations, Effect::Creator) == Some(true))
        .collect();
    let ctor = match marked.as_slice() {
        [one] => *one,
        [] => {
            let public: Vec<&CtorDecl> =
                decl.constructors.iter().filter(|c| c.visibility == Visibility::Public).collect();
            match public.as_slice() {
                [one] => *one,
                [] if decl.constructors.is_empty() && all_fields_public(decl) => {
                    let bindings = props.iter().enumerate().filter(|(_, p)| p.from_field).map(|(i, _)| i).collect();
                    return Ok(Selected::Construct { ctor: Constructor::Literal, params: None, bindings });
                }
                _ => {
                    return Err(SchemaError::NoUsableConstructor { ty: decl.name.clone(), count: public.len() });
                }
            }
        }
        _ => return Err(SchemaError::AmbiguousCreator { ty: decl.name.clone(), count: marked.len() }),
    };

    let bindings = bind_params(decl, ctor, props)?;
    Ok(Selected::Construct { ctor: Constructor::Function(ctor.name.clone()), params: Some(ctor), bindings })
}

fn all_fields_public(decl: &Declaration) -> bool {
    let mut fields = decl.fields.iter().filter(|f| !f.is_static).peekable();
    fields.peek().is_some() && fields.all(|f| f.visibility == Visibility::Public)
}

/// Bind each parameter to a property: by name first, then by position with an
/// identical type. Every property is bound at most once.
fn bind_params(decl: &Declaration, ctor: &CtorDecl, props: &[Property<'_>]) -> Result<Vec<usize>, SchemaError> {
    let mut taken = vec![false; props.len()];
    let mut bound: Vec<Option<usize>> = vec![None; ctor.params.len()];

    for (slot, param) in ctor.params.iter().enumerate() {
        if let Some(i) = props.iter().position(|p| p.name == param.name) {
            if !taken[i] {
                taken[i] = true;
                bound[slot] = Some(i);
            }
        }
    }

    for (slot, param) in ctor.params.iter().enumerate() {
        if bound[slot].is_some() {
            continue;
        }
        let by_position = props
            .get(slot)
            .filter(|p| !taken[slot] && same_type(p.ty, &param.ty))
            .map(|_| slot);
        match by_position {
            Some(i) => {
                taken[i] = true;
                bound[slot] = Some(i);
            }
            None => {
                return Err(SchemaError::UnmatchedParameter { ty: decl.name.clone(), param: param.name.clone() });
            }
        }
    }

    Ok(bound.into_iter().flatten().collect())
}

fn same_type(a: &str, b: &str) -> bool {
    match (ValueType::parse(a), ValueType::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}
