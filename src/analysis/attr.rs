use crate::decl::{Annotation, Declaration, Visibility};
use crate::ir::Access;

/// A visible property before synonyms are applied.
#[derive(Clone, Debug)]
pub struct Property<'d> {
    pub name: String,
    pub ty: &'d str,
    /// Annotations from every element that contributes to the property
    /// (field, getter, setter, constructor parameter), in that order.
    pub annotations: Vec<Annotation>,
    pub read: Access,
    pub write: Option<Access>,
    pub from_field: bool,
}

/// Public instance fields first, then accessor pairs, in declaration order.
///
/// Getters are `x()`, `get_x()` or `is_x()` with no parameters; setters are
/// `set_x(v)`. A setter without a getter is not a property.
pub fn collect_properties(decl: &Declaration) -> Vec<Property<'_>> {
    let mut props: Vec<Property<'_>> = Vec::new();

    for field in &decl.fields {
        if field.is_static || field.visibility != Visibility::Public {
            continue;
        }
        props.push(Property {
            name: field.name.clone(),
            ty: &field.ty,
            annotations: field.annotations.clone(),
            read: Access::Field(field.name.clone()),
            write: Some(Access::Field(field.name.clone())),
            from_field: true,
        });
    }

    for method in &decl.methods {
        if method.visibility != Visibility::Public || !method.params.is_empty() {
            continue;
        }
        let Some(returns) = method.returns.as_deref() else { continue };
        if method.name.starts_with("set_") {
            continue;
        }
        let name = getter_property_name(&method.name, returns);
        match props.iter_mut().find(|p| p.name == name) {
            // field already covers it; keep the field, merge the annotations
            Some(existing) => existing.annotations.extend(method.annotations.iter().cloned()),
            None => props.push(Property {
                name: name.to_string(),
                ty: returns,
                annotations: method.annotations.clone(),
                read: Access::Method(method.name.clone()),
                write: None,
                from_field: false,
            }),
        }
    }

    for method in &decl.methods {
        if method.visibility != Visibility::Public || method.params.len() != 1 {
            continue;
        }
        let Some(name) = method.name.strip_prefix("set_") else { continue };
        if let Some(prop) = props.iter_mut().find(|p| p.name == name && !p.from_field) {
            if prop.ty.trim() == method.params[0].ty.trim() {
                prop.write = Some(Access::Method(method.name.clone()));
                prop.annotations.extend(method.annotations.iter().cloned());
                prop.annotations.extend(method.params[0].annotations.iter().cloned());
            }
        }
    }

    props
}

fn getter_property_name<'m>(method: &'m str, returns: &str) -> &'m str {
    if let Some(rest) = method.strip_prefix("get_") {
        return rest;
    }
    if returns.trim() == "bool" {
        if let Some(rest) = method.strip_prefix("is_") {
            return rest;
        }
    }
    method
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{FieldDecl, MethodDecl, Param};

    fn getter(name: &str, ty: &str) -> MethodDecl {
        MethodDecl { name: name.into(), returns: Some(ty.into()), ..MethodDecl::default() }
    }

    fn setter(name: &str, ty: &str) -> MethodDecl {
        MethodDecl {
            name: name.into(),
            params: vec![Param { name: "v".into(), ty: ty.into(), annotations: vec![] }],
            ..MethodDecl::default()
        }
    }

    #[test]
    fn fields_then_accessor_pairs() {
        let decl = Declaration {
            name: "a::B".into(),
            fields: vec![
                FieldDecl { name: "id".into(), ty: "i64".into(), ..FieldDecl::default() },
                FieldDecl { name: "secret".into(), ty: "String".into(), visibility: Visibility::Private, ..FieldDecl::default() },
                FieldDecl { name: "COUNT".into(), ty: "i32".into(), is_static: true, ..FieldDecl::default() },
            ],
            methods: vec![
                getter("get_name", "String"),
                setter("set_name", "String"),
                getter("is_active", "bool"),
                getter("total", "f64"),
                setter("set_orphan", "i32"),
            ],
            ..Declaration::default()
        };
        let props = collect_properties(&decl);
        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "active", "total"]);
        assert_eq!(props[1].write, Some(Access::Method("set_name".into())));
        assert_eq!(props[1].read, Access::Method("get_name".into()));
        assert_eq!(props[2].write, None);
    }

    #[test]
    fn setter_with_other_type_is_not_paired() {
        let decl = Declaration {
            name: "C".into(),
            methods: vec![getter("size", "i32"), setter("set_size", "i64")],
            ..Declaration::default()
        };
        let props = collect_properties(&decl);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].write, None);
    }
}
