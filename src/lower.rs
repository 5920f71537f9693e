use std::collections::HashMap;

use crate::ir::{
    AttributeDescriptor, EnumInfo, ExternalInfo, FamilyInfo, Materialization, Nullability, StructInfo, TypeDescriptor,
    TypeGraph, TypeKind, ValueCodec,
};
use crate::naming;
use crate::plan::{
    local_path, CodecPlan, CodecRef, ConstructPlan, EnumPlan, ExternalPlan, FamilyPlan, FieldPlan, MemberPlan, PlanBody, Store,
    StructPlan,
};

/// Lower one descriptor into its codec plan. Pure: reads the graph only to
/// resolve family members.
pub fn lower(desc: &TypeDescriptor, graph: &TypeGraph) -> CodecPlan {
    let body = match &desc.kind {
        TypeKind::Struct(info) => PlanBody::Struct(lower_struct(info)),
        TypeKind::Enum(info) => PlanBody::Enum(lower_enum(info)),
        TypeKind::External(info) => PlanBody::External(lower_external(info)),
        TypeKind::Family(info) => PlanBody::Family(lower_family(info, graph)),
    };
    // converter targets are written the way the user spelled them
    let type_path = match &desc.kind {
        TypeKind::External(_) => desc.name.clone(),
        _ => local_path(&desc.name),
    };
    CodecPlan {
        type_name: desc.name.clone(),
        type_path,
        ident: naming::codec_ident(desc),
        attributed_to: desc.decl,
        body,
    }
}

/// Self-registering converters bring their own configuration; everything
/// else gets a generated artifact.
pub fn emits_artifact(desc: &TypeDescriptor) -> bool {
    !matches!(&desc.kind, TypeKind::External(info) if info.self_registering)
}

pub fn codec_ref(codec: &ValueCodec) -> CodecRef {
    match codec {
        ValueCodec::Builtin(builtin) => CodecRef::Builtin(builtin),
        ValueCodec::Reference { type_name } => CodecRef::Lookup { type_name: type_name.clone(), local: true },
        ValueCodec::Known { type_name } => CodecRef::Lookup { type_name: type_name.clone(), local: false },
        ValueCodec::Generic { type_name } => CodecRef::Dynamic { type_name: type_name.clone() },
        ValueCodec::Optional(inner) => CodecRef::Optional(Box::new(codec_ref(inner))),
        ValueCodec::List(inner) => CodecRef::List(Box::new(codec_ref(inner))),
        ValueCodec::Map(inner) => CodecRef::Map(Box::new(codec_ref(inner))),
        ValueCodec::Boxed(inner) => CodecRef::Boxed(Box::new(codec_ref(inner))),
        ValueCodec::Family { type_name } => CodecRef::Family { type_name: type_name.clone() },
    }
}

fn lower_struct(info: &StructInfo) -> StructPlan {
    // attribute index → constructor slot
    let slots: HashMap<usize, usize> = match &info.materialization {
        Materialization::ConstructFromArgs { args, .. } => args.iter().enumerate().map(|(slot, &i)| (i, slot)).collect(),
        Materialization::DefaultThenMutate { .. } => HashMap::new(),
    };
    let field = |index: usize, attr: &AttributeDescriptor| {
        let store = match &info.materialization {
            Materialization::DefaultThenMutate { .. } => attr.write.clone().map_or(Store::Skip, Store::Assign),
            Materialization::ConstructFromArgs { .. } => slots.get(&index).map_or(Store::Skip, |&s| Store::Arg(s)),
        };
        FieldPlan {
            attribute: attr.name.clone(),
            key: attr.external_name.clone(),
            codec: codec_ref(&attr.codec),
            nullable: attr.nullability == Nullability::Nullable,
            required: attr.required,
            default: attr.default.clone(),
            explicit_default: attr.explicit_default,
            read: attr.read.clone(),
            store,
            ignored: attr.ignored,
        }
    };

    let construct = match &info.materialization {
        Materialization::DefaultThenMutate { via } => ConstructPlan::Mutate { via: via.clone() },
        Materialization::ConstructFromArgs { ctor, args } => ConstructPlan::Args {
            ctor: ctor.clone(),
            params: args.iter().map(|&i| field(i, &info.attributes[i])).collect(),
        },
    };

    let mut ordered: Vec<usize> = (0..info.attributes.len()).filter(|&i| !info.attributes[i].ignored).collect();
    let object = info.shapes.object.then(|| ordered.iter().map(|&i| field(i, &info.attributes[i])).collect());
    ordered.sort_by_key(|&i| info.attributes[i].ordinal);
    let array = info.shapes.array.then(|| ordered.iter().map(|&i| field(i, &info.attributes[i])).collect());

    StructPlan { object, array, preferred: info.preferred, type_alias: info.type_alias.clone(), construct }
}

fn lower_enum(info: &EnumInfo) -> EnumPlan {
    EnumPlan {
        constants: info.constants.iter().map(|c| (c.name.clone(), c.external_name.clone())).collect(),
        partial: info.partial,
    }
}

fn lower_external(info: &ExternalInfo) -> ExternalPlan {
    ExternalPlan { converter: info.converter.clone(), reader: info.reader.clone(), writer: info.writer.clone() }
}

fn lower_family(info: &FamilyInfo, graph: &TypeGraph) -> FamilyPlan {
    let members: Vec<MemberPlan> = info
        .members
        .iter()
        .filter_map(|name| {
            let desc = graph.get(name)?;
            let member = desc.as_struct()?;
            Some(MemberPlan {
                type_name: desc.name.clone(),
                ident: naming::codec_ident(desc),
                tag: member.type_alias.clone(),
                object: member.shapes.object,
                array: member.shapes.array,
            })
        })
        .collect();
    let default = info.deserialize_as.as_ref().and_then(|d| members.iter().position(|m| &m.type_name == d));
    FamilyPlan { discriminator: info.discriminator.clone(), members, default }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::ir::{Access, Constructor, Literal, WireShape};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn plan_for(graph: &TypeGraph, name: &str) -> CodecPlan {
        lower(graph.get(name).unwrap(), graph)
    }

    #[test]
    fn object_in_declaration_order_array_in_ordinal_order() {
        let graph = fixtures::graph(&fixtures::source(fixtures::shop()));
        let plan = plan_for(&graph, "shop::Order");
        assert_eq!(plan.ident, "shop::_Order_JsonCodec");
        assert_eq!(plan.type_path, "crate::shop::Order");
        let PlanBody::Struct(order) = plan.body else { panic!("not a struct") };
        assert!(order.both_shapes());
        assert!(order.has_binder());
        assert_eq!(order.preferred, WireShape::Object);

        let keys: Vec<_> = order.object.as_ref().unwrap().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, ["id", "n", "lines", "status"]);
        let note = &order.object.as_ref().unwrap()[1];
        assert_eq!(note.default, Literal::Str("none".into()));
        assert!(note.explicit_default);
        assert_eq!(note.store, Store::Assign(Access::Field("note".into())));
        assert_eq!(
            order.object.as_ref().unwrap()[3].codec,
            CodecRef::Optional(Box::new(CodecRef::Lookup { type_name: "shop::Status".into(), local: true }))
        );
        assert!(order.object.as_ref().unwrap()[0].required);
    }

    #[test]
    fn constructor_slots() {
        let graph = fixtures::graph(&fixtures::source(json!([fixtures::money()])));
        let PlanBody::Struct(money) = plan_for(&graph, "bank::Money").body else { panic!("not a struct") };
        let ConstructPlan::Args { ctor, params } = &money.construct else { panic!("not constructed from args") };
        assert_eq!(ctor, &Constructor::Function("of".into()));
        let names: Vec<_> = params.iter().map(|p| p.attribute.as_str()).collect();
        assert_eq!(names, ["amount", "currency"]);
        let stores: Vec<_> = money.object.clone().unwrap().into_iter().map(|f| f.store).collect();
        assert_eq!(stores, [Store::Arg(0), Store::Arg(1)]);
    }

    #[test]
    fn family_members_and_default() {
        let graph = fixtures::graph(&fixtures::source(fixtures::zoo(Some("zoo::Cat"))));
        let PlanBody::Family(family) = plan_for(&graph, "zoo::Animal").body else { panic!("not a family") };
        assert_eq!(family.discriminator, "kind");
        let tags: Vec<_> = family.members.iter().map(|m| m.tag.as_str()).collect();
        assert_eq!(tags, ["dog", "cat"]);
        assert_eq!(family.default_member().unwrap().type_name, "zoo::Cat");
        assert!(family.member_by_tag("dog").unwrap().array);
        assert!(!family.member_by_tag("cat").unwrap().array);
    }

    #[test]
    fn self_registering_converters_emit_nothing() {
        let graph = fixtures::graph(&fixtures::source(json!([fixtures::instant_converter(true)])));
        let desc = graph.get("time::Instant").unwrap();
        assert!(!emits_artifact(desc));
        let plan = lower(desc, &graph);
        assert_eq!(plan.ident, "conv::_InstantConverter_JsonCodec");
        assert!(matches!(plan.body, PlanBody::External(e) if e.reader == "JSON_READER"));
    }
}
