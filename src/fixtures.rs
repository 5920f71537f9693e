// Declaration fixtures shared by the unit tests.
use serde_json::{json, Value};

use crate::analysis::analyze;
use crate::decl::{Declaration, InMemorySource, NoKnownTypes};
use crate::diagnostics::Diagnostics;
use crate::ir::TypeGraph;
use crate::settings::{LogLevel, Settings};
use crate::synonyms::{COMPILED_JSON, CONFIGURATION_TRAIT, JSON_ATTRIBUTE, JSON_CONVERTER};

pub fn source(decls: Value) -> InMemorySource {
    let decls: Vec<Declaration> = serde_json::from_value(decls).unwrap();
    decls.into_iter().collect()
}

pub fn graph(source: &InMemorySource) -> TypeGraph {
    let mut diags = Diagnostics::new(LogLevel::Info);
    let graph = analyze(source, &NoKnownTypes, &Settings::default(), &mut diags);
    assert!(!diags.has_errors(), "{:?}", diags.into_vec());
    graph
}

pub fn marker(values: Value) -> Value {
    json!([{ "name": COMPILED_JSON, "values": values }])
}

/// `geo::Point { x: i32, y: i32 }` with the given formats.
pub fn point(formats: Value) -> Value {
    json!({
        "name": "geo::Point",
        "annotations": marker(json!({ "formats": formats })),
        "supertypes": ["Default"],
        "fields": [{ "name": "x", "ty": "i32" }, { "name": "y", "ty": "i32" }]
    })
}

/// An order with a required id, an indexed note with a default, nested lines
/// and an enum.
pub fn shop() -> Value {
    json!([
        {
            "name": "shop::Order",
            "annotations": marker(json!({ "formats": ["object", "array"] })),
            "supertypes": ["Default"],
            "fields": [
                { "name": "id", "ty": "i64", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "mandatory": true, "index": 0 } }] },
                { "name": "note", "ty": "String", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "name": "n", "default": "none" } }] },
                { "name": "lines", "ty": "Vec<shop::Line>" },
                { "name": "status", "ty": "Option<shop::Status>" },
                { "name": "cache", "ty": "String", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "ignore": true } }] }
            ]
        },
        {
            "name": "shop::Line",
            "annotations": marker(json!({})),
            "supertypes": ["Default"],
            "fields": [{ "name": "sku", "ty": "String" }, { "name": "qty", "ty": "u32" }]
        },
        {
            "name": "shop::Status",
            "kind": "enum",
            "annotations": marker(json!({})),
            "variants": [
                { "name": "Open" },
                { "name": "Closed", "annotations": [{ "name": JSON_ATTRIBUTE, "values": { "name": "closed" } }] }
            ]
        }
    ])
}

/// Family `zoo::Animal` with members tagged "dog" and "cat".
pub fn zoo(default_member: Option<&str>) -> Value {
    let mut root = json!({ "discriminator": "kind" });
    if let Some(member) = default_member {
        root["deserialize_as"] = json!(member);
    }
    json!([
        { "name": "zoo::Animal", "kind": "trait", "annotations": marker(root) },
        {
            "name": "zoo::Dog",
            "annotations": marker(json!({ "name": "dog", "formats": ["object", "array"] })),
            "supertypes": ["Default", "zoo::Animal"],
            "fields": [{ "name": "name", "ty": "String" }, { "name": "good", "ty": "bool" }]
        },
        {
            "name": "zoo::Cat",
            "annotations": marker(json!({ "name": "cat" })),
            "supertypes": ["Default", "zoo::Animal"],
            "fields": [{ "name": "name", "ty": "String" }, { "name": "lives", "ty": "i32" }]
        }
    ])
}

/// Immutable `Money` built through a marked constructor.
pub fn money() -> Value {
    json!({
        "name": "bank::Money",
        "annotations": marker(json!({})),
        "fields": [{ "name": "amount", "ty": "i64", "visibility": "private" }, { "name": "currency", "ty": "String", "visibility": "private" }],
        "methods": [{ "name": "amount", "returns": "i64" }, { "name": "currency", "returns": "String" }],
        "constructors": [
            { "name": "of", "params": [{ "name": "amount", "ty": "i64" }, { "name": "currency", "ty": "String" }],
              "annotations": [{ "name": COMPILED_JSON }] },
            { "name": "zero", "visibility": "private" }
        ]
    })
}

/// Converter for `time::Instant`; `configuration` makes it self-registering.
pub fn instant_converter(configuration: bool) -> Value {
    let supertypes = if configuration { json!([CONFIGURATION_TRAIT]) } else { json!([]) };
    json!({
        "name": "conv::InstantConverter",
        "annotations": [{ "name": JSON_CONVERTER, "values": { "target": "time::Instant" } }],
        "supertypes": supertypes,
        "fields": [
            { "name": "JSON_READER", "ty": "Reader", "is_static": true },
            { "name": "JSON_WRITER", "ty": "Writer", "is_static": true }
        ]
    })
}

/// Recursive `list::Node` holding its tail as `Option<Box<Node>>`.
pub fn linked_list() -> Value {
    json!([{
        "name": "list::Node",
        "annotations": marker(json!({})),
        "supertypes": ["Default"],
        "fields": [{ "name": "value", "ty": "i32" }, { "name": "next", "ty": "Option<Box<list::Node>>" }]
    }])
}

/// The zoo family plus `zoo::Pen`, which holds one animal.
pub fn pen() -> Value {
    let mut decls = zoo(None).as_array().cloned().unwrap_or_default();
    decls.push(json!({
        "name": "zoo::Pen",
        "annotations": marker(json!({})),
        "supertypes": ["Default"],
        "fields": [{ "name": "size", "ty": "u8" }, { "name": "pet", "ty": "Box<dyn zoo::Animal>" }]
    }));
    json!(decls)
}
