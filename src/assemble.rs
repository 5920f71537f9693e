//! Root configuration artifact and the discovery manifest.
//!
//! The root artifact calls every emitted codec's `Configuration` in discovery
//! order. The manifest lists self-registering converters first, then the root,
//! so the runtime can locate all of them without scanning.
use crate::codegen::{Artifact, Codegen, HEADER, RUNTIME};
use crate::decl::DeclId;
use crate::diagnostics::{Diagnostics, Location, Severity};
use crate::error::ConfigError;
use crate::ir::TypeGraph;
use crate::naming;
use crate::plan::CodecPlan;
use crate::settings::LogLevel;
use crate::synonyms::{COMPILED_JSON, CONFIGURATION_TRAIT};

pub const MANIFEST: &str = "compiled-json.configurations";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub root: Option<Artifact>,
    /// Manifest lines, one configuration path each.
    pub manifest: Vec<String>,
    pub manifest_attributed_to: Vec<DeclId>,
}

/// With the root artifact disabled, self-registering converters would never be
/// registered. Warns once per converter and returns `true` when the round
/// must not produce anything.
pub fn root_disabled_with_converters(configuration: Option<&str>, graph: &TypeGraph, diags: &mut Diagnostics) -> bool {
    if configuration != Some("") || graph.configurations.is_empty() {
        return false;
    }
    if diags.level().is_visible(LogLevel::Info) {
        for converter in graph.configurations.keys() {
            diags.warning(
                format!(
                    "configuration artifact is disabled, but converter '{converter}' implements {CONFIGURATION_TRAIT}; \
                     it has to be registered manually"
                ),
                Location::decl(converter),
            );
        }
    }
    true
}

/// Build the root artifact for `configuration` (if any) over the emitted
/// codecs, plus the manifest. Configuration errors are reported and yield
/// `None`; nothing may be committed then.
#[tracing::instrument(level = "debug", skip_all, fields(codecs = codecs.len()))]
pub fn assemble(
    configuration: Option<&str>,
    codecs: &[&CodecPlan],
    graph: &TypeGraph,
    diags: &mut Diagnostics,
) -> Option<Assembly> {
    let mut manifest: Vec<String> = graph.configurations.keys().cloned().collect();
    let mut manifest_attributed_to: Vec<DeclId> = graph.configurations.values().copied().collect();

    let root = match configuration.filter(|name| !name.is_empty()) {
        None => None,
        Some(name) => {
            if !naming::is_valid_path(name) {
                let err = ConfigError::InvalidConfigurationName { name: name.to_string() };
                diags.report(Severity::Error, err.to_string(), None);
                return None;
            }
            let mut valid = true;
            if naming::namespace_of(name).is_some() {
                for plan in codecs.iter().filter(|p| naming::namespace_of(&p.ident).is_none()) {
                    let err = ConfigError::RootNamespace { root: name.to_string(), referenced: plan.type_name.clone() };
                    diags.error(err.to_string(), Location::decl(&plan.type_name).annotation(COMPILED_JSON));
                    valid = false;
                }
            }
            if !valid {
                return None;
            }
            manifest.push(name.to_string());
            manifest_attributed_to.extend(codecs.iter().map(|p| p.attributed_to));
            Some(root_artifact(name, codecs))
        }
    };

    Some(Assembly { root, manifest, manifest_attributed_to })
}

fn root_artifact(name: &str, codecs: &[&CodecPlan]) -> Artifact {
    let struct_name = name.rsplit_once("::").map_or(name, |(_, n)| n);
    let mut cg = Codegen::new();
    cg.emit_line(HEADER);
    cg.blank();
    cg.emit_line(&format!("use {RUNTIME}::Configuration as _;"));
    cg.blank();
    cg.emit_line(&format!("pub struct {struct_name};"));
    cg.blank();
    cg.open(&format!("impl {RUNTIME}::Configuration for {struct_name} {{"));
    cg.open(&format!("fn configure(&self, registry: &mut {RUNTIME}::Registry) {{"));
    for plan in codecs {
        cg.emit_line(&format!("crate::{}::Configuration.configure(registry);", plan.ident));
    }
    cg.close("}");
    cg.close("}");
    Artifact {
        name: name.to_string(),
        attributed_to: codecs.iter().map(|p| p.attributed_to).collect(),
        text: cg.into_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::lower::lower;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn plans(graph: &TypeGraph) -> Vec<CodecPlan> {
        graph.iter().filter(|d| crate::lower::emits_artifact(d)).map(|d| lower(d, graph)).collect()
    }

    #[test]
    fn root_registers_codecs_in_discovery_order() {
        let graph = fixtures::graph(&fixtures::source(fixtures::shop()));
        let plans = plans(&graph);
        let refs: Vec<&CodecPlan> = plans.iter().collect();
        let mut diags = Diagnostics::new(LogLevel::Info);
        let assembly = assemble(Some("app::JsonConfiguration"), &refs, &graph, &mut diags).unwrap();
        let root = assembly.root.unwrap();
        assert_eq!(root.name, "app::JsonConfiguration");
        let expected = "\
// @generated by compiled-json. Do not edit.

use ::compiled_json_rt::Configuration as _;

pub struct JsonConfiguration;

impl ::compiled_json_rt::Configuration for JsonConfiguration {
    fn configure(&self, registry: &mut ::compiled_json_rt::Registry) {
        crate::shop::_Order_JsonCodec::Configuration.configure(registry);
        crate::shop::_Line_JsonCodec::Configuration.configure(registry);
        crate::shop::_Status_JsonCodec::Configuration.configure(registry);
    }
}
";
        assert_eq!(root.text, expected);
        assert_eq!(assembly.manifest, ["app::JsonConfiguration"]);
    }

    #[test]
    fn no_root_without_a_name() {
        let graph = fixtures::graph(&fixtures::source(json!([fixtures::instant_converter(true)])));
        let mut diags = Diagnostics::new(LogLevel::Info);
        let assembly = assemble(None, &[], &graph, &mut diags).unwrap();
        assert!(assembly.root.is_none());
        assert_eq!(assembly.manifest, ["conv::InstantConverter"]);
    }

    #[test]
    fn namespaced_root_cannot_reach_root_namespace_codecs() {
        let decl = json!({
            "name": "Flat",
            "annotations": fixtures::marker(json!({})),
            "supertypes": ["Default"],
            "fields": [{ "name": "x", "ty": "i32" }]
        });
        let graph = fixtures::graph(&fixtures::source(json!([decl])));
        let plans = plans(&graph);
        let refs: Vec<&CodecPlan> = plans.iter().collect();

        let mut diags = Diagnostics::new(LogLevel::Info);
        assert!(assemble(Some("app::JsonConfiguration"), &refs, &graph, &mut diags).is_none());
        assert_eq!(diags.error_count(), 1);

        let mut diags = Diagnostics::new(LogLevel::Info);
        let assembly = assemble(Some("JsonConfiguration"), &refs, &graph, &mut diags).unwrap();
        assert!(assembly.root.unwrap().text.contains("crate::_Flat_JsonCodec::Configuration.configure(registry);"));
    }

    #[test]
    fn invalid_root_name() {
        let graph = TypeGraph::default();
        let mut diags = Diagnostics::new(LogLevel::Info);
        assert!(assemble(Some("app::"), &[], &graph, &mut diags).is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn disabled_root_with_self_registering_converter() {
        let graph = fixtures::graph(&fixtures::source(json!([fixtures::instant_converter(true)])));
        let mut diags = Diagnostics::new(LogLevel::Info);
        assert!(root_disabled_with_converters(Some(""), &graph, &mut diags));
        assert_eq!(diags.iter().count(), 1);
        assert!(!diags.has_errors());

        let mut quiet = Diagnostics::new(LogLevel::Errors);
        assert!(root_disabled_with_converters(Some(""), &graph, &mut quiet));
        assert_eq!(quiet.iter().count(), 0);

        assert!(!root_disabled_with_converters(None, &graph, &mut quiet));
        assert!(!root_disabled_with_converters(Some(""), &TypeGraph::default(), &mut quiet));
    }
}
