//! One compilation round, end to end.
//!
//! analyze → (abort on any error) → lower + emit in parallel → assemble →
//! commit. Nothing reaches the sink unless the whole round is error free up to
//! the commit step; I/O failures during commit only lose the affected
//! artifact.
use std::collections::HashSet;
use std::io::Write;

use rayon::prelude::*;

use crate::analysis::analyze;
use crate::assemble::{self, MANIFEST};
use crate::codegen::{self, Artifact};
use crate::decl::{DeclarationSource, KnownTypes};
use crate::diagnostics::{Diagnostics, Location, Severity};
use crate::error::EmitError;
use crate::ir::TypeGraph;
use crate::lower::{emits_artifact, lower};
use crate::plan::CodecPlan;
use crate::settings::Settings;
use crate::sink::ArtifactSink;

/// Everything a round produced.
#[derive(Debug)]
pub struct Round {
    pub graph: TypeGraph,
    pub plans: Vec<CodecPlan>,
    /// Names of the artifacts that reached the sink.
    pub committed: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl Round {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

#[tracing::instrument(level = "info", skip_all)]
pub fn process_round(
    source: &dyn DeclarationSource,
    known: &dyn KnownTypes,
    settings: &Settings,
    sink: &mut dyn ArtifactSink,
) -> Round {
    let mut diags = Diagnostics::new(settings.log_level);
    let graph = analyze(source, known, settings, &mut diags);
    let configuration = settings.configuration.as_deref();

    if assemble::root_disabled_with_converters(configuration, &graph, &mut diags) || diags.has_errors() {
        tracing::info!(errors = diags.error_count(), "round aborted before emission");
        return Round { graph, plans: Vec::new(), committed: Vec::new(), diagnostics: diags };
    }

    let emitted: Vec<(CodecPlan, Artifact)> = graph
        .iter()
        .filter(|desc| emits_artifact(desc))
        .collect::<Vec<_>>()
        .par_iter()
        .map(|desc| {
            let plan = lower(desc, &graph);
            let artifact = codegen::emit(&plan);
            (plan, artifact)
        })
        .collect();
    tracing::debug!(artifacts = emitted.len(), "codecs emitted");

    let mut seen = HashSet::new();
    for (plan, artifact) in &emitted {
        if !seen.insert(artifact.name.as_str()) {
            let err = EmitError::DuplicateArtifact { name: artifact.name.clone() };
            diags.error(err.to_string(), Location::decl(&plan.type_name));
        }
    }
    let plans: Vec<&CodecPlan> = emitted.iter().map(|(plan, _)| plan).collect();
    let assembly = match diags.has_errors() {
        true => None,
        false => assemble::assemble(configuration, &plans, &graph, &mut diags),
    };
    let Some(assembly) = assembly else {
        let plans = emitted.into_iter().map(|(plan, _)| plan).collect();
        return Round { graph, plans, committed: Vec::new(), diagnostics: diags };
    };

    let mut committed = Vec::new();
    for artifact in emitted.iter().map(|(_, artifact)| artifact).chain(assembly.root.as_ref()) {
        match commit(sink, artifact) {
            Ok(()) => committed.push(artifact.name.clone()),
            Err(err) => diags.report(Severity::Error, err.to_string(), None),
        }
    }
    if !assembly.manifest.is_empty() {
        if let Err(source) = sink.append_listing(MANIFEST, &assembly.manifest, &assembly.manifest_attributed_to) {
            let err = EmitError::Io { name: MANIFEST.to_string(), source };
            diags.report(Severity::Error, err.to_string(), None);
        }
    }
    tracing::info!(committed = committed.len(), "round complete");

    let plans = emitted.into_iter().map(|(plan, _)| plan).collect();
    Round { graph, plans, committed, diagnostics: diags }
}

fn commit(sink: &mut dyn ArtifactSink, artifact: &Artifact) -> Result<(), EmitError> {
    let io = |source| EmitError::Io { name: artifact.name.clone(), source };
    let mut out = sink.create(&artifact.name, &artifact.attributed_to).map_err(io)?;
    out.write_all(artifact.text.as_bytes()).map_err(io)?;
    out.flush().map_err(io)
}
