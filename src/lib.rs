//! Compile-time JSON codec synthesis.
//!
//! Declared types marked as JSON-serializable (through any of several
//! annotation vocabularies) are harvested into one type graph; each type is
//! lowered to a codec plan and rendered as Rust source for the
//! `compiled_json_rt` runtime, plus one root configuration that registers
//! them all.
//!
//! ```text
//! DeclarationSource ─ analysis ─▶ TypeGraph ─ lower ─▶ CodecPlan ─ codegen ─▶ Artifact
//!                                                          │                     │
//!                                                       runtime             assemble ─▶ ArtifactSink
//! ```
pub mod analysis;
pub mod assemble;
pub mod builtins;
pub mod cli;
pub mod codegen;
pub mod decl;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod lower;
pub mod naming;
pub mod path_de;
pub mod plan;
pub mod processor;
pub mod runtime;
pub mod settings;
pub mod sink;
pub mod synonyms;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use decl::{DeclarationSource, KnownTypes};
pub use processor::{process_round, Round};
pub use settings::Settings;
