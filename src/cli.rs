//! Development CLI: run a round over declaration documents, or check sample
//! payloads against the reference registry.
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::analysis::analyze;
use crate::decl::{DeclarationDocument, InMemorySource};
use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::path_de::from_slice_with_path;
use crate::processor::process_round;
use crate::runtime::Registry;
use crate::settings::{AnnotationUsage, LogLevel, Settings, UnknownTypes};
use crate::sink::{FsSink, MemorySink};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile JSON codecs from declaration documents
#[derive(Parser, Debug)]
#[command(name = "compiled-json", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run one round and write the generated codecs
    Generate(GenerateOut),
    /// read sample payloads through a type's codec and print them re-serialized
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more declaration documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// processor option as `key=value` (e.g. compiled_json.unknown=WARNING)
    #[arg(short = 'O', long = "option", value_parser = parse_key_value)]
    options: Vec<(String, String)>,

    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    #[arg(long, value_enum)]
    annotation: Option<AnnotationUsage>,

    #[arg(long, value_enum)]
    unknown: Option<UnknownTypes>,

    /// also discover types through Jackson's creator marker
    #[arg(long)]
    jackson: bool,

    /// also discover types through JSON-B's creator marker
    #[arg(long)]
    jsonb: bool,

    /// root configuration artifact name (empty disables it)
    #[arg(long)]
    configuration: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output directory (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// qualified name of the type to read samples as
    #[arg(long = "type")]
    type_name: String,

    /// sample payloads; literal paths or quoted glob patterns
    #[arg(long, num_args = 1.., required = true)]
    sample: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Flags win over `-O` options.
    fn settings(&self) -> anyhow::Result<Settings> {
        let options: BTreeMap<String, String> = self.options.iter().cloned().collect();
        let mut settings = Settings::from_options(&options)?;
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
        if let Some(usage) = self.annotation {
            settings.annotation_usage = usage;
        }
        if let Some(unknown) = self.unknown {
            settings.unknown_types = unknown;
        }
        settings.jackson |= self.jackson;
        settings.jsonb |= self.jsonb;
        if let Some(name) = &self.configuration {
            settings.configuration = Some(name.clone());
        }
        Ok(settings)
    }

    /// Merge every input document into one source.
    fn load(&self) -> anyhow::Result<(InMemorySource, BTreeSet<String>)> {
        let mut source = InMemorySource::new();
        let mut known = BTreeSet::new();
        for path in resolve_file_path_patterns(&self.input)? {
            let bytes = std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let document: DeclarationDocument = from_slice_with_path(&path.to_string_lossy(), &bytes)?;
            tracing::debug!(path = %path.display(), declarations = document.declarations.len(), "loaded document");
            for decl in document.declarations {
                source.add(decl);
            }
            known.extend(document.known_types);
        }
        Ok((source, known))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => target.run(),
            Command::Check(target) => target.run(),
        }
    }
}

impl GenerateOut {
    fn run(&self) -> anyhow::Result<()> {
        let settings = self.input_settings.settings()?;
        let (source, known) = self.input_settings.load()?;
        let round = match &self.out {
            Some(out) => {
                let mut sink = FsSink::new(out);
                process_round(&source, &known, &settings, &mut sink)
            }
            None => {
                let mut sink = MemorySink::new();
                let round = process_round(&source, &known, &settings, &mut sink);
                for (name, text) in sink.sources() {
                    println!("{}", format!("// ——— {name} ———").dimmed());
                    println!("{text}");
                }
                if let Some(lines) = sink.listing(crate::assemble::MANIFEST) {
                    println!("{}", format!("// ——— {} ———", crate::assemble::MANIFEST).dimmed());
                    for line in lines {
                        println!("{line}");
                    }
                }
                round
            }
        };
        report(&round.diagnostics)?;
        if let Some(out) = &self.out {
            eprintln!("{} {} artifact(s) to {}", "wrote".green(), round.committed.len(), out.display());
        }
        Ok(())
    }
}

impl CheckOut {
    fn run(&self) -> anyhow::Result<()> {
        let settings = self.input_settings.settings()?;
        let (source, known) = self.input_settings.load()?;
        let mut diags = Diagnostics::new(settings.log_level);
        let graph = analyze(&source, &known, &settings, &mut diags);
        report(&diags)?;
        if graph.get(&self.type_name).is_none() {
            bail!("type '{}' is not part of the graph", self.type_name);
        }
        let registry = Registry::from_graph(&graph);
        for path in resolve_file_path_patterns(&self.sample)? {
            let bytes = std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let sample: serde_json::Value = from_slice_with_path(&path.to_string_lossy(), &bytes)?;
            let result = registry.read(&self.type_name, &sample).and_then(|data| registry.write(&self.type_name, &data));
            match result {
                Ok(value) => {
                    eprintln!("{} {}", "ok".green(), path.display());
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                Err(error) => eprintln!("{} {}: {error}", "failed".red(), path.display()),
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_diagnostic(diagnostic: &Diagnostic) {
    let severity = match diagnostic.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".cyan(),
    };
    match &diagnostic.location {
        Some(location) => eprintln!("{severity}: {} {}", diagnostic.message, format!("[{location}]").dimmed()),
        None => eprintln!("{severity}: {}", diagnostic.message),
    }
}

/// Print every diagnostic; fail when any of them is an error.
fn report(diags: &Diagnostics) -> anyhow::Result<()> {
    for diagnostic in diags.iter() {
        print_diagnostic(diagnostic);
    }
    match diags.error_count() {
        0 => Ok(()),
        count => bail!("{count} error(s); nothing was generated"),
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}
