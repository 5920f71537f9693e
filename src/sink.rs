use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::decl::DeclId;
use crate::naming;

pub trait ArtifactSink {
    /// Open a new source artifact named by module path.
    fn create(&mut self, name: &str, attributed_to: &[DeclId]) -> io::Result<Box<dyn Write>>;

    /// Append lines to a listing artifact, creating it if needed.
    fn append_listing(&mut self, name: &str, lines: &[String], attributed_to: &[DeclId]) -> io::Result<()>;
}

// ————————————————————————————————————————————————————————————————————————————
// IN MEMORY
// ————————————————————————————————————————————————————————————————————————————

/// Keeps every artifact in memory, in creation order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    sources: IndexMap<String, (Vec<DeclId>, Arc<Mutex<Vec<u8>>>)>,
    listings: BTreeMap<String, Vec<String>>,
}

/// Writer handed out by `MemorySink::create`.
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.0.lock().map_err(|_| io::Error::other("artifact buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source artifacts as `(name, text)`, creation order.
    pub fn sources(&self) -> Vec<(String, String)> {
        self.sources
            .iter()
            .map(|(name, (_, buf))| {
                let bytes = buf.lock().map(|b| b.clone()).unwrap_or_default();
                (name.clone(), String::from_utf8_lossy(&bytes).into_owned())
            })
            .collect()
    }

    pub fn source(&self, name: &str) -> Option<String> {
        self.sources().into_iter().find(|(n, _)| n == name).map(|(_, text)| text)
    }

    pub fn attributed_to(&self, name: &str) -> Option<&[DeclId]> {
        self.sources.get(name).map(|(ids, _)| ids.as_slice())
    }

    pub fn listing(&self, name: &str) -> Option<&[String]> {
        self.listings.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.listings.is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn create(&mut self, name: &str, attributed_to: &[DeclId]) -> io::Result<Box<dyn Write>> {
        if self.sources.contains_key(name) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("artifact '{name}' already exists")));
        }
        let buffer = Arc::new(Mutex::new(Vec::new()));
        self.sources.insert(name.to_string(), (attributed_to.to_vec(), buffer.clone()));
        Ok(Box::new(SharedBuffer(buffer)))
    }

    fn append_listing(&mut self, name: &str, lines: &[String], _attributed_to: &[DeclId]) -> io::Result<()> {
        self.listings.entry(name.to_string()).or_default().extend(lines.iter().cloned());
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FILESYSTEM
// ————————————————————————————————————————————————————————————————————————————

/// Writes artifacts under a root directory: `a::b::C` → `<root>/a/b/C.rs`.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for FsSink {
    fn create(&mut self, name: &str, _attributed_to: &[DeclId]) -> io::Result<Box<dyn Write>> {
        let path = self.root.join(naming::artifact_path(name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok(Box::new(io::BufWriter::new(file)))
    }

    fn append_listing(&mut self, name: &str, lines: &[String], _attributed_to: &[DeclId]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let mut file = OpenOptions::new().append(true).create(true).open(self.root.join(name))?;
        for line in lines {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}
