use std::fmt;

use crate::settings::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Where a diagnostic points: a declaration, optionally one of its members and
/// the annotation that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub declaration: String,
    pub member: Option<String>,
    pub annotation: Option<String>,
}

impl Location {
    pub fn decl(name: impl Into<String>) -> Self {
        Self { declaration: name.into(), ..Self::default() }
    }

    pub fn member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    pub fn annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declaration)?;
        if let Some(member) = &self.member {
            write!(f, ".{member}")?;
        }
        if let Some(annotation) = &self.annotation {
            write!(f, " (@{annotation})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {} [{loc}]", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    level: LogLevel,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(level: LogLevel) -> Self {
        Self { level, items: Vec::new() }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Record a diagnostic. Errors are always kept; warnings and infos are
    /// dropped when the verbosity hides them.
    pub fn report(&mut self, severity: Severity, message: impl Into<String>, location: Option<Location>) {
        let gate = match severity {
            Severity::Error => None,
            Severity::Warning => Some(LogLevel::Errors),
            Severity::Info => Some(LogLevel::Info),
        };
        let message = message.into();
        match severity {
            Severity::Error => tracing::error!(location = ?location, "{message}"),
            Severity::Warning => tracing::warn!(location = ?location, "{message}"),
            Severity::Info => tracing::info!(location = ?location, "{message}"),
        }
        if let Some(gate) = gate {
            if !self.level.is_visible(gate) {
                return;
            }
        }
        self.items.push(Diagnostic { severity, message, location });
    }

    pub fn error(&mut self, message: impl Into<String>, location: Location) {
        self.report(Severity::Error, message, Some(location));
    }

    pub fn warning(&mut self, message: impl Into<String>, location: Location) {
        self.report(Severity::Warning, message, Some(location));
    }

    pub fn info(&mut self, message: impl Into<String>, location: Location) {
        self.report(Severity::Info, message, Some(location));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_survive_silent_level() {
        let mut d = Diagnostics::new(LogLevel::None);
        d.warning("hidden", Location::decl("a::B"));
        d.error("kept", Location::decl("a::B").member("x"));
        assert_eq!(d.iter().count(), 1);
        assert!(d.has_errors());
        assert_eq!(d.iter().next().unwrap().to_string(), "error: kept [a::B.x]");
    }

    #[test]
    fn info_needs_info_level() {
        let mut quiet = Diagnostics::new(LogLevel::Errors);
        quiet.info("note", Location::decl("T"));
        assert_eq!(quiet.iter().count(), 0);

        let mut chatty = Diagnostics::new(LogLevel::Info);
        chatty.info("note", Location::decl("T"));
        assert_eq!(chatty.iter().count(), 1);
        assert!(!chatty.has_errors());
    }
}
