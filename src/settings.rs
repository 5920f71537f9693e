use std::collections::BTreeMap;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::ConfigError;

pub const OPT_LOG_LEVEL: &str = "compiled_json.loglevel";
pub const OPT_ANNOTATION: &str = "compiled_json.annotation";
pub const OPT_UNKNOWN: &str = "compiled_json.unknown";
pub const OPT_JACKSON: &str = "compiled_json.jackson";
pub const OPT_JSONB: &str = "compiled_json.jsonb";
pub const OPT_CONFIGURATION: &str = "compiled_json.configuration";

/// Diagnostic verbosity. Ordered from most to least chatty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Errors,
    None,
}

impl LogLevel {
    /// Whether messages of `level` should be shown under this setting.
    pub fn is_visible(self, level: LogLevel) -> bool {
        self <= level
    }
}

/// Whether referenced types must carry the marker themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AnnotationUsage {
    /// Unmarked declarations reachable from marked ones are analyzed too.
    #[default]
    Implicit,
    /// Only marked declarations (and known types) are allowed.
    Explicit,
}

/// What to do with attribute types that have no codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UnknownTypes {
    #[default]
    Error,
    Warning,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub log_level: LogLevel,
    pub annotation_usage: AnnotationUsage,
    pub unknown_types: UnknownTypes,
    /// Discover types through Jackson's creator marker.
    pub jackson: bool,
    /// Discover types through JSON-B's creator marker.
    pub jsonb: bool,
    /// Name of the root configuration artifact.
    /// `None` skips it; `Some("")` disables it explicitly.
    pub configuration: Option<String>,
}

impl Settings {
    /// Parse the host option map. Unknown keys are ignored; empty values keep
    /// the default.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        for (key, value) in options {
            match key.as_str() {
                OPT_LOG_LEVEL if !value.is_empty() => {
                    settings.log_level = parse_enum(key, value, "DEBUG, INFO, ERRORS, NONE")?;
                }
                OPT_ANNOTATION if !value.is_empty() => {
                    settings.annotation_usage = parse_enum(key, value, "IMPLICIT, EXPLICIT")?;
                }
                OPT_UNKNOWN if !value.is_empty() => {
                    settings.unknown_types = parse_enum(key, value, "ERROR, WARNING, IGNORE")?;
                }
                OPT_JACKSON if !value.is_empty() => {
                    settings.jackson = parse_bool(key, value)?;
                }
                OPT_JSONB if !value.is_empty() => {
                    settings.jsonb = parse_bool(key, value)?;
                }
                OPT_CONFIGURATION => {
                    settings.configuration = Some(value.clone());
                }
                _ => {}
            }
        }
        Ok(settings)
    }
}

fn parse_enum<T: ValueEnum>(key: &str, value: &str, expected: &'static str) -> Result<T, ConfigError> {
    <T as ValueEnum>::from_str(value, true).map_err(|_| ConfigError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    bool::from_str(&value.to_ascii_lowercase()).map_err(|_| ConfigError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
        expected: "true, false",
    })
}
