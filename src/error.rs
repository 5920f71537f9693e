// Schema and configuration errors never escape a round as `Err`; they are
// reported as diagnostics. `ReadError` belongs to the reference registry.

use thiserror::Error;

/// Something wrong with the declared types themselves. Always fatal to the round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate JSON name '{name}' on {ty} (attributes '{first}' and '{second}')")]
    DuplicateName { ty: String, name: String, first: String, second: String },

    #[error("duplicate index {index} on {ty} (attributes '{first}' and '{second}')")]
    DuplicateIndex { ty: String, index: u32, first: String, second: String },

    #[error("constructor parameter '{param}' of {ty} does not match any attribute by name or position")]
    UnmatchedParameter { ty: String, param: String },

    #[error("{ty} has {count} constructors marked as creators; exactly one is allowed")]
    AmbiguousCreator { ty: String, count: usize },

    #[error("{ty} has no default constructor and {count} public constructors; mark the one to use as a creator")]
    NoUsableConstructor { ty: String, count: usize },

    #[error("unable to resolve JSON codec for type '{value_type}' used by {ty}.{attribute}")]
    UnknownType { ty: String, attribute: String, value_type: String },

    #[error("{ty}.{attribute} holds family {family} by value; use Box<dyn {family}>")]
    UnboxedFamily { ty: String, attribute: String, family: String },

    #[error("default {value} of {ty}.{attribute} is not {expected}")]
    InvalidDefault { ty: String, attribute: String, value: String, expected: &'static str },

    #[error("deserialize_as target '{member}' is not a member of family {family}")]
    MissingDefaultMember { family: String, member: String },

    #[error("converter {converter} does not expose '{item}'")]
    InvalidConverter { converter: String, item: String },

    #[error("converter {converter} has no target type")]
    MissingConverterTarget { converter: String },

    #[error("{ty} declares unknown format '{value}' (expected 'object' or 'array')")]
    InvalidFormat { ty: String, value: String },

    #[error("{ty}.{attribute}: {source}")]
    InvalidValueType {
        ty: String,
        attribute: String,
        #[source]
        source: TypeSyntaxError,
    },
}

/// Problems with the option map or with the root configuration artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for option '{key}' (expected one of: {expected})")]
    InvalidOption { key: String, value: String, expected: &'static str },

    #[error(
        "configuration '{root}' is not in the root namespace, but referenced codec '{referenced}' has no namespace; \
         use a configuration name without a namespace, e.g. 'JsonConfiguration'"
    )]
    RootNamespace { root: String, referenced: String },

    #[error("configuration name '{name}' is not a valid path")]
    InvalidConfigurationName { name: String },
}

/// Failures while committing artifacts to the sink.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed writing artifact '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact '{name}' was already created in this round")]
    DuplicateArtifact { name: String },
}

/// Malformed value type text, e.g. `Vec<i32`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type '{text}' at offset {offset}: {reason}")]
pub struct TypeSyntaxError {
    pub text: String,
    pub offset: usize,
    pub reason: &'static str,
}

/// Deserialization failures raised by the reference registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    #[error("mandatory property '{attribute}' of {ty} not found")]
    MissingRequired { ty: String, attribute: String },

    #[error("property '{attribute}' of {ty} is not allowed to be null")]
    NullNotAllowed { ty: String, attribute: String },

    #[error("expecting {expected} for {ty}, found {found}")]
    UnexpectedShape { ty: String, expected: &'static str, found: String },

    #[error("invalid {kind} value: {found}")]
    InvalidValue { kind: &'static str, found: String },

    #[error("{ty} expects at most {max} elements, found {found}")]
    TooManyElements { ty: String, max: usize, found: usize },

    #[error("unknown enum constant '{found}' for {ty}")]
    UnknownVariant { ty: String, found: String },

    #[error("unable to read {family}: discriminator '{found}' is not known and no default member is configured")]
    UnknownDiscriminator { family: String, found: String },

    #[error("unable to read {family}: discriminator is missing and no default member is configured")]
    MissingDiscriminator { family: String },

    #[error("no codec registered for {ty}")]
    UnknownCodec { ty: String },

    #[error("{ty} is built through a constructor and cannot be bound into an existing instance")]
    NotBindable { ty: String },

    #[error("value of type {found} cannot be written as {ty}")]
    WrongInstance { ty: String, found: String },

    #[error("external converter '{symbol}' is not bound in this registry")]
    UnboundSymbol { symbol: String },
}
