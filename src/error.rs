//! Error types for the schema context compiler.
//!
//! Errors are split by the phase in which they surface: configuration errors
//! at startup, bucket errors at registration time and validation errors per
//! request.

use serde::Serialize;
use std::fmt;

/// Boxed error produced by collaborators such as external rules.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Umbrella error for hosts that want a single error type.
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    /// Invalid compiler configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Schema registration failure
    #[error("Bucket error: {0}")]
    Bucket(#[from] BucketError),

    /// Payload failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors raised while configuring the compiler factory.
///
/// These always surface from `CompilerFactory::configure` and never at
/// validation time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A preference key the engine does not recognise
    #[error("\"{key}\" is not allowed")]
    UnknownPreference { key: String },

    /// Preferences must be a JSON object
    #[error("\"preferences\" must be of type object")]
    PreferencesNotObject,

    /// A recognised preference with a value of the wrong shape
    #[error("Invalid preference value: {source}")]
    InvalidPreference {
        #[source]
        source: serde_json::Error,
    },

    /// Two extensions declare the same type name
    #[error("Extension type \"{type_name}\" is already defined")]
    DuplicateExtension { type_name: String },

    /// Options document could not be parsed
    #[error("Invalid compiler options: {source}")]
    InvalidOptions {
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by schema context bucket registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BucketError {
    /// Fragment id already present in the bucket
    #[error("Schema with id \"{id}\" already declared")]
    DuplicateSchema { id: String },

    /// Fragment ids must be non-empty
    #[error("Schema id cannot be empty")]
    EmptyId,
}

/// A single step in the path to a validated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Rule categories reported in validation details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "any.required")]
    Required,
    #[serde(rename = "any.unknown")]
    Forbidden,
    #[serde(rename = "any.only")]
    Only,
    #[serde(rename = "any.external")]
    External,
    #[serde(rename = "any.custom")]
    Custom,
    #[serde(rename = "object.unknown")]
    UnknownKey,
    #[serde(rename = "object.base")]
    ObjectBase,
    #[serde(rename = "array.base")]
    ArrayBase,
    #[serde(rename = "boolean.base")]
    BooleanBase,
    #[serde(rename = "number.base")]
    NumberBase,
    #[serde(rename = "number.integer")]
    NumberInteger,
    #[serde(rename = "number.min")]
    NumberMin,
    #[serde(rename = "number.max")]
    NumberMax,
    #[serde(rename = "string.base")]
    StringBase,
    #[serde(rename = "string.empty")]
    StringEmpty,
    #[serde(rename = "string.min")]
    StringMin,
    #[serde(rename = "string.max")]
    StringMax,
    #[serde(rename = "date.base")]
    DateBase,
    #[serde(rename = "binary.base")]
    BinaryBase,
}

impl ErrorKind {
    /// Dotted rule code, e.g. `any.required`.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Required => "any.required",
            ErrorKind::Forbidden => "any.unknown",
            ErrorKind::Only => "any.only",
            ErrorKind::External => "any.external",
            ErrorKind::Custom => "any.custom",
            ErrorKind::UnknownKey => "object.unknown",
            ErrorKind::ObjectBase => "object.base",
            ErrorKind::ArrayBase => "array.base",
            ErrorKind::BooleanBase => "boolean.base",
            ErrorKind::NumberBase => "number.base",
            ErrorKind::NumberInteger => "number.integer",
            ErrorKind::NumberMin => "number.min",
            ErrorKind::NumberMax => "number.max",
            ErrorKind::StringBase => "string.base",
            ErrorKind::StringEmpty => "string.empty",
            ErrorKind::StringMin => "string.min",
            ErrorKind::StringMax => "string.max",
            ErrorKind::DateBase => "date.base",
            ErrorKind::BinaryBase => "binary.base",
        }
    }
}

/// One rule violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    /// Human-readable message, e.g. `"c" must be [ref:global:x]`
    pub message: String,
    /// Path to the offending value
    pub path: Vec<PathSegment>,
    /// Rule category
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

impl ErrorDetail {
    pub fn new(kind: ErrorKind, path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path,
            kind,
        }
    }
}

/// Structured validation failure.
///
/// The message joins every detail message; the individual details keep the
/// path and rule kind so the host can build its own client response.
/// Failures of external rules carry the original error as their source.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    details: Vec<ErrorDetail>,
    #[source]
    cause: Option<BoxError>,
}

impl ValidationError {
    /// Build an error from collected details.
    pub fn from_details(details: Vec<ErrorDetail>) -> Self {
        let message = details
            .iter()
            .map(|detail| detail.message.as_str())
            .collect::<Vec<_>>()
            .join(". ");
        Self {
            message,
            details,
            cause: None,
        }
    }

    /// Wrap the failure of an external rule.
    pub fn external(path: Vec<PathSegment>, label: &str, cause: BoxError) -> Self {
        let message = format!("{} ({})", cause, label);
        Self {
            message: message.clone(),
            details: vec![ErrorDetail::new(ErrorKind::External, path, message)],
            cause: Some(cause),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    /// The error raised by an external rule, if this failure wraps one.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// True when any detail carries the given rule kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.details.iter().any(|detail| detail.kind == kind)
    }
}

// Result type aliases for convenience
pub type ConfigResult<T> = Result<T, ConfigurationError>;
pub type BucketResult<T> = Result<T, BucketError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
