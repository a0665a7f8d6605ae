//! Domain error types
//!
//! This module defines the error hierarchy for FhirBridge. Each pipeline stage
//! has its own error type and all of them fold into [`BridgeError`].
//! None of these types expose third-party HTTP or CSV types.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Main FhirBridge error type
///
/// This is the primary error type used throughout the application.
/// It wraps the stage-specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed tabular input
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// One or more row-level rule violations
    #[error("Validation failed with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    /// Resource graph does not have the expected shape
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Remote resource store call failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation was cancelled by a shutdown signal
    #[error("Operation cancelled")]
    Cancelled,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Tabular input could not be parsed
///
/// Parsing is all-or-nothing, so a single bad row fails the whole input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line number in the source, 0 when unknown
    pub line: u64,

    /// Human-readable description
    pub message: String,
}

impl ParseError {
    /// Creates a new parse error
    pub fn new(line: u64, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A single rule violation found by the row validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Zero-based position of the row in the batch
    pub row_index: usize,

    /// Field name as it appears in the tabular header
    pub field: String,

    /// Human-readable description
    pub message: String,
}

impl Violation {
    /// Creates a new violation
    pub fn new(row_index: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row_index,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}: {}", self.row_index, self.field, self.message)
    }
}

/// Resource graph to flat record conversion errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    /// A required element is absent from the source
    #[error("missing element '{element}' in {resource}")]
    MissingElement {
        resource: &'static str,
        element: &'static str,
    },

    /// A choice element carries a variant this conversion does not accept
    #[error("{element} of {resource} is {found}, expected {expected}")]
    UnexpectedVariant {
        resource: &'static str,
        element: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// An element is present but its value cannot be used
    #[error("invalid value for '{element}': {message}")]
    InvalidValue {
        element: &'static str,
        message: String,
    },
}

/// Kind of remote store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    /// No connection could be opened; the request never reached the store
    Connection,
    /// Connection dropped after the request was sent
    Interrupted,
    /// Request exceeded the configured timeout
    Timeout,
    /// Non-success HTTP status
    Status(u16),
    /// Response body did not match the expected shape
    InvalidResponse,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErrorKind::Connection => write!(f, "connection failed"),
            StoreErrorKind::Interrupted => write!(f, "connection interrupted"),
            StoreErrorKind::Timeout => write!(f, "timed out"),
            StoreErrorKind::Status(code) => write!(f, "status {code}"),
            StoreErrorKind::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Remote store call failure
///
/// Carries the failing operation and the identifier it was called with so the
/// caller can report it verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation}({identifier}) {kind}: {message}")]
pub struct StoreError {
    /// Store operation name, e.g. `find_patient_by_identifier`
    pub operation: &'static str,

    /// Business identifier or resource id passed to the operation
    pub identifier: String,

    /// Failure kind
    pub kind: StoreErrorKind,

    /// Diagnostics from the store or transport
    pub message: String,
}

impl StoreError {
    /// Creates a new store error
    pub fn new(
        operation: &'static str,
        identifier: impl Into<String>,
        kind: StoreErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            identifier: identifier.into(),
            kind,
            message: message.into(),
        }
    }

    /// Whether a transport-level retry could succeed
    pub fn is_transient(&self) -> bool {
        match self.kind {
            StoreErrorKind::Connection | StoreErrorKind::Interrupted | StoreErrorKind::Timeout => {
                true
            }
            StoreErrorKind::Status(code) => code == 429 || code >= 500,
            StoreErrorKind::InvalidResponse => false,
        }
    }

    /// Whether resending a non-idempotent request cannot apply it twice
    ///
    /// True only when the store certainly did not act on the request: the
    /// connection was never opened, or the store throttled it with 429.
    pub fn is_safe_to_resend(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::Connection | StoreErrorKind::Status(429)
        )
    }
}

// Conversions from standard library errors
impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        BridgeError::Configuration(format!("TOML parse error: {err}"))
    }
}
