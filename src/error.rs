//! Error types for Synheart Journal

use thiserror::Error;

/// Reasons a logged entry is rejected by the normalizer.
///
/// A rejected entry is never stored; the caller decides how to surface it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} out of range: {value} (expected {min}-{max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} is required together with {paired_with}")]
    MissingPairedField {
        field: &'static str,
        paired_with: &'static str,
    },

    #[error("{0} entry carries no data")]
    EmptyEntry(&'static str),

    #[error("Unknown {field} value: {value}")]
    UnknownValue { field: &'static str, value: String },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Inconsistent entry: {0}")]
    Inconsistent(String),
}

/// Errors that can occur while operating the journal
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),
}
