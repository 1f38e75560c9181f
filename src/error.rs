//! Error types for the flowmetrics library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value '{value}' at row {row}, column '{column}'")]
    InvalidValue {
        value: String,
        row: usize,
        column: String,
    },

    #[error("Column length mismatch: expected {expected} rows, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Duplicate channel '{0}'")]
    DuplicateChannel(String),

    #[error("Channel '{0}' not found in table")]
    MissingChannel(String),

    #[error("Table has no sample identifiers: {0}")]
    MissingSampleIds(String),

    #[error("No baseline set: {0}")]
    NoBaseline(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported unit conversion: {from} -> {to}")]
    UnsupportedConversion { from: String, to: String },

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, FlowError>;
