//! Error types for the Tidewatch library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Tidewatch operations.
#[derive(Debug, Error)]
pub enum TidewatchError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input that cannot be read as a table of records.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Empty table or no data to analyze.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// The schema does not describe the table it was applied to.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Error saving or loading a stored result.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Tidewatch operations.
pub type Result<T> = std::result::Result<T, TidewatchError>;
