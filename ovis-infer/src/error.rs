//! Error types for ovis-infer
//!
//! Structural and configuration errors abort the whole call. Timestamp
//! failures are per-row: the sink writer logs them and drops the row.

use thiserror::Error;

/// Convenience Result type using ovis-infer Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the inference pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// A required input column could not be resolved
    #[error("Required column '{requested}' not found. Available: {available:?}")]
    MissingColumn {
        requested: String,
        available: Vec<String>,
    },

    /// Invalid window/chunk/vocabulary settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Flattened input does not match the expected positional layout
    #[error("Shape error: {0}")]
    Shape(String),

    /// Classifier failed or returned an unusable probability matrix
    #[error("Inference error: {0}")]
    Inference(String),

    /// A row's timestamp could not be parsed
    #[error("Row {row}: unparseable timestamp '{value}'")]
    TimestampParse { row: usize, value: String },

    /// A non-null axis cell that is not a number
    #[error("Column '{column}', row {row}: non-numeric value '{value}'")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    /// Time-series sink rejected the write or could not be reached
    #[error("Sink write failed: {0}")]
    Sink(String),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ovis-common error
    #[error(transparent)]
    Common(#[from] ovis_common::Error),
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a shape error
    pub fn shape<S: Into<String>>(msg: S) -> Self {
        Error::Shape(msg.into())
    }

    /// Create an inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Error::Inference(msg.into())
    }

    /// Create a sink error
    pub fn sink<S: Into<String>>(msg: S) -> Self {
        Error::Sink(msg.into())
    }
}
