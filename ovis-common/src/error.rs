//! Common error types for ovis

use thiserror::Error;

/// Common result type for ovis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ovis crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timestamp text that no supported format accepts
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
}
