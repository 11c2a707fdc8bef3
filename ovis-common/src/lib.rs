//! # Ovis Common Library
//!
//! Shared code for the ovis sheep behaviour workspace:
//! - Error and result types
//! - Bootstrap configuration (TOML + environment)
//! - Logging initialization
//! - Timestamp parsing and UTC normalization

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
pub use time::TimestampParser;
