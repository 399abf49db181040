//! Error types for aipim
//!
//! Errors raised by the bookkeeping layer itself. Failures of a wrapped study
//! function never pass through this type; they reach the caller unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// aipim error types
#[derive(Error, Debug)]
pub enum Error {
    /// Base directory or study configuration is not usable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Base directory does not exist on disk
    #[error("Path {} does not exist.", .0.display())]
    NotFound(PathBuf),

    /// Study log could not be opened or installed
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
