//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An integer variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    IntParseError {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A floating-point variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    FloatParseError {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// Rate limit must allow at least one call per second.
    #[error("invalid rate limit '{value}': must be greater than 0")]
    InvalidRateLimit { value: u32 },

    /// Model timeout must be positive.
    #[error("invalid model timeout: must be greater than 0 seconds")]
    InvalidTimeout,

    /// Inner concurrency, when set, must be positive.
    #[error("invalid inner concurrency '{value}': must be greater than 0")]
    InvalidConcurrency { value: usize },

    /// Confidence threshold outside `[0, 1]`.
    #[error("invalid minimum confidence '{value}': must be between 0 and 1")]
    InvalidMinConfidence { value: f64 },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },
}
