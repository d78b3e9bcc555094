//! Error types for booksearch.
//!
//! Library crates use [`BookSearchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all booksearch operations.
#[derive(Debug, thiserror::Error)]
pub enum BookSearchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON encoding/decoding of the search artifact failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Network/HTTP error while fetching the search artifact.
    #[error("network error: {0}")]
    Network(String),

    /// A shorthand transform stage failed or broke its postcondition.
    #[error("transform stage `{stage}` failed: {message}")]
    Transform { stage: &'static str, message: String },

    /// Data validation error (bad artifact, invalid option value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BookSearchError>;

impl BookSearchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a transform error attributed to a named stage.
    pub fn transform(stage: &'static str, msg: impl Into<String>) -> Self {
        Self::Transform {
            stage,
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for BookSearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
