//! Error types for the Tipitaka builder.
//!
//! Library crates use [`TipitakaError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all builder operations.
#[derive(Debug, thiserror::Error)]
pub enum TipitakaError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Record store (libSQL) error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The transliteration engine failed or could not be reached.
    #[error("transliteration error: {0}")]
    Transliteration(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing a content unit into the output tree failed.
    #[error("failed to materialize {path:?} (directory exists: {dir_exists}): {source}")]
    Materialize {
        path: PathBuf,
        dir_exists: bool,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TipitakaError>;

impl TipitakaError {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a failed output-tree write, recording whether `dir` existed at the time.
    pub fn materialize(
        path: impl Into<PathBuf>,
        dir: &std::path::Path,
        source: std::io::Error,
    ) -> Self {
        Self::Materialize {
            path: path.into(),
            dir_exists: dir.exists(),
            source,
        }
    }
}
