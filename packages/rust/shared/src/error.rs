//! Error types for recipefeed.
//!
//! Library crates use [`RecipeFeedError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all recipefeed operations.
#[derive(Debug, thiserror::Error)]
pub enum RecipeFeedError {
    /// Configuration loading or validation error. Fatal before any network activity.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a publisher or image host.
    #[error("network error: {0}")]
    Network(String),

    /// HTML, JSON-LD or persisted document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Translation backend error (request failed or returned nothing usable).
    #[error("translation error: {0}")]
    Translation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RecipeFeedError>;

impl RecipeFeedError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RecipeFeedError::config("unknown site 'foo'");
        assert_eq!(err.to_string(), "config error: unknown site 'foo'");

        let err = RecipeFeedError::Translation("empty response".into());
        assert!(err.to_string().contains("empty response"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = RecipeFeedError::io(
            "/tmp/manifest.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("manifest.json"));
    }
}
