//! Error types for media-relay
//!
//! [`Error`] covers faults surfaced to the embedding code: bad configuration,
//! workspace I/O, delivery adapter failures. The requester-facing failure
//! taxonomy is [`ErrorKind`](crate::types::ErrorKind), which the pipeline
//! returns as a value rather than an error.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.fetch_timeout_secs")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Workspace could not be created or inspected
    #[error("workspace error at {path}: {source}")]
    Workspace {
        /// Workspace path involved
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The delivery adapter failed to hand the result to the requester
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_keeps_key() {
        let err = Error::config("fetch.audio_codec", "must not be empty");
        match &err {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("fetch.audio_codec"));
                assert_eq!(message, "must not be empty");
            }
            other => panic!("expected Config error, got {other:?}"),
        }
        assert_eq!(err.to_string(), "configuration error: must not be empty");
    }

    #[test]
    fn workspace_error_exposes_source() {
        use std::error::Error as _;

        let err = Error::Workspace {
            path: PathBuf::from("/tmp/ws"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/ws"));
        assert!(err.source().is_some());
    }
}
