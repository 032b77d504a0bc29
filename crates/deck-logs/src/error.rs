//! Error types for log processing.

use thiserror::Error;

/// Errors that can occur while processing container logs.
#[derive(Debug, Error)]
pub enum LogError {
    /// A log option could not be accepted.
    #[error("invalid log option {name}: {reason}")]
    InvalidOption {
        /// Query parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The log source failed before any output was forwarded.
    #[error("log source failed: {0}")]
    Source(#[from] std::io::Error),

    /// The consumer of a live stream went away.
    #[error("log stream closed")]
    StreamClosed,
}

impl LogError {
    /// Creates an invalid option error.
    #[must_use]
    pub fn invalid_option(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type alias for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
