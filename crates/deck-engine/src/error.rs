//! Engine error types.

use thiserror::Error;

/// Errors returned by container engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Could not reach the engine.
    #[error("failed to connect to container engine: {0}")]
    ConnectionFailed(String),

    /// A host entry could not be parsed.
    #[error("invalid host entry {entry:?}: {reason}")]
    InvalidHostConfig {
        /// The offending entry.
        entry: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The host endpoint uses a scheme no engine here can talk to.
    #[error("unsupported engine endpoint {endpoint}: {reason}")]
    UnsupportedHost {
        /// Endpoint URL.
        endpoint: String,
        /// Why it is unsupported.
        reason: String,
    },

    /// Container not found.
    #[error("container not found: {id}")]
    NotFound {
        /// Container ID.
        id: String,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed before the operation finished.
    #[error("operation timed out")]
    DeadlineExceeded,

    /// The engine returned something that could not be decoded.
    #[error("invalid engine response: {0}")]
    Decode(String),

    /// Any other engine failure.
    #[error("engine error: {0}")]
    Api(String),
}

impl EngineError {
    /// Returns true for [`EngineError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the caller's context ended the operation.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
