//! Error types for the deck-metrics crate.

use thiserror::Error;

/// Errors that can occur in the metrics layer.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A usage document could not be decoded.
    #[error("invalid usage snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    /// Cache settings are inconsistent.
    #[error("invalid cache config: {reason}")]
    InvalidConfig {
        /// Why the config was rejected.
        reason: String,
    },
}

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
