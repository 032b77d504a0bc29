//! Fan-out error types.

use deck_engine::EngineError;
use thiserror::Error;

/// Errors returned by the fleet coordinator.
#[derive(Debug, Error)]
pub enum FleetError {
    /// No engine is registered under this host name.
    #[error("host {name} not found")]
    UnknownHost {
        /// Requested host name.
        name: String,
    },

    /// A host name was registered twice.
    #[error("host {name} is already registered")]
    DuplicateHost {
        /// Host name.
        name: String,
    },

    /// The engine call failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A fan-out task panicked or was aborted.
    #[error("fan-out task failed: {0}")]
    TaskFailed(String),
}

impl FleetError {
    /// Returns true when the host or the container does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::UnknownHost { .. } => true,
            Self::Engine(err) => err.is_not_found(),
            _ => false,
        }
    }
}

/// Result type for fleet operations.
pub type FleetResult<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FleetError::UnknownHost {
            name: "edge".to_string(),
        };
        assert_eq!(err.to_string(), "host edge not found");

        let err = FleetError::from(EngineError::NotFound {
            id: "abc".to_string(),
        });
        assert_eq!(err.to_string(), "container not found: abc");
    }

    #[test]
    fn not_found_covers_hosts_and_containers() {
        assert!(FleetError::UnknownHost { name: String::new() }.is_not_found());
        assert!(FleetError::from(EngineError::NotFound { id: String::new() }).is_not_found());
        assert!(!FleetError::from(EngineError::Cancelled).is_not_found());
        assert!(!FleetError::TaskFailed("panic".to_string()).is_not_found());
    }
}
