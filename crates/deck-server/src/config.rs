//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use deck_engine::{HostConfig, ensure_unique};

use crate::error::{ServerError, ServerResult};

/// Default deadline for list, stats and snapshot requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout of individual engine requests.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the LogDeck server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Engine hosts, in display order.
    pub hosts: Vec<HostConfig>,
    /// Deadline applied to bounded requests.
    pub request_timeout: Duration,
    /// Timeout of individual engine requests.
    pub engine_timeout: Duration,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            hosts: vec![HostConfig::local()],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Replaces the host list.
    #[must_use]
    pub fn with_hosts(mut self, hosts: Vec<HostConfig>) -> Self {
        self.hosts = hosts;
        self
    }

    /// Sets the request deadline.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the engine request timeout.
    #[must_use]
    pub const fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }

    /// Adds a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }

    /// Checks the configuration before the server starts.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for an empty or duplicated host list
    /// or a zero timeout.
    pub fn validate(&self) -> ServerResult<()> {
        if self.hosts.is_empty() {
            return Err(ServerError::Config("at least one host is required".to_string()));
        }
        ensure_unique(&self.hosts).map_err(|e| ServerError::Config(e.to_string()))?;
        if self.request_timeout.is_zero() || self.engine_timeout.is_zero() {
            return Err(ServerError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }
}
