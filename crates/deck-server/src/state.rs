//! Shared state for the HTTP server.

use std::sync::Arc;
use std::time::Instant;

use deck_engine::CallContext;
use deck_fleet::Fleet;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// State shared by every request handler.
#[derive(Debug)]
pub struct AppState {
    config: Arc<ServerConfig>,
    fleet: Fleet,
    shutdown: CancellationToken,
    start_time: Instant,
}

impl AppState {
    /// Creates the state for a server.
    #[must_use]
    pub fn new(config: ServerConfig, fleet: Fleet) -> Self {
        Self {
            config: Arc::new(config),
            fleet,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The fan-out coordinator.
    #[must_use]
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Token cancelled when the server shuts down.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Context for a bounded request, ending at the request deadline or shutdown.
    #[must_use]
    pub fn request_context(&self) -> CallContext {
        CallContext::with_token(self.shutdown.child_token())
            .with_timeout(self.config.request_timeout)
    }

    /// Context for a live stream, ending only at shutdown.
    #[must_use]
    pub fn stream_context(&self) -> CallContext {
        CallContext::with_token(self.shutdown.child_token())
    }

    /// Seconds since the server started.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
