//! LogDeck server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use deck_fleet::Fleet;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP server for the dashboard API.
#[derive(Debug, Clone)]
pub struct LogDeckServer {
    state: Arc<AppState>,
}

impl LogDeckServer {
    /// Create a server over the given fleet.
    #[must_use]
    pub fn new(config: ServerConfig, fleet: Fleet) -> Self {
        Self {
            state: Arc::new(AppState::new(config, fleet)),
        }
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Start the server and listen for connections.
    ///
    /// Runs until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self, addr: SocketAddr) -> ServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Start the server with graceful shutdown support.
    ///
    /// When `shutdown` completes the server stops accepting connections and
    /// every live log stream is ended, so that in-flight responses can
    /// finish.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;

        let local = listener.local_addr().unwrap_or(addr);
        info!(addr = %local, hosts = self.state.fleet().hosts().len(), "LogDeck server listening");

        let token = self.state.shutdown_token().clone();
        let signal = async move {
            shutdown.await;
            info!("Shutdown requested, closing live streams");
            token.cancel();
        };

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        self.state.shutdown_token().cancel();
        info!("LogDeck server shut down");
        result
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}
