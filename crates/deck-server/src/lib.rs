//! # deck-server
//!
//! HTTP API of the LogDeck container dashboard.
//!
//! The server fans requests out over a [`Fleet`](deck_fleet::Fleet) of
//! container engines and serves classified logs, resource usage and
//! container details as JSON.
//!
//! ## Example
//!
//! ```rust,no_run
//! use deck_fleet::Fleet;
//! use deck_metrics::StatsCache;
//! use deck_server::{LogDeckServer, ServerConfig, demo};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default().with_hosts(demo::demo_hosts());
//!     let fleet = Fleet::new(demo::demo_pool()?, StatsCache::default());
//!
//!     let server = LogDeckServer::new(config, fleet);
//!     server.serve("127.0.0.1:8080".parse()?).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/v1/health` | GET | Liveness and uptime |
//! | `/api/v1/containers` | GET | Containers of every host, with per-host errors |
//! | `/api/v1/containers/stats` | GET | Usage of every running container |
//! | `/api/v1/containers/stats` | POST | Usage of the listed containers |
//! | `/api/v1/containers/{id}?host=` | GET | Container details |
//! | `/api/v1/containers/{id}/stats?host=` | GET | Usage of one container |
//! | `/api/v1/containers/{id}/logs/parsed?host=` | GET | Classified logs, snapshot or NDJSON follow |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod demo;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use routes::create_router;
pub use server::LogDeckServer;
pub use state::AppState;
