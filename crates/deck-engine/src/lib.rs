//! # deck-engine
//!
//! Read-only access to container engines for LogDeck.
//!
//! Every call takes a [`CallContext`] carrying a cancellation token and an
//! optional deadline. Engines implement [`ContainerEngine`]:
//!
//! - [`InMemoryEngine`] - Seeded containers, for tests and demo mode
//! - `DockerEngine` - A Docker daemon via bollard (feature `docker`, on by default)
//!
//! Hosts are configured as `name=url` entries, see [`HostConfig::parse_list`].
//!
//! ## Example
//!
//! ```rust
//! use deck_engine::{CallContext, ContainerEngine, ContainerInfo, InMemoryEngine};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! rt.block_on(async {
//!     let engine = InMemoryEngine::new().with_container(ContainerInfo {
//!         id: "abc123".to_string(),
//!         state: "running".to_string(),
//!         ..Default::default()
//!     });
//!     let running = engine.list_containers(&CallContext::new(), false).await.unwrap();
//!     assert_eq!(running.len(), 1);
//! });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
#[cfg(feature = "docker")]
pub mod docker;
pub mod engine;
pub mod error;
pub mod memory;
pub mod time_range;
pub mod types;

// Re-export main types
pub use context::CallContext;
#[cfg(feature = "docker")]
pub use docker::DockerEngine;
pub use engine::{ContainerEngine, LogChunkStream};
pub use error::{EngineError, EngineResult};
pub use memory::InMemoryEngine;
pub use time_range::{parse_duration, resolve_bound};
pub use types::{
    ContainerDetails, ContainerInfo, Endpoint, HostConfig, LOCAL_HOST_NAME, ensure_unique,
};
