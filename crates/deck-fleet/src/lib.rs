//! # deck-fleet
//!
//! Multi-host fan-out for LogDeck.
//!
//! A [`HostPool`] holds one engine per configured host. [`Fleet`] queries
//! them concurrently and samples container usage through a shared
//! [`StatsCache`](deck_metrics::StatsCache):
//!
//! - [`Fleet::list_containers`] - Every container on every host, with per-host errors
//! - [`Fleet::container_stats`] - One container, cache-through
//! - [`Fleet::bulk_stats`] - Many containers, failures dropped
//! - [`Fleet::all_running_stats`] - Every running container on every reachable host

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fleet;
pub mod pool;

pub use error::{FleetError, FleetResult};
pub use fleet::{ContainerListing, Fleet, HostError};
pub use pool::HostPool;
