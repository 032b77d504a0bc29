//! Container resource sampling for LogDeck.
//!
//! `deck-metrics` turns raw engine usage counters into the CPU and memory
//! figures shown on the dashboard, and keeps recently computed figures in a
//! short-lived cache so that a burst of requests does not hit every engine.
//!
//! # Example
//!
//! ```rust
//! use deck_metrics::{CacheKey, ContainerStats, StatsCache, UsageSnapshot, sample};
//!
//! let cache = StatsCache::default();
//! let stats = ContainerStats::new("abc123", "local", sample(&UsageSnapshot::default()));
//!
//! let key = CacheKey::new("local", "abc123");
//! cache.put(key.clone(), stats.clone());
//! assert_eq!(cache.get(&key), Some(stats));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod sampler;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheKey, Clock, ManualClock, StatsCache, SystemClock};
pub use error::{MetricsError, Result};
pub use sampler::{cpu_percent, memory_usage, sample};
pub use types::{
    ContainerIdentifier, ContainerStats, CpuStats, CpuUsage, MemoryStats, ResourceSample,
    UsageSnapshot,
};
