//! Resource usage types.
//!
//! This module provides:
//! - [`UsageSnapshot`] - Raw usage counters as reported by the container engine
//! - [`ResourceSample`] - Percentages and byte counts derived from a snapshot
//! - [`ContainerStats`] - A sample tagged with its container and host
//! - [`ContainerIdentifier`] - Container lookup key

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Raw resource usage counters for one container.
///
/// Mirrors the engine's stats document. Every field is optional and a
/// missing or null counter reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Current CPU counters.
    #[serde(default)]
    pub cpu_stats: CpuStats,
    /// CPU counters from the previous read.
    #[serde(default)]
    pub precpu_stats: CpuStats,
    /// Memory counters.
    #[serde(default)]
    pub memory_stats: MemoryStats,
}

/// Cumulative CPU counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStats {
    /// Container CPU time.
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    /// Host CPU time.
    #[serde(default)]
    pub system_cpu_usage: Option<u64>,
    /// Number of CPUs available to the container.
    #[serde(default)]
    pub online_cpus: Option<u64>,
}

/// Container CPU time, total and per CPU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuUsage {
    /// Total CPU time consumed.
    #[serde(default)]
    pub total_usage: Option<u64>,
    /// CPU time per CPU, when the engine reports it.
    #[serde(default)]
    pub percpu_usage: Option<Vec<u64>>,
}

/// Memory counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Bytes in use, including page cache.
    #[serde(default)]
    pub usage: Option<u64>,
    /// Memory limit in bytes.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Engine-specific breakdown (`cache`, `rss`, ...).
    #[serde(default)]
    pub stats: Option<HashMap<String, serde_json::Value>>,
}

impl UsageSnapshot {
    /// Decodes a snapshot from an engine stats document.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Page cache bytes, if the engine reports them.
    #[must_use]
    pub fn cache_bytes(&self) -> Option<u64> {
        self.memory_stats
            .stats
            .as_ref()?
            .get("cache")
            .and_then(serde_json::Value::as_u64)
    }
}

/// Usage derived from a single snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// CPU use relative to one CPU (can exceed 100 on multi-core hosts).
    pub cpu_percent: f64,
    /// Memory use relative to the limit, 0 without a limit.
    pub memory_percent: f64,
    /// Bytes in use, excluding page cache.
    pub memory_used: u64,
    /// Memory limit in bytes.
    pub memory_limit: u64,
}

/// Resource usage of one container on one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    /// Container ID.
    pub id: String,
    /// Host name the container runs on.
    pub host: String,
    /// CPU use in percent.
    pub cpu_percent: f64,
    /// Memory use in percent of the limit.
    pub memory_percent: f64,
    /// Bytes in use.
    pub memory_used: u64,
    /// Memory limit in bytes.
    pub memory_limit: u64,
}

impl ContainerStats {
    /// Tags a sample with its container and host.
    #[must_use]
    pub fn new(id: impl Into<String>, host: impl Into<String>, sample: ResourceSample) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            cpu_percent: sample.cpu_percent,
            memory_percent: sample.memory_percent,
            memory_used: sample.memory_used,
            memory_limit: sample.memory_limit,
        }
    }
}

/// Identifies a container on a named host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerIdentifier {
    /// Container ID.
    pub id: String,
    /// Host name.
    pub host: String,
}

impl ContainerIdentifier {
    /// Creates an identifier.
    #[must_use]
    pub fn new(host: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
        }
    }

    /// The first 12 characters of the ID, for log output.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id
            .char_indices()
            .nth(12)
            .map_or(self.id.as_str(), |(end, _)| &self.id[..end])
    }
}
