//! Percentages from raw usage counters.
//!
//! Both computations are total: missing counters read as zero and any
//! division that cannot be made yields `0.0`.

use crate::types::{ResourceSample, UsageSnapshot};

/// Derives CPU and memory usage from one snapshot.
#[must_use]
pub fn sample(snapshot: &UsageSnapshot) -> ResourceSample {
    let (memory_used, memory_limit, memory_percent) = memory_usage(snapshot);
    ResourceSample {
        cpu_percent: cpu_percent(snapshot),
        memory_percent,
        memory_used,
        memory_limit,
    }
}

/// CPU use since the previous read, scaled by the number of CPUs.
///
/// Returns `0.0` when either the container or the host counter did not
/// advance.
#[must_use]
pub fn cpu_percent(snapshot: &UsageSnapshot) -> f64 {
    let current = &snapshot.cpu_stats;
    let previous = &snapshot.precpu_stats;

    let cpu_delta = counter(current.cpu_usage.total_usage) - counter(previous.cpu_usage.total_usage);
    let system_delta = counter(current.system_cpu_usage) - counter(previous.system_cpu_usage);
    if system_delta <= 0.0 || cpu_delta <= 0.0 {
        return 0.0;
    }

    (cpu_delta / system_delta) * online_cpus(snapshot) as f64 * 100.0
}

/// Memory in use excluding page cache, the limit, and the percentage.
///
/// The percentage is 0 without a limit and never exceeds 100.
#[must_use]
pub fn memory_usage(snapshot: &UsageSnapshot) -> (u64, u64, f64) {
    let usage = snapshot.memory_stats.usage.unwrap_or(0);
    let used = match snapshot.cache_bytes() {
        Some(cache) if usage > cache => usage - cache,
        _ => usage,
    };
    let limit = snapshot.memory_stats.limit.unwrap_or(0);
    let percent = if limit > 0 {
        (used as f64 / limit as f64 * 100.0).min(100.0)
    } else {
        0.0
    };
    (used, limit, percent)
}

/// Reported CPU count, else the per-CPU counter count, else one.
fn online_cpus(snapshot: &UsageSnapshot) -> u64 {
    let stats = &snapshot.cpu_stats;
    stats
        .online_cpus
        .filter(|&n| n > 0)
        .or_else(|| {
            let per_cpu = stats.cpu_usage.percpu_usage.as_ref().map_or(0, Vec::len);
            (per_cpu > 0).then_some(per_cpu as u64)
        })
        .unwrap_or(1)
}

fn counter(value: Option<u64>) -> f64 {
    value.unwrap_or(0) as f64
}
