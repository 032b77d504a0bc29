//! Short-lived cache of container stats.
//!
//! Entries are served while younger than the TTL. Stale entries are left in
//! place on read and only removed by a prune pass, which runs after a write
//! once the cache has grown past a threshold and drops everything older
//! than the (longer) retention window.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::types::ContainerStats;

/// Default freshness window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

/// Default age past which entries are pruned.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(10);

/// Default entry count above which a write triggers pruning.
pub const DEFAULT_PRUNE_THRESHOLD: usize = 100;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

/// Cache key, `host:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for a container on a host.
    #[must_use]
    pub fn new(host: &str, id: &str) -> Self {
        Self(format!("{host}:{id}"))
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Timing and size settings for a [`StatsCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry is served.
    pub ttl: Duration,
    /// How long an entry may linger before pruning removes it.
    pub retention: Duration,
    /// Entry count above which writes trigger pruning.
    pub prune_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            retention: DEFAULT_RETENTION,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
        }
    }
}

impl CacheConfig {
    /// Sets the freshness window.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the retention window.
    #[must_use]
    pub const fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the prune threshold.
    #[must_use]
    pub const fn with_prune_threshold(mut self, threshold: usize) -> Self {
        self.prune_threshold = threshold;
        self
    }

    /// Checks that the windows make sense together.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(MetricsError::InvalidConfig {
                reason: "ttl must be positive".to_string(),
            });
        }
        if self.retention < self.ttl {
            return Err(MetricsError::InvalidConfig {
                reason: format!(
                    "retention ({:?}) must not be shorter than ttl ({:?})",
                    self.retention, self.ttl
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stats: ContainerStats,
    captured_at: Instant,
}

/// Thread-safe TTL cache of [`ContainerStats`].
///
/// One reader/writer lock guards all keys. Each `get` or `put` is a single
/// step under that lock.
#[derive(Debug)]
pub struct StatsCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl StatsCache {
    /// Creates a cache on the system clock.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache on the given clock.
    #[must_use]
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cache settings.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the entry for `key` if it is still fresh.
    pub fn get(&self, key: &CacheKey) -> Option<ContainerStats> {
        let now = self.clock.now();
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if now.saturating_duration_since(entry.captured_at) < self.config.ttl {
            debug!(key = %key, "stats cache hit");
            Some(entry.stats.clone())
        } else {
            debug!(key = %key, "stats cache entry stale");
            None
        }
    }

    /// Stores `stats` under `key`, then prunes if the cache has grown large.
    #[allow(clippy::significant_drop_tightening)] // Insert and prune are one step
    pub fn put(&self, key: CacheKey, stats: ContainerStats) {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        entries.insert(
            key,
            CacheEntry {
                stats,
                captured_at: now,
            },
        );

        if entries.len() > self.config.prune_threshold {
            let before = entries.len();
            let retention = self.config.retention;
            entries.retain(|_, entry| now.saturating_duration_since(entry.captured_at) <= retention);
            debug!(
                removed = before - entries.len(),
                remaining = entries.len(),
                "pruned stats cache"
            );
        }
    }

    /// Number of entries held, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceSample;

    fn stats(id: &str, cpu: f64) -> ContainerStats {
        ContainerStats::new(
            id,
            "local",
            ResourceSample {
                cpu_percent: cpu,
                ..Default::default()
            },
        )
    }

    fn manual_cache(config: CacheConfig) -> (StatsCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = StatsCache::with_clock(config, clock.clone());
        (cache, clock)
    }

    // ===========================================
    // Key Tests
    // ===========================================

    #[test]
    fn key_joins_host_and_id() {
        let key = CacheKey::new("edge-1", "abc123");
        assert_eq!(key.as_str(), "edge-1:abc123");
        assert_eq!(key.to_string(), "edge-1:abc123");
    }

    // ===========================================
    // Freshness Tests
    // ===========================================

    #[test]
    fn fresh_entry_is_returned() {
        let (cache, clock) = manual_cache(CacheConfig::default());
        let key = CacheKey::new("local", "a");
        cache.put(key.clone(), stats("a", 1.0));

        clock.advance(Duration::from_millis(2_999));
        assert_eq!(cache.get(&key), Some(stats("a", 1.0)));
    }

    #[test]
    fn entry_at_ttl_is_stale() {
        let (cache, clock) = manual_cache(CacheConfig::default());
        let key = CacheKey::new("local", "a");
        cache.put(key.clone(), stats("a", 1.0));

        clock.advance(DEFAULT_TTL);
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn stale_entry_stays_until_pruned() {
        let (cache, clock) = manual_cache(CacheConfig::default());
        let key = CacheKey::new("local", "a");
        cache.put(key.clone(), stats("a", 1.0));

        clock.advance(Duration::from_secs(5));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_replaces_and_refreshes() {
        let (cache, clock) = manual_cache(CacheConfig::default());
        let key = CacheKey::new("local", "a");
        cache.put(key.clone(), stats("a", 1.0));
        clock.advance(Duration::from_secs(4));
        cache.put(key.clone(), stats("a", 2.0));

        assert_eq!(cache.get(&key), Some(stats("a", 2.0)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_key_is_absent() {
        let cache = StatsCache::default();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&CacheKey::new("local", "nope")), None);
    }

    // ===========================================
    // Prune Tests
    // ===========================================

    #[test]
    fn no_prune_at_or_below_threshold() {
        let config = CacheConfig::default().with_prune_threshold(3);
        let (cache, clock) = manual_cache(config);
        for id in ["a", "b", "c"] {
            cache.put(CacheKey::new("local", id), stats(id, 0.0));
        }

        clock.advance(Duration::from_secs(60));
        cache.put(CacheKey::new("local", "a"), stats("a", 0.0));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn prune_removes_only_entries_past_retention() {
        let config = CacheConfig::default().with_prune_threshold(3);
        let (cache, clock) = manual_cache(config);

        cache.put(CacheKey::new("local", "old-1"), stats("old-1", 0.0));
        cache.put(CacheKey::new("local", "old-2"), stats("old-2", 0.0));
        clock.advance(Duration::from_secs(5));
        cache.put(CacheKey::new("local", "mid"), stats("mid", 0.0));
        clock.advance(Duration::from_secs(6));

        // Four entries now: two at 11s, one at 6s, one new.
        cache.put(CacheKey::new("local", "new"), stats("new", 0.0));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&CacheKey::new("local", "new")).is_some());
        // Stale but within retention, so still held.
        assert!(cache.get(&CacheKey::new("local", "mid")).is_none());
    }

    #[test]
    fn default_prune_threshold_is_one_hundred() {
        let (cache, clock) = manual_cache(CacheConfig::default());
        for i in 0..100 {
            let id = format!("c{i}");
            cache.put(CacheKey::new("local", &id), stats(&id, 0.0));
        }
        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.len(), 100);

        cache.put(CacheKey::new("local", "c100"), stats("c100", 0.0));
        assert_eq!(cache.len(), 1);
    }

    // ===========================================
    // Config Tests
    // ===========================================

    #[test]
    fn config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(3));
        assert_eq!(config.retention, Duration::from_secs(10));
        assert_eq!(config.prune_threshold, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_inconsistent_windows() {
        let config = CacheConfig::default().with_ttl(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = CacheConfig::default()
            .with_ttl(Duration::from_secs(30))
            .with_retention(Duration::from_secs(10));
        assert!(config.validate().is_err());
    }

    #[test]
    fn concurrent_access_is_safe() {
        let cache = Arc::new(StatsCache::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = format!("t{t}-{i}");
                        let key = CacheKey::new("local", &id);
                        cache.put(key.clone(), stats(&id, f64::from(i)));
                        assert!(cache.get(&key).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
