//! Concurrent queries across every configured host.
//!
//! Each host (or each container, for bulk stats) gets its own task in a
//! [`JoinSet`]. Results are merged by the single caller awaiting the set, so
//! no accumulator is shared between tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use deck_engine::{CallContext, ContainerDetails, ContainerInfo, HostConfig, LogChunkStream};
use deck_logs::LogOptions;
use deck_metrics::{CacheKey, ContainerIdentifier, ContainerStats, StatsCache, sample};

use crate::error::{FleetError, FleetResult};
use crate::pool::HostPool;

/// A host that could not be queried during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostError {
    /// Host name.
    pub host: String,
    /// Failure description.
    pub message: String,
}

/// Containers per host, plus the hosts that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerListing {
    /// Containers keyed by host name. Failed hosts have no entry.
    pub by_host: BTreeMap<String, Vec<ContainerInfo>>,
    /// One entry per failed host.
    pub host_errors: Vec<HostError>,
}

impl ContainerListing {
    /// All containers, grouped by host name order.
    #[must_use]
    pub fn containers(&self) -> Vec<ContainerInfo> {
        self.by_host.values().flatten().cloned().collect()
    }

    /// Consumes the listing into its flat container list and host errors.
    #[must_use]
    pub fn into_parts(self) -> (Vec<ContainerInfo>, Vec<HostError>) {
        let containers = self.by_host.into_values().flatten().collect();
        (containers, self.host_errors)
    }
}

/// Fan-out coordinator over a [`HostPool`] with a shared stats cache.
#[derive(Debug, Clone)]
pub struct Fleet {
    pool: Arc<HostPool>,
    cache: Arc<StatsCache>,
}

impl Fleet {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(pool: HostPool, cache: StatsCache) -> Self {
        Self {
            pool: Arc::new(pool),
            cache: Arc::new(cache),
        }
    }

    /// The host pool.
    #[must_use]
    pub fn pool(&self) -> &HostPool {
        &self.pool
    }

    /// Configured hosts.
    #[must_use]
    pub fn hosts(&self) -> &[HostConfig] {
        self.pool.hosts()
    }

    /// The stats cache.
    #[must_use]
    pub fn cache(&self) -> &StatsCache {
        &self.cache
    }

    /// Lists all containers on every host concurrently.
    ///
    /// A failing host becomes a [`HostError`] and never affects the others.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::TaskFailed`] only if a host task panics.
    pub async fn list_containers(&self, ctx: &CallContext) -> FleetResult<ContainerListing> {
        let mut tasks = JoinSet::new();
        for (name, engine) in self.pool.iter() {
            let name = name.to_string();
            let engine = Arc::clone(engine);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                if ctx.is_cancelled() {
                    return (name, Err(ctx.cancellation_error()));
                }
                let result = engine.list_containers(&ctx, true).await;
                (name, result)
            });
        }

        let mut listing = ContainerListing::default();
        while let Some(joined) = tasks.join_next().await {
            let (host, result) = joined.map_err(|e| FleetError::TaskFailed(e.to_string()))?;
            match result {
                Ok(mut containers) => {
                    for container in &mut containers {
                        container.host.clone_from(&host);
                    }
                    debug!(host = %host, count = containers.len(), "host listed");
                    listing.by_host.insert(host, containers);
                }
                Err(e) => {
                    warn!(host = %host, error = %e, "failed to list containers");
                    listing.host_errors.push(HostError {
                        host,
                        message: e.to_string(),
                    });
                }
            }
        }
        listing.host_errors.sort_by(|a, b| a.host.cmp(&b.host));
        Ok(listing)
    }

    /// Returns usage figures for one container, from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns error if the host is unknown or the engine call fails.
    pub async fn container_stats(
        &self,
        ctx: &CallContext,
        host: &str,
        id: &str,
    ) -> FleetResult<ContainerStats> {
        container_stats(&self.pool, &self.cache, ctx, host, id).await
    }

    /// Samples many containers concurrently.
    ///
    /// Containers that fail are logged and left out of the result.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::TaskFailed`] only if a sampling task panics.
    pub async fn bulk_stats(
        &self,
        ctx: &CallContext,
        containers: Vec<ContainerIdentifier>,
    ) -> FleetResult<Vec<ContainerStats>> {
        let mut tasks = JoinSet::new();
        for identifier in containers {
            let pool = Arc::clone(&self.pool);
            let cache = Arc::clone(&self.cache);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                if ctx.is_cancelled() {
                    return None;
                }
                let result =
                    container_stats(&pool, &cache, &ctx, &identifier.host, &identifier.id).await;
                match result {
                    Ok(stats) => Some(stats),
                    Err(e) => {
                        warn!(
                            container = %identifier.short_id(),
                            host = %identifier.host,
                            error = %e,
                            "failed to get container stats"
                        );
                        None
                    }
                }
            });
        }

        let mut stats = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            if let Some(sampled) = joined.map_err(|e| FleetError::TaskFailed(e.to_string()))? {
                stats.push(sampled);
            }
        }
        Ok(stats)
    }

    /// Samples every running container on every host.
    ///
    /// Hosts that cannot be listed are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::TaskFailed`] only if a task panics.
    pub async fn all_running_stats(&self, ctx: &CallContext) -> FleetResult<Vec<ContainerStats>> {
        let mut tasks = JoinSet::new();
        for (name, engine) in self.pool.iter() {
            let name = name.to_string();
            let engine = Arc::clone(engine);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let result = engine.list_containers(&ctx, false).await;
                (name, result)
            });
        }

        let mut running = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (host, result) = joined.map_err(|e| FleetError::TaskFailed(e.to_string()))?;
            match result {
                Ok(containers) => running.extend(
                    containers
                        .into_iter()
                        .map(|c| ContainerIdentifier::new(host.clone(), c.id)),
                ),
                Err(e) => warn!(host = %host, error = %e, "skipping host for running stats"),
            }
        }

        self.bulk_stats(ctx, running).await
    }

    /// Inspects one container.
    ///
    /// # Errors
    ///
    /// Returns error if the host or the container is unknown, or the engine fails.
    pub async fn inspect(
        &self,
        ctx: &CallContext,
        host: &str,
        id: &str,
    ) -> FleetResult<ContainerDetails> {
        let engine = self.pool.engine(host)?;
        let mut details = engine.inspect_container(ctx, id).await?;
        details.host = host.to_string();
        Ok(details)
    }

    /// Opens the log source of one container.
    ///
    /// # Errors
    ///
    /// Returns error if the host or the container is unknown, or the engine fails.
    pub async fn open_logs(
        &self,
        ctx: &CallContext,
        host: &str,
        id: &str,
        options: &LogOptions,
    ) -> FleetResult<LogChunkStream> {
        let engine = self.pool.engine(host)?;
        Ok(engine.read_logs(ctx, id, options).await?)
    }
}

async fn container_stats(
    pool: &HostPool,
    cache: &StatsCache,
    ctx: &CallContext,
    host: &str,
    id: &str,
) -> FleetResult<ContainerStats> {
    let key = CacheKey::new(host, id);
    if let Some(stats) = cache.get(&key) {
        return Ok(stats);
    }

    let engine = pool.engine(host)?;
    let snapshot = engine.sample_usage(ctx, id).await?;
    let stats = ContainerStats::new(id, host, sample(&snapshot));
    debug!(key = %key, cpu = stats.cpu_percent, "stats sampled");
    cache.put(key, stats.clone());
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use deck_engine::{ContainerEngine, EngineError, InMemoryEngine};
    use deck_logs::LogChunk;
    use deck_metrics::{CacheConfig, CpuStats, CpuUsage, ManualClock, MemoryStats, UsageSnapshot};
    use futures::StreamExt;

    use super::*;

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn container(id: &str, state: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.to_string(),
            names: vec![format!("/{id}")],
            image: "nginx:1.25".to_string(),
            state: state.to_string(),
            ..Default::default()
        }
    }

    fn usage(total: u64, pre_total: u64) -> UsageSnapshot {
        UsageSnapshot {
            cpu_stats: CpuStats {
                cpu_usage: CpuUsage {
                    total_usage: Some(total),
                    percpu_usage: None,
                },
                system_cpu_usage: Some(2_000),
                online_cpus: Some(2),
            },
            precpu_stats: CpuStats {
                cpu_usage: CpuUsage {
                    total_usage: Some(pre_total),
                    percpu_usage: None,
                },
                system_cpu_usage: Some(1_000),
                online_cpus: Some(2),
            },
            memory_stats: MemoryStats {
                usage: Some(512),
                limit: Some(1_024),
                stats: None,
            },
        }
    }

    fn engine(ids: &[(&str, &str)]) -> InMemoryEngine {
        ids.iter().fold(InMemoryEngine::new(), |engine, (id, state)| {
            engine
                .with_container(container(id, state))
                .with_usage(id, usage(300, 100))
        })
    }

    fn fleet(hosts: Vec<(&str, Arc<InMemoryEngine>)>) -> Fleet {
        let mut pool = HostPool::new();
        for (name, engine) in hosts {
            pool.insert(HostConfig::new(name, "local"), engine).unwrap();
        }
        Fleet::new(pool, StatsCache::default())
    }

    // =========================================================================
    // Listing
    // =========================================================================

    #[tokio::test]
    async fn list_collects_every_host_and_reports_failures() {
        let a = Arc::new(engine(&[("a1", "running"), ("a2", "exited")]));
        let b = Arc::new(engine(&[("b1", "running")]).failing("connection refused"));
        let c = Arc::new(engine(&[("c1", "running")]));
        let fleet = fleet(vec![("A", a), ("B", b), ("C", c)]);

        let listing = fleet.list_containers(&CallContext::new()).await.unwrap();

        assert_eq!(listing.by_host.len(), 2);
        assert_eq!(listing.by_host["A"].len(), 2);
        assert_eq!(listing.by_host["C"].len(), 1);
        assert!(listing.by_host["A"].iter().all(|c| c.host == "A"));
        assert_eq!(
            listing.host_errors,
            vec![HostError {
                host: "B".to_string(),
                message: "engine error: connection refused".to_string(),
            }]
        );

        let (containers, errors) = listing.into_parts();
        assert_eq!(containers.len(), 3);
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn list_with_no_hosts_is_empty() {
        let fleet = fleet(Vec::new());
        let listing = fleet.list_containers(&CallContext::new()).await.unwrap();
        assert!(listing.containers().is_empty());
        assert!(listing.host_errors.is_empty());
    }

    #[tokio::test]
    async fn cancelled_context_turns_hosts_into_errors() {
        let fleet = fleet(vec![("A", Arc::new(engine(&[("a1", "running")])))]);
        let ctx = CallContext::new();
        ctx.cancel();

        let listing = fleet.list_containers(&ctx).await.unwrap();
        assert!(listing.by_host.is_empty());
        assert_eq!(listing.host_errors[0].message, "operation cancelled");
    }

    #[tokio::test(start_paused = true)]
    async fn hosts_are_queried_concurrently() {
        let slow = |id: &str| {
            Arc::new(engine(&[(id, "running")]).with_latency(Duration::from_secs(2)))
        };
        let fleet = fleet(vec![("A", slow("a1")), ("B", slow("b1")), ("C", slow("c1"))]);

        let start = tokio::time::Instant::now();
        let listing = fleet.list_containers(&CallContext::new()).await.unwrap();

        assert_eq!(listing.containers().len(), 3);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_host_hits_deadline_without_blocking_others() {
        let fast = Arc::new(engine(&[("a1", "running")]));
        let slow = Arc::new(engine(&[("b1", "running")]).with_latency(Duration::from_secs(30)));
        let fleet = fleet(vec![("A", fast), ("B", slow)]);

        let ctx = CallContext::new().with_timeout(Duration::from_secs(10));
        let listing = fleet.list_containers(&ctx).await.unwrap();

        assert_eq!(listing.by_host["A"].len(), 1);
        assert_eq!(listing.host_errors[0].host, "B");
        assert_eq!(listing.host_errors[0].message, "operation timed out");
    }

    // =========================================================================
    // Stats
    // =========================================================================

    #[tokio::test]
    async fn single_stats_are_cached() {
        let a = Arc::new(engine(&[("a1", "running")]));
        let fleet = fleet(vec![("A", Arc::clone(&a))]);
        let ctx = CallContext::new();

        let first = fleet.container_stats(&ctx, "A", "a1").await.unwrap();
        let second = fleet.container_stats(&ctx, "A", "a1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(a.usage_calls(), 1);
        assert!((first.cpu_percent - 40.0).abs() < 1e-9);
        assert!((first.memory_percent - 50.0).abs() < 1e-9);
        assert_eq!(first.host, "A");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn cache_hit_is_logged_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let fleet = fleet(vec![("A", Arc::new(engine(&[("a1", "running")])))]);
        let ctx = CallContext::new();
        fleet.container_stats(&ctx, "A", "a1").await.unwrap();
        fleet.container_stats(&ctx, "A", "a1").await.unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("stats cache hit").count(), 1);
    }

    #[tokio::test]
    async fn stale_cache_entries_are_resampled() {
        let a = Arc::new(engine(&[("a1", "running")]));
        let clock = Arc::new(ManualClock::new());
        let cache = StatsCache::with_clock(CacheConfig::default(), clock.clone());
        let mut pool = HostPool::new();
        pool.insert(HostConfig::new("A", "local"), a.clone()).unwrap();
        let fleet = Fleet::new(pool, cache);
        let ctx = CallContext::new();

        fleet.container_stats(&ctx, "A", "a1").await.unwrap();
        clock.advance(Duration::from_secs(4));
        fleet.container_stats(&ctx, "A", "a1").await.unwrap();

        assert_eq!(a.usage_calls(), 2);
    }

    #[tokio::test]
    async fn single_stats_errors_propagate() {
        let fleet = fleet(vec![("A", Arc::new(engine(&[("a1", "running")])))]);
        let ctx = CallContext::new();

        let err = fleet.container_stats(&ctx, "Z", "a1").await.unwrap_err();
        assert!(matches!(err, FleetError::UnknownHost { .. }));

        let err = fleet.container_stats(&ctx, "A", "ghost").await.unwrap_err();
        assert!(matches!(err, FleetError::Engine(EngineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn bulk_drops_failures() {
        let a = Arc::new(engine(&[("a1", "running"), ("a2", "running")]));
        let fleet = fleet(vec![("A", a)]);

        let stats = fleet
            .bulk_stats(
                &CallContext::new(),
                vec![
                    ContainerIdentifier::new("A", "a1"),
                    ContainerIdentifier::new("A", "missing-container-id"),
                    ContainerIdentifier::new("nowhere", "a2"),
                    ContainerIdentifier::new("A", "a2"),
                ],
            )
            .await
            .unwrap();

        let mut ids: Vec<_> = stats.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn bulk_skips_when_cancelled() {
        let a = Arc::new(engine(&[("a1", "running")]));
        let fleet = fleet(vec![("A", Arc::clone(&a))]);
        let ctx = CallContext::new();
        ctx.cancel();

        let stats = fleet
            .bulk_stats(&ctx, vec![ContainerIdentifier::new("A", "a1")])
            .await
            .unwrap();
        assert!(stats.is_empty());
        assert_eq!(a.usage_calls(), 0);
    }

    #[tokio::test]
    async fn all_running_skips_failed_hosts_and_stopped_containers() {
        let a = Arc::new(engine(&[("a1", "running"), ("a2", "exited")]));
        let b = Arc::new(engine(&[("b1", "running")]).failing("boom"));
        let c = Arc::new(engine(&[("c1", "running")]));
        let fleet = fleet(vec![("A", a), ("B", b), ("C", c)]);

        let stats = fleet.all_running_stats(&CallContext::new()).await.unwrap();

        let mut keys: Vec<_> = stats
            .iter()
            .map(|s| format!("{}:{}", s.host, s.id))
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["A:a1", "C:c1"]);
    }

    // =========================================================================
    // Passthrough
    // =========================================================================

    #[tokio::test]
    async fn inspect_tags_host() {
        let fleet = fleet(vec![("A", Arc::new(engine(&[("a1", "running")])))]);
        let details = fleet.inspect(&CallContext::new(), "A", "a1").await.unwrap();
        assert_eq!(details.host, "A");
        assert_eq!(details.name, "a1");
    }

    #[tokio::test]
    async fn open_logs_reads_engine_stream() {
        let a = engine(&[("a1", "running")]).with_logs("a1", vec![LogChunk::stdout("hello\n")]);
        let fleet = fleet(vec![("A", Arc::new(a))]);
        let ctx = CallContext::new();

        let chunks: Vec<_> = fleet
            .open_logs(&ctx, "A", "a1", &LogOptions::default())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(chunks.len(), 1);

        let err = fleet
            .open_logs(&ctx, "Z", "a1", &LogOptions::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn host_error_json() {
        let err = HostError {
            host: "edge".to_string(),
            message: "timeout".to_string(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value, serde_json::json!({"host": "edge", "message": "timeout"}));
    }

    #[test]
    fn engines_are_object_safe() {
        let engine: Arc<dyn ContainerEngine> = Arc::new(InMemoryEngine::new());
        assert_eq!(engine.kind(), "memory");
    }
}
