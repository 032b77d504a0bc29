//! In-process engine with seeded containers.
//!
//! Used by tests and by the server's demo mode. Latency and failures can be
//! injected so that fan-out behaviour is observable without a daemon.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;

use deck_logs::{LogChunk, LogOptions};
use deck_metrics::UsageSnapshot;

use crate::context::CallContext;
use crate::engine::{ContainerEngine, LogChunkStream};
use crate::error::{EngineError, EngineResult};
use crate::types::{ContainerDetails, ContainerInfo};

#[derive(Debug, Clone, Default)]
struct Seed {
    info: ContainerInfo,
    logs: Vec<LogChunk>,
    usage: Option<UsageSnapshot>,
}

/// An engine backed by in-memory data.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    containers: RwLock<BTreeMap<String, Seed>>,
    failure: RwLock<Option<String>>,
    latency: Option<Duration>,
    live_interval: Option<Duration>,
    usage_calls: AtomicUsize,
}

impl InMemoryEngine {
    /// Creates an engine with no containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a container.
    #[must_use]
    pub fn with_container(self, info: ContainerInfo) -> Self {
        self.insert(info);
        self
    }

    /// Sets the log frames of a container.
    #[must_use]
    pub fn with_logs(self, id: &str, logs: Vec<LogChunk>) -> Self {
        if let Some(seed) = self.containers.write().get_mut(id) {
            seed.logs = logs;
        }
        self
    }

    /// Sets the usage snapshot of a container.
    #[must_use]
    pub fn with_usage(self, id: &str, usage: UsageSnapshot) -> Self {
        if let Some(seed) = self.containers.write().get_mut(id) {
            seed.usage = Some(usage);
        }
        self
    }

    /// Delays every call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// In follow mode, emits a synthetic line every `interval` after the seeded frames.
    #[must_use]
    pub const fn with_live_interval(mut self, interval: Duration) -> Self {
        self.live_interval = Some(interval);
        self
    }

    /// Makes every call fail with `message`.
    #[must_use]
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.set_failure(Some(message.into()));
        self
    }

    /// Adds or replaces a container.
    pub fn insert(&self, info: ContainerInfo) {
        self.containers.write().insert(
            info.id.clone(),
            Seed {
                info,
                ..Seed::default()
            },
        );
    }

    /// Sets or clears the injected failure.
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.write() = message;
    }

    /// Number of `sample_usage` calls that reached the engine.
    pub fn usage_calls(&self) -> usize {
        self.usage_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> EngineResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failure = self.failure.read().clone();
        failure.map_or(Ok(()), |message| Err(EngineError::Api(message)))
    }

    fn seed(&self, id: &str) -> EngineResult<Seed> {
        self.containers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound { id: id.to_string() })
    }
}

impl ContainerEngine for InMemoryEngine {
    fn list_containers<'a>(
        &'a self,
        ctx: &'a CallContext,
        all: bool,
    ) -> BoxFuture<'a, EngineResult<Vec<ContainerInfo>>> {
        Box::pin(ctx.run(async move {
            self.enter().await?;
            Ok(self
                .containers
                .read()
                .values()
                .filter(|seed| all || seed.info.is_running())
                .map(|seed| seed.info.clone())
                .collect())
        }))
    }

    fn inspect_container<'a>(
        &'a self,
        ctx: &'a CallContext,
        id: &'a str,
    ) -> BoxFuture<'a, EngineResult<ContainerDetails>> {
        Box::pin(ctx.run(async move {
            self.enter().await?;
            let info = self.seed(id)?.info;
            Ok(ContainerDetails {
                name: info
                    .names
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                created: chrono::DateTime::from_timestamp(info.created, 0)
                    .map(|t| t.to_rfc3339()),
                id: info.id,
                image: info.image,
                state: info.state,
                restart_count: 0,
                labels: info.labels,
                host: String::new(),
            })
        }))
    }

    fn read_logs<'a>(
        &'a self,
        ctx: &'a CallContext,
        id: &'a str,
        options: &'a LogOptions,
    ) -> BoxFuture<'a, EngineResult<LogChunkStream>> {
        Box::pin(ctx.run(async move {
            self.enter().await?;
            let seed = self.seed(id)?;

            let mut selected: Vec<LogChunk> = seed
                .logs
                .into_iter()
                .filter(|chunk| options.shows(chunk.stream))
                .collect();
            if let Some(tail) = options.tail_lines() {
                let skip = selected.len().saturating_sub(tail);
                selected.drain(..skip);
            }

            let seeded = stream::iter(selected.into_iter().map(Ok::<_, EngineError>));
            let source = match (options.follow, self.live_interval) {
                (false, _) => seeded.boxed(),
                (true, None) => seeded.chain(stream::pending()).boxed(),
                (true, Some(interval)) => seeded.chain(live_lines(interval)).boxed(),
            };
            Ok(ctx.guard_stream(source))
        }))
    }

    fn sample_usage<'a>(
        &'a self,
        ctx: &'a CallContext,
        id: &'a str,
    ) -> BoxFuture<'a, EngineResult<UsageSnapshot>> {
        Box::pin(ctx.run(async move {
            self.usage_calls.fetch_add(1, Ordering::SeqCst);
            self.enter().await?;
            Ok(self.seed(id)?.usage.unwrap_or_default())
        }))
    }

    fn ping<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(ctx.run(self.enter()))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

/// An endless stream of timestamped heartbeat lines.
fn live_lines(interval: Duration) -> impl futures::Stream<Item = EngineResult<LogChunk>> + Send {
    stream::unfold(0_u64, move |n| async move {
        tokio::time::sleep(interval).await;
        let line = format!(
            "{} INFO heartbeat {n}\n",
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        );
        Some((Ok(LogChunk::stdout(line)), n + 1))
    })
}
