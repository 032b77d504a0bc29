//! Docker engine implementation using bollard.

use std::time::Duration;

use bollard::Docker;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, LogOutput, LogsOptions, StatsOptions,
};
use futures::future::BoxFuture;
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info};

use deck_logs::{LogChunk, LogOptions};
use deck_metrics::UsageSnapshot;

use crate::context::CallContext;
use crate::engine::{ContainerEngine, LogChunkStream};
use crate::error::{EngineError, EngineResult};
use crate::time_range::resolve_bound;
use crate::types::{ContainerDetails, ContainerInfo, Endpoint, HostConfig};

/// A Docker daemon reached through bollard.
pub struct DockerEngine {
    client: Docker,
    name: String,
}

impl std::fmt::Debug for DockerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerEngine")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl DockerEngine {
    /// Creates a client for `host`.
    ///
    /// No request is made; use [`ContainerEngine::ping`] to check the daemon.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is unsupported or the client cannot be built.
    pub fn connect(host: &HostConfig, timeout: Duration) -> EngineResult<Self> {
        let secs = timeout.as_secs().max(1);
        let client = match host.endpoint()? {
            Endpoint::Local => Docker::connect_with_local_defaults()
                .map(|client| client.with_timeout(timeout)),
            Endpoint::Unix(path) => {
                Docker::connect_with_unix(&path, secs, bollard::API_DEFAULT_VERSION)
            }
            Endpoint::Http(url) => {
                Docker::connect_with_http(&url, secs, bollard::API_DEFAULT_VERSION)
            }
        }
        .map_err(|e| {
            EngineError::ConnectionFailed(format!("failed to connect to {}: {e}", host.host))
        })?;

        info!(host = %host.name, endpoint = %host.host, "docker client configured");
        Ok(Self {
            client,
            name: host.name.clone(),
        })
    }

    /// Host name this engine was configured under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn map_error(err: bollard::errors::Error, id: Option<&str>) -> EngineError {
    use bollard::errors::Error;

    match (err, id) {
        (Error::DockerResponseServerError { status_code: 404, .. }, Some(id)) => {
            EngineError::NotFound { id: id.to_string() }
        }
        (Error::RequestTimeoutError, _) => EngineError::DeadlineExceeded,
        (err @ (Error::HyperResponseError { .. } | Error::IOError { .. }), _) => {
            EngineError::ConnectionFailed(err.to_string())
        }
        (other, _) => EngineError::Api(other.to_string()),
    }
}

fn log_chunk(output: LogOutput) -> LogChunk {
    match output {
        LogOutput::StdErr { message } => LogChunk::stderr(message),
        LogOutput::StdOut { message }
        | LogOutput::StdIn { message }
        | LogOutput::Console { message } => LogChunk::stdout(message),
    }
}

fn logs_options(options: &LogOptions) -> LogsOptions<String> {
    let now = chrono::Utc::now();
    LogsOptions {
        follow: options.follow,
        stdout: options.show_stdout,
        stderr: options.show_stderr,
        since: options
            .since
            .as_deref()
            .and_then(|since| resolve_bound(since, now))
            .unwrap_or(0),
        until: options
            .until
            .as_deref()
            .and_then(|until| resolve_bound(until, now))
            .unwrap_or(0),
        timestamps: options.timestamps,
        tail: options.tail.clone(),
    }
}

impl ContainerEngine for DockerEngine {
    fn list_containers<'a>(
        &'a self,
        ctx: &'a CallContext,
        all: bool,
    ) -> BoxFuture<'a, EngineResult<Vec<ContainerInfo>>> {
        Box::pin(ctx.run(async move {
            let options = ListContainersOptions::<String> {
                all,
                ..Default::default()
            };
            let containers = self
                .client
                .list_containers(Some(options))
                .await
                .map_err(|e| map_error(e, None))?;

            debug!(host = %self.name, count = containers.len(), "listed containers");
            Ok(containers
                .into_iter()
                .map(|c| ContainerInfo {
                    id: c.id.unwrap_or_default(),
                    names: c.names.unwrap_or_default(),
                    image: c.image.unwrap_or_default(),
                    image_id: c.image_id.unwrap_or_default(),
                    command: c.command.unwrap_or_default(),
                    created: c.created.unwrap_or_default(),
                    state: c.state.unwrap_or_default(),
                    status: c.status.unwrap_or_default(),
                    labels: c.labels.unwrap_or_default().into_iter().collect(),
                    host: String::new(),
                })
                .collect())
        }))
    }

    fn inspect_container<'a>(
        &'a self,
        ctx: &'a CallContext,
        id: &'a str,
    ) -> BoxFuture<'a, EngineResult<ContainerDetails>> {
        Box::pin(ctx.run(async move {
            let inspect = self
                .client
                .inspect_container(id, None::<InspectContainerOptions>)
                .await
                .map_err(|e| map_error(e, Some(id)))?;

            let config = inspect.config.unwrap_or_default();
            Ok(ContainerDetails {
                id: inspect.id.unwrap_or_default(),
                name: inspect
                    .name
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                image: config.image.unwrap_or_default(),
                state: inspect
                    .state
                    .and_then(|s| s.status)
                    .map(|status| status.to_string())
                    .unwrap_or_default(),
                created: inspect.created,
                restart_count: inspect.restart_count.unwrap_or_default(),
                labels: config.labels.unwrap_or_default().into_iter().collect(),
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
            // The log endpoint reports a missing container only once the
            // stream is polled, so resolve the container first.
            self.client
                .inspect_container(id, None::<InspectContainerOptions>)
                .await
                .map_err(|e| map_error(e, Some(id)))?;

            let owned_id = id.to_string();
            let stream = self
                .client
                .logs(id, Some(logs_options(options)))
                .map_ok(log_chunk)
                .map_err(move |e| map_error(e, Some(&owned_id)));

            debug!(host = %self.name, container = %id, follow = options.follow, "log stream opened");
            Ok(ctx.guard_stream(stream))
        }))
    }

    fn sample_usage<'a>(
        &'a self,
        ctx: &'a CallContext,
        id: &'a str,
    ) -> BoxFuture<'a, EngineResult<UsageSnapshot>> {
        Box::pin(ctx.run(async move {
            // one_shot skips the second sample that fills in precpu_stats.
            let options = StatsOptions {
                stream: false,
                one_shot: false,
            };
            let mut stream = self.client.stats(id, Some(options));
            let stats = stream
                .next()
                .await
                .ok_or_else(|| EngineError::NotFound { id: id.to_string() })?
                .map_err(|e| map_error(e, Some(id)))?;

            let value =
                serde_json::to_value(&stats).map_err(|e| EngineError::Decode(e.to_string()))?;
            UsageSnapshot::from_value(value).map_err(|e| EngineError::Decode(e.to_string()))
        }))
    }

    fn ping<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(ctx.run(async move {
            self.client
                .ping()
                .await
                .map_err(|e| EngineError::ConnectionFailed(e.to_string()))?;
            Ok(())
        }))
    }

    fn kind(&self) -> &'static str {
        "docker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use deck_logs::StreamKind;

    // =========================================================================
    // Unit Tests (no Docker required)
    // =========================================================================

    #[test]
    fn connect_rejects_unsupported_endpoints() {
        let host = HostConfig::new("edge", "ssh://ops@edge");
        let err = DockerEngine::connect(&host, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedHost { .. }));
    }

    #[test]
    fn connect_http_builds_client() {
        let host = HostConfig::new("edge", "tcp://127.0.0.1:2375");
        let engine = DockerEngine::connect(&host, Duration::from_secs(5)).unwrap();
        assert_eq!(engine.name(), "edge");
        assert_eq!(engine.kind(), "docker");
    }

    #[test]
    fn log_output_maps_to_streams() {
        let err = log_chunk(LogOutput::StdErr {
            message: Bytes::from_static(b"boom\n"),
        });
        assert_eq!(err.stream, StreamKind::Stderr);

        let out = log_chunk(LogOutput::Console {
            message: Bytes::from_static(b"tty\n"),
        });
        assert_eq!(out.stream, StreamKind::Stdout);
        assert_eq!(out.data, Bytes::from_static(b"tty\n"));
    }

    #[test]
    fn logs_options_translate() {
        let options = LogOptions {
            since: Some("1700000000".to_string()),
            until: Some("not a time".to_string()),
            ..LogOptions::default()
        }
        .with_follow(true)
        .with_streams(false, true);

        let bollard = logs_options(&options);
        assert!(bollard.follow);
        assert!(!bollard.stdout);
        assert!(bollard.stderr);
        assert!(bollard.timestamps);
        assert_eq!(bollard.since, 1_700_000_000);
        assert_eq!(bollard.until, 0);
        assert_eq!(bollard.tail, "100");
    }

    #[test]
    fn not_found_maps_only_with_id() {
        let server_404 = || bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container".to_string(),
        };
        assert!(map_error(server_404(), Some("abc")).is_not_found());
        assert!(matches!(map_error(server_404(), None), EngineError::Api(_)));
        assert!(matches!(
            map_error(bollard::errors::Error::RequestTimeoutError, None),
            EngineError::DeadlineExceeded
        ));
    }

    // =========================================================================
    // Integration Tests (require Docker)
    // =========================================================================

    #[tokio::test]
    #[ignore = "requires Docker daemon"]
    async fn docker_ping() {
        let engine = DockerEngine::connect(&HostConfig::local(), Duration::from_secs(10)).unwrap();
        engine.ping(&CallContext::new()).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires Docker daemon"]
    async fn docker_list_and_inspect() {
        let engine = DockerEngine::connect(&HostConfig::local(), Duration::from_secs(10)).unwrap();
        let ctx = CallContext::new();
        let containers = engine.list_containers(&ctx, true).await.unwrap();
        if let Some(first) = containers.first() {
            let details = engine.inspect_container(&ctx, &first.id).await.unwrap();
            assert_eq!(details.id, first.id);
        }

        let err = engine
            .inspect_container(&ctx, "logdeck-missing-container")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
