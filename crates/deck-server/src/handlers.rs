//! HTTP request handlers for the LogDeck API.

use std::io;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use deck_engine::{ContainerDetails, ContainerInfo, HostConfig};
use deck_fleet::HostError;
use deck_logs::{LogOptions, NDJSON_CONTENT_TYPE, collect_snapshot, ndjson_reader, relay_follow};
use deck_metrics::{ContainerIdentifier, ContainerStats};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Buffered NDJSON chunks between the relay and the response body.
const FOLLOW_BUFFER: usize = 16;

/// Query parameters naming a host.
#[derive(Debug, Deserialize)]
pub struct HostQuery {
    /// Host name.
    pub host: Option<String>,
}

impl HostQuery {
    fn require(self) -> ServerResult<String> {
        require_host(self.host)
    }
}

fn require_host(host: Option<String>) -> ServerResult<String> {
    host.filter(|h| !h.is_empty())
        .ok_or(ServerError::MissingParameter("host"))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status message.
    pub status: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Number of configured hosts.
    pub hosts: usize,
}

/// Container list response.
#[derive(Debug, Serialize)]
pub struct ContainersResponse {
    /// Containers of every reachable host.
    pub containers: Vec<ContainerInfo>,
    /// Configured hosts.
    pub hosts: Vec<HostConfig>,
    /// Hosts that could not be listed.
    #[serde(rename = "hostErrors")]
    pub host_errors: Vec<HostError>,
}

/// Container details response.
#[derive(Debug, Serialize)]
pub struct ContainerResponse {
    /// The inspected container.
    pub container: ContainerDetails,
}

/// Stats response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Sampled containers.
    pub stats: Vec<ContainerStats>,
}

/// Body of a bulk stats request.
#[derive(Debug, Deserialize)]
pub struct BulkStatsRequest {
    /// Containers to sample.
    pub containers: Vec<ContainerIdentifier>,
}

/// Handle GET /api/v1/health - health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.uptime_secs(),
        hosts: state.fleet().hosts().len(),
    })
}

/// Handle GET /api/v1/containers - every container on every host.
pub async fn list_containers(
    State(state): State<Arc<AppState>>,
) -> ServerResult<Json<ContainersResponse>> {
    let ctx = state.request_context();
    let (containers, host_errors) = state.fleet().list_containers(&ctx).await?.into_parts();

    Ok(Json(ContainersResponse {
        containers,
        hosts: state.fleet().hosts().to_vec(),
        host_errors,
    }))
}

/// Handle GET /api/v1/containers/stats - stats of every running container.
pub async fn all_running_stats(
    State(state): State<Arc<AppState>>,
) -> ServerResult<Json<StatsResponse>> {
    let ctx = state.request_context();
    let stats = state.fleet().all_running_stats(&ctx).await?;
    Ok(Json(StatsResponse { stats }))
}

/// Handle POST /api/v1/containers/stats - stats of the listed containers.
pub async fn bulk_stats(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BulkStatsRequest>, JsonRejection>,
) -> ServerResult<Json<StatsResponse>> {
    let Json(request) = body.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let ctx = state.request_context();
    let stats = state.fleet().bulk_stats(&ctx, request.containers).await?;
    Ok(Json(StatsResponse { stats }))
}

/// Handle GET /api/v1/containers/{id} - container details.
pub async fn get_container(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HostQuery>,
) -> ServerResult<Json<ContainerResponse>> {
    let host = query.require()?;
    let ctx = state.request_context();
    let container = state.fleet().inspect(&ctx, &host, &id).await?;
    Ok(Json(ContainerResponse { container }))
}

/// Handle GET /api/v1/containers/{id}/stats - stats of one container.
pub async fn get_container_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HostQuery>,
) -> ServerResult<Json<StatsResponse>> {
    let host = query.require()?;
    let ctx = state.request_context();
    let stats = state.fleet().container_stats(&ctx, &host, &id).await?;
    Ok(Json(StatsResponse { stats: vec![stats] }))
}

/// Handle GET /api/v1/containers/{id}/logs/parsed - classified logs.
///
/// Without `follow` the response is a `{logs, count}` snapshot. With it,
/// entries are streamed as NDJSON until the container stops, the client
/// disconnects or the server shuts down.
pub async fn get_container_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> ServerResult<Response> {
    let host = require_host(
        params
            .iter()
            .find(|(key, _)| key == "host")
            .map(|(_, value)| value.clone()),
    )?;
    let options =
        LogOptions::from_params(params.iter().filter(|(key, _)| key != "host").cloned())?;

    if options.follow {
        return follow_logs(&state, host, id, &options).await;
    }

    let ctx = state.request_context();
    let chunks = state.fleet().open_logs(&ctx, &host, &id, &options).await?;
    let batch = collect_snapshot(chunks).await?;
    debug!(host = %host, container = %id, count = batch.count, "log snapshot");
    Ok(Json(batch).into_response())
}

async fn follow_logs(
    state: &AppState,
    host: String,
    id: String,
    options: &LogOptions,
) -> ServerResult<Response> {
    let ctx = state.stream_context();
    let chunks = state.fleet().open_logs(&ctx, &host, &id, options).await?;
    let reader = ndjson_reader(chunks);

    let (mut tx, rx) = mpsc::channel::<io::Result<Bytes>>(FOLLOW_BUFFER);
    let cancel = ctx.token().clone();
    tokio::spawn(async move {
        info!(host = %host, container = %id, "log follow started");
        match relay_follow(reader, &mut tx, &cancel).await {
            Ok(summary) => info!(
                host = %host,
                container = %id,
                bytes = summary.bytes_forwarded,
                end = ?summary.end,
                "log follow ended"
            ),
            Err(e) => warn!(host = %host, container = %id, error = %e, "log follow failed"),
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}
