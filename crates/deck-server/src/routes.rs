//! Route configuration for the LogDeck API.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{Router, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{
    all_running_stats, bulk_stats, get_container, get_container_logs, get_container_stats,
    health_check, list_containers,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(state.config());

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/containers", get(list_containers))
        .route("/containers/stats", get(all_running_stats).post(bulk_stats))
        .route("/containers/{id}", get(get_container))
        .route("/containers/{id}/stats", get(get_container_stats))
        .route("/containers/{id}/logs/parsed", get(get_container_logs));

    Router::new()
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
