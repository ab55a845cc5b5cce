use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;

use crate::handlers;
use crate::llm::ProviderRegistry;

/// Shared application state.
///
/// Cloned per request; holds no mutable state beyond the `Arc`-backed
/// provider clients.
#[derive(Clone)]
pub struct AppState {
    pub providers: ProviderRegistry,
    pub idle_timeout_seconds: u64,
    pub keep_alive_interval_seconds: u64,
}

pub fn build_app(state: AppState, request_timeout_secs: u64) -> Router {
    let api_v1 = Router::new()
        .route("/chat", post(handlers::v1::chat))
        .route("/models", get(handlers::v1::list_models))
        .with_state(state);

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .nest("/api/v1", api_v1)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}
