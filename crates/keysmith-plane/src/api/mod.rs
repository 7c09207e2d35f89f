//! API module for the provisioning server

pub mod auth;
pub mod error;
pub mod handlers;
pub mod request_id;

use axum::{
    extract::State,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::MetricsSnapshot;
use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Gateway call and provisioning counters
///
/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Open endpoints
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/create-consumer", post(handlers::create_consumer))
        // Authenticated endpoints
        .route("/consumers", get(handlers::list_consumers))
        .route("/me", get(handlers::me))
        .route("/generate-token-auto", post(handlers::generate_token_auto))
        .route("/auto-generate-consumer", post(handlers::auto_generate_consumer))
        .route("/my-tokens", get(handlers::my_tokens))
        .route("/my-tokens/{jwt_id}", delete(handlers::delete_token_by_id))
        .route(
            "/my-tokens/by-name/{token_name}",
            delete(handlers::delete_token_by_name),
        )
        // Middleware, innermost first
        .layer(PropagateRequestIdLayer::new(request_id::X_REQUEST_ID))
        .layer(TraceLayer::new_for_http().make_span_with(request_id::request_span))
        .layer(SetRequestIdLayer::new(request_id::X_REQUEST_ID, MakeRequestUuid))
        .layer(middleware::from_fn(request_id::discard_malformed_request_id))
        .with_state(state)
}
