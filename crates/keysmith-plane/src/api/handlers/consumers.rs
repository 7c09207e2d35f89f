//! Consumer handlers
//!
//! `POST /create-consumer` is open: the username comes from the body, not
//! from a verified principal. The other routes act on the caller.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use keysmith_core::{Consumer, ConsumerSecondaryId, ConsumerTokenGrant};

use super::AppState;
use crate::api::auth::AuthenticatedPrincipal;
use crate::api::error::ApiError;

/// Request to create a consumer with a username-keyed token
#[derive(Debug, Deserialize)]
pub struct CreateConsumerRequest {
    pub username: String,
}

/// All gateway consumers
#[derive(Debug, Serialize)]
pub struct ConsumerListResponse {
    pub total: usize,
    pub consumers: Vec<Consumer>,
}

/// Caller identity as the provisioning plane sees it
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub secondary_id: ConsumerSecondaryId,
}

/// Create (or reuse) a consumer and issue a token keyed by its username
///
/// POST /create-consumer
pub async fn create_consumer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateConsumerRequest>,
) -> Result<Json<ConsumerTokenGrant>, ApiError> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username must not be empty".into()));
    }

    info!(username = %username, "Creating consumer with token");
    let grant = state.orchestrator.create_consumer_with_token(username).await?;
    Ok(Json(grant))
}

/// List gateway consumers
///
/// GET /consumers
pub async fn list_consumers(
    State(state): State<Arc<AppState>>,
    _principal: AuthenticatedPrincipal,
) -> Result<Json<ConsumerListResponse>, ApiError> {
    let consumers = state.orchestrator.list_consumers().await?;
    Ok(Json(ConsumerListResponse {
        total: consumers.len(),
        consumers,
    }))
}

/// Caller's username and secondary id
///
/// GET /me
pub async fn me(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
) -> Json<MeResponse> {
    Json(MeResponse {
        username: principal.username().to_string(),
        secondary_id: state.orchestrator.derive_secondary_id(principal.username()),
    })
}
