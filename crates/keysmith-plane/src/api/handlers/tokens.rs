//! Token handlers
//!
//! Every route here acts on the authenticated caller's consumer.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use keysmith_core::{AutoProvisionedToken, DeletedToken, GeneratedToken, UserTokenListing};

use super::AppState;
use crate::api::auth::AuthenticatedPrincipal;
use crate::api::error::ApiError;

/// Optional body of `POST /generate-token-auto`
#[derive(Debug, Default, Deserialize)]
pub struct GenerateTokenRequest {
    #[serde(default)]
    pub token_name: Option<String>,
}

/// Response from deleting a token by id
#[derive(Debug, Serialize)]
pub struct DeleteTokenResponse {
    pub message: String,
    pub deleted_token_id: String,
}

/// Issue a new token, named by the caller or by default
///
/// POST /generate-token-auto
///
/// The body is optional; an empty body or empty name means a default-named
/// token. Names with surrounding whitespace are rejected.
pub async fn generate_token_auto(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
    body: Bytes,
) -> Result<Json<GeneratedToken>, ApiError> {
    let request: GenerateTokenRequest = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateTokenRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
    };

    if let Some(ref name) = request.token_name {
        if name.trim() != name {
            return Err(ApiError::BadRequest(
                "token_name must not have leading or trailing whitespace".into(),
            ));
        }
    }

    let generated = state
        .orchestrator
        .generate_auto_token(principal.username(), request.token_name.as_deref())
        .await?;

    info!(
        username = %principal.username(),
        token_name = %generated.token_name,
        "Generated token"
    );
    Ok(Json(generated))
}

/// Ensure the caller's consumer and issue an `_auto_` token
///
/// POST /auto-generate-consumer
pub async fn auto_generate_consumer(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
) -> Result<Json<AutoProvisionedToken>, ApiError> {
    let provisioned = state
        .orchestrator
        .auto_generate_consumer_and_token(principal.username())
        .await?;
    Ok(Json(provisioned))
}

/// List the caller's tokens with truncated display tokens
///
/// GET /my-tokens
pub async fn my_tokens(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
) -> Result<Json<UserTokenListing>, ApiError> {
    let listing = state
        .orchestrator
        .list_user_tokens(principal.username())
        .await?;
    Ok(Json(listing))
}

/// DELETE /my-tokens/{jwt_id}
pub async fn delete_token_by_id(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
    Path(jwt_id): Path<String>,
) -> Result<Json<DeleteTokenResponse>, ApiError> {
    let deleted = state
        .orchestrator
        .delete_token_by_id(principal.username(), &jwt_id)
        .await?;

    if !deleted {
        return Err(ApiError::NotFound(format!("Token '{}' not found", jwt_id)));
    }

    Ok(Json(DeleteTokenResponse {
        message: "Token deleted successfully".into(),
        deleted_token_id: jwt_id,
    }))
}

/// DELETE /my-tokens/by-name/{token_name}
pub async fn delete_token_by_name(
    State(state): State<Arc<AppState>>,
    principal: AuthenticatedPrincipal,
    Path(token_name): Path<String>,
) -> Result<Json<DeletedToken>, ApiError> {
    let deleted = state
        .orchestrator
        .delete_token_by_name(principal.username(), &token_name)
        .await?;
    Ok(Json(deleted))
}
