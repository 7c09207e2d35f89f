//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use keysmith_bridge::BridgeError;
use keysmith_core::ProvisionError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// HTTP status for a provisioning failure, by its innermost cause
fn provision_status(err: &ProvisionError) -> StatusCode {
    match err.root() {
        ProvisionError::UpstreamUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ProvisionError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ProvisionError::ConsumerNotFound(_) | ProvisionError::CredentialNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                None,
            ),
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                msg.clone(),
                None,
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                None,
            ),
            ApiError::Provision(err) => {
                let details = match err {
                    ProvisionError::ProvisioningIncomplete {
                        consumer_created, ..
                    } => Some(serde_json::json!({
                        "consumer_created": consumer_created,
                        "failed_step": "credential",
                    })),
                    _ => None,
                };
                (provision_status(err), err.kind(), err.to_string(), details)
            }
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), code = code, error = %message, "Request failed");
        }

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}
