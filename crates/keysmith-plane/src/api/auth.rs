//! Bearer authentication extractor

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use keysmith_bridge::VerifiedPrincipal;

use super::error::ApiError;
use super::handlers::AppState;

/// Principal verified from the request's `Authorization: Bearer` header
///
/// Handlers taking this extractor reject unauthenticated requests with 401
/// before their body runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub VerifiedPrincipal);

impl AuthenticatedPrincipal {
    pub fn username(&self) -> &str {
        &self.0.name
    }
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let principal = state.identity.verify_authorization(header).await?;
        Ok(AuthenticatedPrincipal(principal))
    }
}
