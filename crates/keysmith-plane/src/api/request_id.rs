//! `x-request-id` handling
//!
//! A caller-supplied id is kept when it parses as a UUID; anything else is
//! dropped and replaced by `MakeRequestUuid`. The id is recorded on the
//! request span and echoed on the response.

use axum::{extract::Request, http::HeaderName, middleware::Next, response::Response};
use tracing::{info_span, warn, Span};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Remove an `x-request-id` that is not a UUID so a fresh one is generated
pub async fn discard_malformed_request_id(mut request: Request, next: Next) -> Response {
    let malformed = request
        .headers()
        .get(&X_REQUEST_ID)
        .is_some_and(|value| value.to_str().ok().and_then(|v| Uuid::parse_str(v).ok()).is_none());

    if malformed {
        warn!(
            value = ?request.headers().get(&X_REQUEST_ID),
            "Ignoring malformed request id"
        );
        request.headers_mut().remove(&X_REQUEST_ID);
    }

    next.run(request).await
}

/// Request span carrying the request id
pub fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
