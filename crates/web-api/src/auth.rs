//! Shared-secret gate for trigger endpoints.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use trade_desk_core::TriggerConfig;

use crate::response::TriggerResponse;
use crate::server::AppState;

/// Compares two byte strings without short-circuiting on the first mismatch.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// True if `headers` carry the configured secret. An empty configured secret
/// authorizes nothing.
#[must_use]
pub fn is_authorized(headers: &HeaderMap, trigger: &TriggerConfig) -> bool {
    if trigger.secret.is_empty() {
        return false;
    }
    headers
        .get(trigger.header.as_str())
        .is_some_and(|value| constant_time_eq(value.as_bytes(), trigger.secret.as_bytes()))
}

/// Rejects the request with 401 before it reaches a handler.
pub async fn require_secret(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_authorized(request.headers(), &state.trigger) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Rejected trigger request with invalid secret");
    (
        StatusCode::UNAUTHORIZED,
        Json(TriggerResponse::failure("unauthorized")),
    )
        .into_response()
}
