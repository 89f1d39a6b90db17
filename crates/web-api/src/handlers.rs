use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::response::{respond, TriggerResponse};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchUpRequest {
    pub report_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetryParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Liveness check; not gated.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

/// Primary purchase run for the latest report.
pub async fn purchase(State(state): State<AppState>) -> (StatusCode, Json<TriggerResponse>) {
    info!("Purchase run triggered");
    respond(state.desk.purchase().await)
}

/// Catch-up run. The body is optional; without it the latest report is used.
pub async fn catch_up(
    State(state): State<AppState>,
    body: Option<Json<CatchUpRequest>>,
) -> (StatusCode, Json<TriggerResponse>) {
    let report_id = body.and_then(|Json(req)| req.report_id);
    info!(?report_id, "Catch-up run triggered");
    respond(state.desk.catch_up(report_id).await)
}

pub async fn retry_spreads(
    State(state): State<AppState>,
    Query(params): Query<RetryParams>,
) -> (StatusCode, Json<TriggerResponse>) {
    info!(force = params.force, "Spread retry triggered");
    respond(state.desk.retry_spreads(params.force).await)
}
