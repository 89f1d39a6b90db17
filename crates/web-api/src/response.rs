//! Uniform JSON envelope for trigger results.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use trade_desk_execution::{ExecutionError, RunOutcome};

/// `{success, data?, error?, skipped?, reason?}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TriggerResponse {
    #[must_use]
    pub fn completed(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            skipped: None,
            reason: None,
        }
    }

    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            skipped: Some(true),
            reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            skipped: None,
            reason: None,
        }
    }
}

/// Maps a run result onto a status code and envelope.
///
/// Gate no-ops are successes; validation failures are 422; everything else
/// that failed is 500.
pub fn respond<T: Serialize>(
    result: Result<RunOutcome<T>, ExecutionError>,
) -> (StatusCode, Json<TriggerResponse>) {
    match result {
        Ok(RunOutcome::Completed(summary)) => match serde_json::to_value(&summary) {
            Ok(data) => (StatusCode::OK, Json(TriggerResponse::completed(data))),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse::failure(format!("failed to encode result: {e}"))),
            ),
        },
        Ok(RunOutcome::Skipped { reason }) => (StatusCode::OK, Json(TriggerResponse::skipped(reason))),
        Err(e) if e.is_validation() => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(TriggerResponse::failure(e.to_string())),
        ),
        Err(e) => {
            error!(error = %e, "Trigger run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse::failure(e.to_string())),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skipped_envelope() {
        let value = serde_json::to_value(TriggerResponse::skipped("market closed")).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "skipped": true, "reason": "market closed"})
        );
    }

    #[test]
    fn test_failure_envelope() {
        let value = serde_json::to_value(TriggerResponse::failure("unauthorized")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "unauthorized"}));
    }

    #[test]
    fn test_status_mapping() {
        let (status, body) = respond::<Value>(Ok(RunOutcome::Completed(json!({"n": 1}))));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0.data, Some(json!({"n": 1})));

        let (status, _) = respond::<Value>(Err(ExecutionError::Payload("bad".into())));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
