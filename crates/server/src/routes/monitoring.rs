use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use lensprint::{MetricsReport, PredictionId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Validation request: the label a human confirmed for a prediction.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Correlation id returned by the match endpoint. When absent the most
    /// recently recorded prediction is confirmed instead.
    #[serde(default)]
    pub prediction_id: Option<PredictionId>,

    /// The confirmed (possibly corrected) class label
    pub true_label: String,
}

/// Validation response
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub status: String,
    pub message: String,
}

/// Report response: either the computed metrics or a no-data sentinel.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<MetricsReport>,
}

/// Confirm or correct a prediction and fold it into the rolling metrics.
pub async fn validate_prediction(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ValidateRequest>,
) -> ServerResult<impl IntoResponse> {
    if request.true_label.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "true_label must not be empty".to_string(),
        ));
    }

    let confirmed = match request.prediction_id {
        Some(id) => state.monitor.confirm(id, &request.true_label),
        None => state.monitor.confirm_latest(&request.true_label),
    };

    if !confirmed {
        return Ok(Json(ValidateResponse {
            status: "warning".to_string(),
            message: "no matching pending prediction to validate".to_string(),
        }));
    }

    // Refresh the persisted metrics after every validation.
    state.monitor.generate_report();

    Ok(Json(ValidateResponse {
        status: "success".to_string(),
        message: "prediction validated".to_string(),
    }))
}

/// Current rolling metrics over the validated window.
pub async fn metrics_report(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    match state.monitor.generate_report() {
        Some(report) => Ok(Json(ReportResponse {
            status: "ok".to_string(),
            report: Some(report),
        })),
        None => Ok(Json(ReportResponse {
            status: "no_data".to_string(),
            report: None,
        })),
    }
}
