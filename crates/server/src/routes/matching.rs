use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use lensprint::{Embedding, PredictionDraft, PredictionId, RankedMatch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Match request: a query embedding produced by the caller's model.
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    /// Query embedding, length D (must equal the reference dimension)
    pub embedding: Vec<f32>,

    /// Maximum number of ranked guesses to return
    #[serde(default)]
    pub k: Option<usize>,
}

/// Match response
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    /// Ranked guesses, similarity descending
    pub matches: Vec<RankedMatch>,

    /// Correlation id for `/api/v1/validate`; absent when the prediction
    /// record was dropped by the monitor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<PredictionId>,

    /// Seconds spent ranking this query
    pub processing_time: f64,
}

/// Rank the reference catalog against a query embedding.
///
/// Returns the top-k classes by cosine similarity and records the best guess
/// with the prediction monitor so a human can later confirm or correct it via
/// the returned `prediction_id`.
pub async fn match_embedding(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<MatchRequest>,
) -> ServerResult<impl IntoResponse> {
    let start = Instant::now();

    let query = Embedding::new(request.embedding)?;
    let k = request.k.unwrap_or(state.config.matching.top_k);
    let matches = state.matcher.match_embedding(&query, k)?;

    let processing_time = start.elapsed().as_secs_f64();

    // Best-effort telemetry: a dropped record never fails the match itself.
    let (predicted_label, confidence) = match matches.first() {
        Some(best) => (best.class_label.clone(), best.similarity as f64),
        None => ("unknown".to_string(), 0.0),
    };
    let prediction_id = state.monitor.record_prediction(PredictionDraft {
        timestamp: Utc::now(),
        predicted_label,
        confidence,
        processing_time,
        embedding: Some(query.into_vec()),
        original_prediction: None,
    });

    Ok(Json(MatchResponse {
        matches,
        prediction_id,
        processing_time,
    }))
}
