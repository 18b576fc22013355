//! API route handlers
//!
//! - `health`: liveness and readiness checks
//! - `matching`: embedding match queries
//! - `monitoring`: prediction validation and metrics reports

pub mod health;
pub mod matching;
pub mod monitoring;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /)
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Lensprint Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/match",
            "/api/v1/validate",
            "/api/v1/report",
            "/health",
            "/ready"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
