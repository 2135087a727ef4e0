//! Health check handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub annotator: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Liveness check. Always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: omnyla_common::VERSION.to_string(),
    })
}

/// Readiness check. A missing annotator still serves fallback results,
/// so it reports `degraded` rather than failing the check.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = Instant::now();
    let available = state.pipeline.annotator_available().await;

    let annotator = CheckResult {
        status: if available { "up" } else { "down" }.to_string(),
        provider: state.pipeline.annotator_name().to_string(),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    Json(ReadyResponse {
        status: if available { "ready" } else { "degraded" }.to_string(),
        checks: HealthChecks { annotator },
    })
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
