//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    /// LLM-backed stages fail until a key is configured
    llm_configured: bool,
}

/// GET /health - Liveness and LLM configuration status
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        llm_configured: state.llm.is_some(),
    })
}
