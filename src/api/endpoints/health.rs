//! Health and connectivity endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::gateway::ProbeResult;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_mode: &'static str,
    pub model: String,
}

/// `GET /api/health` — service status and configured LLM mode.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        llm_mode: if ctx.settings.demo_mode() { "fallback-demo" } else { "real" },
        model: ctx.settings.model.clone(),
    }))
}

/// `GET /api/health/llm` — classify reachability of the remote endpoint.
pub async fn llm_probe(State(ctx): State<ApiContext>) -> Result<Json<ProbeResult>, ApiError> {
    Ok(Json(ctx.gateway.probe().await))
}
