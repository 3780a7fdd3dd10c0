//! Human-in-the-loop override endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::{AnalystOverride, MIN_JUSTIFICATION_CHARS};

#[derive(Deserialize)]
pub struct OverrideCreate {
    pub override_value: String,
    pub justification: String,
    pub analyst_name: String,
}

#[derive(Deserialize)]
pub struct OverrideListParams {
    pub program_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct OverrideListResponse {
    pub overrides: Vec<AnalystOverride>,
    pub total: usize,
}

/// `POST /api/overrides/signal/:id` — record an override and flip the
/// signal's status to `overridden`.
pub async fn create(
    State(ctx): State<ApiContext>,
    Path(signal_id): Path<Uuid>,
    Json(payload): Json<OverrideCreate>,
) -> Result<(StatusCode, Json<AnalystOverride>), ApiError> {
    if payload.justification.trim().chars().count() < MIN_JUSTIFICATION_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Justification must be at least {MIN_JUSTIFICATION_CHARS} characters"
        )));
    }
    if payload.override_value.trim().is_empty() {
        return Err(ApiError::BadRequest("Override value must not be empty".into()));
    }
    if payload.analyst_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Analyst name must not be empty".into()));
    }

    let conn = ctx.conn()?;
    let signal = repository::get_signal(&conn, &signal_id)?
        .ok_or_else(|| ApiError::NotFound("Signal not found".into()))?;

    let entry = AnalystOverride {
        id: Uuid::new_v4(),
        signal_id,
        original_value: signal.signal_value.clone(),
        override_value: payload.override_value.trim().to_string(),
        justification: payload.justification.trim().to_string(),
        analyst_name: payload.analyst_name.trim().to_string(),
        created_at: chrono::Utc::now().naive_utc(),
    };

    repository::insert_override(&conn, &entry)?;
    tracing::info!(
        signal_id = %signal_id,
        original = %entry.original_value,
        replacement = %entry.override_value,
        analyst = %entry.analyst_name,
        "Signal overridden"
    );

    Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /api/overrides/signal/:id`
pub async fn list_for_signal(
    State(ctx): State<ApiContext>,
    Path(signal_id): Path<Uuid>,
) -> Result<Json<OverrideListResponse>, ApiError> {
    let conn = ctx.conn()?;
    repository::get_signal(&conn, &signal_id)?
        .ok_or_else(|| ApiError::NotFound("Signal not found".into()))?;

    let overrides = repository::list_overrides_for_signal(&conn, &signal_id)?;
    let total = overrides.len();
    Ok(Json(OverrideListResponse { overrides, total }))
}

/// `GET /api/overrides`
pub async fn list_all(
    State(ctx): State<ApiContext>,
    Query(params): Query<OverrideListParams>,
) -> Result<Json<OverrideListResponse>, ApiError> {
    let conn = ctx.conn()?;
    let overrides = repository::list_overrides(&conn, params.program_id.as_ref())?;
    let total = overrides.len();
    Ok(Json(OverrideListResponse { overrides, total }))
}
