//! Signal listing and generation endpoints.
//!
//! Analysis endpoints always return however many signals were produced —
//! degraded fallback or best-effort generations included. Only missing
//! entities and persistence faults surface as request errors.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{self, SignalFilter};
use crate::models::enums::SignalType;
use crate::models::{AnalystOverride, CostMetric, InputRecord, Signal};

#[derive(Deserialize)]
pub struct SignalListParams {
    pub program_id: Option<Uuid>,
    pub signal_type: Option<SignalType>,
    pub signal_value: Option<String>,
}

#[derive(Serialize)]
pub struct SignalResponse {
    #[serde(flatten)]
    pub signal: Signal,
    pub cost_metric: Option<CostMetric>,
    pub current_override: Option<AnalystOverride>,
}

#[derive(Serialize)]
pub struct SignalListResponse {
    pub signals: Vec<SignalResponse>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub signals_generated: usize,
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub signals: Vec<SignalResponse>,
}

fn to_response(
    conn: &rusqlite::Connection,
    signal: Signal,
) -> Result<SignalResponse, ApiError> {
    let cost_metric = repository::cost_for_signal(conn, &signal.id)?;
    let current_override = repository::latest_override_for_signal(conn, &signal.id)?;
    Ok(SignalResponse { signal, cost_metric, current_override })
}

fn to_analysis_response(
    conn: &rusqlite::Connection,
    signals: Vec<Signal>,
) -> Result<AnalysisResponse, ApiError> {
    let mut responses = Vec::with_capacity(signals.len());
    for signal in signals {
        responses.push(to_response(conn, signal)?);
    }

    let total_tokens = responses
        .iter()
        .filter_map(|r| r.cost_metric.as_ref())
        .map(|c| c.tokens_total)
        .sum();
    let total_cost_usd = responses
        .iter()
        .filter_map(|r| r.cost_metric.as_ref())
        .map(|c| c.estimated_cost_usd)
        .sum();

    Ok(AnalysisResponse {
        signals_generated: responses.len(),
        total_tokens,
        total_cost_usd,
        signals: responses,
    })
}

/// `GET /api/signals`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(params): Query<SignalListParams>,
) -> Result<Json<SignalListResponse>, ApiError> {
    let conn = ctx.conn()?;
    let filter = SignalFilter {
        program_id: params.program_id,
        signal_type: params.signal_type,
        signal_value: params.signal_value,
    };
    let signals = repository::list_signals(&conn, &filter)?;

    let mut responses = Vec::with_capacity(signals.len());
    for signal in signals {
        responses.push(to_response(&conn, signal)?);
    }
    let total = responses.len();
    Ok(Json(SignalListResponse { signals: responses, total }))
}

/// `GET /api/signals/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<SignalResponse>, ApiError> {
    let conn = ctx.conn()?;
    let signal = repository::get_signal(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Signal not found".into()))?;
    Ok(Json(to_response(&conn, signal)?))
}

/// `POST /api/signals/analyze/input/:id` — generate signals for one input.
pub async fn analyze_input(
    State(ctx): State<ApiContext>,
    Path(input_id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let input: InputRecord = {
        let conn = ctx.conn()?;
        repository::get_input(&conn, &input_id)?
            .ok_or_else(|| ApiError::NotFound("Input not found".into()))?
    };

    let signals = ctx.engine.analyze_input(&ctx.db, &input).await?;

    let conn = ctx.conn()?;
    Ok(Json(to_analysis_response(&conn, signals)?))
}

/// `POST /api/signals/analyze/program/:id` — generate signals for all
/// processed inputs of a program that need analysis.
pub async fn analyze_program(
    State(ctx): State<ApiContext>,
    Path(program_id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let inputs: Vec<InputRecord> = {
        let conn = ctx.conn()?;
        repository::get_program(&conn, &program_id)?
            .ok_or_else(|| ApiError::NotFound("Program not found".into()))?;
        repository::list_inputs_for_analysis(&conn, &program_id)?
    };

    let mut signals = Vec::new();
    for input in &inputs {
        signals.extend(ctx.engine.analyze_input(&ctx.db, input).await?);
    }

    let conn = ctx.conn()?;
    Ok(Json(to_analysis_response(&conn, signals)?))
}
