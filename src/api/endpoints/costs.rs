//! Cost transparency endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{self, CostSummary};
use crate::models::CostMetric;

const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Deserialize)]
pub struct CostParams {
    pub program_id: Option<Uuid>,
    pub limit: Option<usize>,
}

/// `GET /api/costs/summary`
pub async fn summary(
    State(ctx): State<ApiContext>,
    Query(params): Query<CostParams>,
) -> Result<Json<CostSummary>, ApiError> {
    let conn = ctx.conn()?;
    Ok(Json(repository::cost_summary(&conn, params.program_id.as_ref())?))
}

/// `GET /api/costs/recent`
pub async fn recent(
    State(ctx): State<ApiContext>,
    Query(params): Query<CostParams>,
) -> Result<Json<Vec<CostMetric>>, ApiError> {
    let conn = ctx.conn()?;
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(repository::recent_costs(&conn, limit, params.program_id.as_ref())?))
}
