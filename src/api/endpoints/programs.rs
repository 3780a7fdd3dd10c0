//! Program CRUD endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::enums::ProgramStatus;
use crate::models::Program;

#[derive(Deserialize)]
pub struct ProgramCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ProgramUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProgramStatus>,
}

#[derive(Deserialize)]
pub struct ProgramListParams {
    pub status: Option<ProgramStatus>,
}

#[derive(Serialize)]
pub struct ProgramResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProgramStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub input_count: i64,
    pub signal_count: i64,
}

#[derive(Serialize)]
pub struct ProgramListResponse {
    pub programs: Vec<ProgramResponse>,
    pub total: usize,
}

fn to_response(
    conn: &rusqlite::Connection,
    program: Program,
) -> Result<ProgramResponse, ApiError> {
    let input_count = repository::count_program_inputs(conn, &program.id)?;
    let signal_count = repository::count_program_signals(conn, &program.id)?;
    Ok(ProgramResponse {
        id: program.id,
        name: program.name,
        description: program.description,
        status: program.status,
        created_at: program.created_at,
        updated_at: program.updated_at,
        input_count,
        signal_count,
    })
}

/// `GET /api/programs`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(params): Query<ProgramListParams>,
) -> Result<Json<ProgramListResponse>, ApiError> {
    let conn = ctx.conn()?;
    let programs = repository::list_programs(&conn, params.status)?;

    let mut responses = Vec::with_capacity(programs.len());
    for program in programs {
        responses.push(to_response(&conn, program)?);
    }
    let total = responses.len();
    Ok(Json(ProgramListResponse { programs: responses, total }))
}

/// `POST /api/programs`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(payload): Json<ProgramCreate>,
) -> Result<(StatusCode, Json<ProgramResponse>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Program name must not be empty".into()));
    }

    let now = chrono::Utc::now().naive_utc();
    let program = Program {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        description: payload.description,
        status: ProgramStatus::Active,
        created_at: now,
        updated_at: now,
    };

    let conn = ctx.conn()?;
    repository::insert_program(&conn, &program)?;
    tracing::info!(program_id = %program.id, name = %program.name, "Program created");

    Ok((StatusCode::CREATED, Json(to_response(&conn, program)?)))
}

/// `GET /api/programs/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgramResponse>, ApiError> {
    let conn = ctx.conn()?;
    let program = repository::get_program(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Program not found".into()))?;
    Ok(Json(to_response(&conn, program)?))
}

/// `PATCH /api/programs/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProgramUpdate>,
) -> Result<Json<ProgramResponse>, ApiError> {
    let conn = ctx.conn()?;
    let mut program = repository::get_program(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Program not found".into()))?;

    if let Some(name) = payload.name {
        program.name = name;
    }
    if let Some(description) = payload.description {
        program.description = Some(description);
    }
    if let Some(status) = payload.status {
        program.status = status;
    }
    program.updated_at = chrono::Utc::now().naive_utc();

    repository::update_program(&conn, &program)?;
    Ok(Json(to_response(&conn, program)?))
}

/// `DELETE /api/programs/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.conn()?;
    repository::delete_program(&conn, &id)?;
    tracing::info!(program_id = %id, "Program deleted");
    Ok(StatusCode::NO_CONTENT)
}
