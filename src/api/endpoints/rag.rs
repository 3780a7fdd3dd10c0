//! Retrieval subsystem status and index management.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::pipeline::rag::SqliteContextRetriever;

#[derive(Serialize)]
pub struct RagStatusResponse {
    pub status: &'static str,
    pub total_chunks: i64,
    pub embedding_model: &'static str,
}

#[derive(Serialize)]
pub struct ReindexResponse {
    pub program_id: Uuid,
    pub inputs_processed: usize,
    pub chunks_stored: usize,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub program_id: Uuid,
    pub chunks_removed: usize,
}

fn retriever(ctx: &ApiContext) -> Result<Arc<SqliteContextRetriever>, ApiError> {
    ctx.retriever
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Context retrieval is disabled".into()))
}

/// `GET /api/rag/status`
pub async fn status(State(ctx): State<ApiContext>) -> Result<Json<RagStatusResponse>, ApiError> {
    match &ctx.retriever {
        Some(retriever) => {
            let conn = ctx.conn()?;
            Ok(Json(RagStatusResponse {
                status: "available",
                total_chunks: retriever.chunk_count(&conn)?,
                embedding_model: "hashing-256",
            }))
        }
        None => Ok(Json(RagStatusResponse {
            status: "unavailable",
            total_chunks: 0,
            embedding_model: "none",
        })),
    }
}

/// `POST /api/rag/reindex/:program_id` — rebuild the chunk index for all of
/// a program's inputs.
pub async fn reindex(
    State(ctx): State<ApiContext>,
    Path(program_id): Path<Uuid>,
) -> Result<Json<ReindexResponse>, ApiError> {
    let retriever = retriever(&ctx)?;
    let conn = ctx.conn()?;
    repository::get_program(&conn, &program_id)?
        .ok_or_else(|| ApiError::NotFound("Program not found".into()))?;

    let inputs = repository::list_inputs_for_program(&conn, &program_id)?;
    let mut chunks_stored = 0;
    for input in &inputs {
        chunks_stored += retriever.index_input(&conn, input)?;
    }

    tracing::info!(program_id = %program_id, inputs = inputs.len(), chunks_stored, "Program reindexed");
    Ok(Json(ReindexResponse {
        program_id,
        inputs_processed: inputs.len(),
        chunks_stored,
    }))
}

/// `DELETE /api/rag/clear/:program_id`
pub async fn clear(
    State(ctx): State<ApiContext>,
    Path(program_id): Path<Uuid>,
) -> Result<Json<ClearResponse>, ApiError> {
    let retriever = retriever(&ctx)?;
    let conn = ctx.conn()?;
    let chunks_removed = retriever.clear_program(&conn, &program_id)?;
    Ok(Json(ClearResponse { program_id, chunks_removed }))
}
