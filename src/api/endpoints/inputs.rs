//! Input ingestion endpoints: file upload and manual analyst text.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::enums::{InputFormat, InputStatus};
use crate::models::InputRecord;
use crate::pipeline::InputNormalizer;

#[derive(Deserialize)]
pub struct ManualInputCreate {
    pub content: String,
}

/// `GET /api/inputs/program/:id`
pub async fn list_for_program(
    State(ctx): State<ApiContext>,
    Path(program_id): Path<Uuid>,
) -> Result<Json<Vec<InputRecord>>, ApiError> {
    let conn = ctx.conn()?;
    repository::get_program(&conn, &program_id)?
        .ok_or_else(|| ApiError::NotFound("Program not found".into()))?;
    Ok(Json(repository::list_inputs_for_program(&conn, &program_id)?))
}

/// `POST /api/inputs/program/:id/upload` — multipart file upload.
///
/// Accepts `.csv`, `.txt`, and text-bearing `.pdf` (pre-extracted text).
pub async fn upload(
    State(ctx): State<ApiContext>,
    Path(program_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<InputRecord>), ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("unknown").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Error reading file: {e}")))?;
            file = Some((filename, bytes.to_vec()));
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field in upload".into()))?;

    let format = format_from_filename(&filename)?;
    let raw_content = String::from_utf8(bytes).map_err(|_| match format {
        InputFormat::Pdf => ApiError::BadRequest(
            "Binary PDF uploads are not supported; submit the extracted text instead".into(),
        ),
        _ => ApiError::BadRequest("File is not valid UTF-8 text".into()),
    })?;

    store_input(&ctx, program_id, format, Some(filename), raw_content)
}

/// `POST /api/inputs/program/:id/manual` — typed analyst text.
pub async fn create_manual(
    State(ctx): State<ApiContext>,
    Path(program_id): Path<Uuid>,
    Json(payload): Json<ManualInputCreate>,
) -> Result<(StatusCode, Json<InputRecord>), ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Input content must not be empty".into()));
    }
    store_input(&ctx, program_id, InputFormat::Manual, None, payload.content)
}

/// `GET /api/inputs/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<InputRecord>, ApiError> {
    let conn = ctx.conn()?;
    let input = repository::get_input(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Input not found".into()))?;
    Ok(Json(input))
}

/// `DELETE /api/inputs/:id` — removes the input, its signals, and its
/// retrieval chunks (cascade).
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.conn()?;
    repository::delete_input(&conn, &id)?;
    tracing::info!(input_id = %id, "Input deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn format_from_filename(filename: &str) -> Result<InputFormat, ApiError> {
    let lowered = filename.to_lowercase();
    if lowered.ends_with(".csv") {
        Ok(InputFormat::Csv)
    } else if lowered.ends_with(".txt") {
        Ok(InputFormat::Txt)
    } else if lowered.ends_with(".pdf") {
        Ok(InputFormat::Pdf)
    } else {
        Err(ApiError::BadRequest(
            "Unsupported file type. Only CSV, TXT, and extracted-text PDF files are accepted"
                .into(),
        ))
    }
}

fn store_input(
    ctx: &ApiContext,
    program_id: Uuid,
    format: InputFormat,
    filename: Option<String>,
    raw_content: String,
) -> Result<(StatusCode, Json<InputRecord>), ApiError> {
    let conn = ctx.conn()?;
    repository::get_program(&conn, &program_id)?
        .ok_or_else(|| ApiError::NotFound("Program not found".into()))?;

    let (normalized, metadata) =
        InputNormalizer::new().normalize(&raw_content, format, filename.as_deref());

    let input = InputRecord {
        id: Uuid::new_v4(),
        program_id,
        format,
        filename,
        raw_content,
        normalized_content: Some(normalized),
        metadata: Some(metadata),
        status: InputStatus::Processed,
        error_message: None,
        created_at: chrono::Utc::now().naive_utc(),
    };

    repository::insert_input(&conn, &input)?;

    // Index for retrieval; indexing failures never block ingestion
    if let Some(retriever) = &ctx.retriever {
        if let Err(e) = retriever.index_input(&conn, &input) {
            tracing::warn!(input_id = %input.id, error = %e, "Retrieval indexing failed");
        }
    }

    tracing::info!(
        input_id = %input.id,
        program_id = %program_id,
        format = format.as_str(),
        "Input ingested"
    );
    Ok((StatusCode::CREATED, Json(input)))
}
