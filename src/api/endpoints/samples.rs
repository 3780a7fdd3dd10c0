//! Sample data endpoints — serve the bundled demo program files.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct SampleFile {
    pub name: String,
    pub path: String,
}

#[derive(Serialize)]
pub struct SampleListResponse {
    pub samples: BTreeMap<String, Vec<SampleFile>>,
}

#[derive(Serialize)]
pub struct SampleContentResponse {
    pub filename: String,
    pub content: String,
}

/// `GET /api/samples` — sample files grouped by program directory.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<SampleListResponse>, ApiError> {
    let root = &ctx.settings.sample_data_dir;
    if !root.is_dir() {
        return Err(ApiError::NotFound("Sample data directory not found".into()));
    }

    let mut samples = BTreeMap::new();
    let entries = std::fs::read_dir(root)
        .map_err(|e| ApiError::Internal(format!("Sample data directory: {e}")))?;

    for entry in entries.flatten() {
        let dir_name = entry.file_name().to_string_lossy().to_string();
        if !entry.path().is_dir() || !dir_name.starts_with("program_") {
            continue;
        }

        let mut files = Vec::new();
        if let Ok(dir_entries) = std::fs::read_dir(entry.path()) {
            for file in dir_entries.flatten() {
                let file_name = file.file_name().to_string_lossy().to_string();
                if file.path().is_file() && !file_name.starts_with('.') {
                    files.push(SampleFile {
                        path: format!("{dir_name}/{file_name}"),
                        name: file_name,
                    });
                }
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        samples.insert(dir_name, files);
    }

    Ok(Json(SampleListResponse { samples }))
}

/// `GET /api/samples/:program/:file`
pub async fn content(
    State(ctx): State<ApiContext>,
    Path((program_name, filename)): Path<(String, String)>,
) -> Result<Json<SampleContentResponse>, ApiError> {
    // Reject path traversal before touching the filesystem
    if program_name.contains(['/', '\\', '\0']) || filename.contains(['/', '\\', '\0'])
        || program_name.contains("..") || filename.contains("..")
    {
        return Err(ApiError::BadRequest("Invalid sample path".into()));
    }

    let path = ctx.settings.sample_data_dir.join(&program_name).join(&filename);
    if !path.is_file() {
        return Err(ApiError::NotFound("Sample file not found".into()));
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| ApiError::Internal(format!("Error reading sample file: {e}")))?;

    Ok(Json(SampleContentResponse { filename, content }))
}
