use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::program::{parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{InputFormat, InputStatus};
use crate::models::{InputMetadata, InputRecord};

pub fn insert_input(conn: &Connection, input: &InputRecord) -> Result<(), DatabaseError> {
    let metadata_json = match &input.metadata {
        Some(meta) => Some(
            serde_json::to_string(meta)
                .map_err(|e| DatabaseError::InvalidStoredValue(e.to_string()))?,
        ),
        None => None,
    };

    conn.execute(
        "INSERT INTO inputs (id, program_id, format, filename, raw_content,
         normalized_content, metadata_json, status, error_message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            input.id.to_string(),
            input.program_id.to_string(),
            input.format.as_str(),
            input.filename,
            input.raw_content,
            input.normalized_content,
            metadata_json,
            input.status.as_str(),
            input.error_message,
            input.created_at.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_input(conn: &Connection, id: &Uuid) -> Result<Option<InputRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&select_sql("WHERE id = ?1"))?;
    let result = stmt.query_row(params![id.to_string()], row_to_parts);

    match result {
        Ok(parts) => Ok(Some(input_from_parts(parts)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_inputs_for_program(
    conn: &Connection,
    program_id: &Uuid,
) -> Result<Vec<InputRecord>, DatabaseError> {
    let mut stmt =
        conn.prepare(&select_sql("WHERE program_id = ?1 ORDER BY created_at DESC"))?;
    let rows = stmt.query_map(params![program_id.to_string()], row_to_parts)?;
    collect_inputs(rows)
}

/// Processed inputs of a program that have no signals yet. Falls back to all
/// processed inputs when everything has been analyzed already (re-analysis).
pub fn list_inputs_for_analysis(
    conn: &Connection,
    program_id: &Uuid,
) -> Result<Vec<InputRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&select_sql(
        "WHERE program_id = ?1 AND status = 'processed'
           AND id NOT IN (SELECT input_id FROM signals)
         ORDER BY created_at ASC",
    ))?;
    let rows = stmt.query_map(params![program_id.to_string()], row_to_parts)?;
    let unanalyzed = collect_inputs(rows)?;
    if !unanalyzed.is_empty() {
        return Ok(unanalyzed);
    }

    let mut stmt = conn.prepare(&select_sql(
        "WHERE program_id = ?1 AND status = 'processed' ORDER BY created_at ASC",
    ))?;
    let rows = stmt.query_map(params![program_id.to_string()], row_to_parts)?;
    collect_inputs(rows)
}

pub fn delete_input(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute("DELETE FROM inputs WHERE id = ?1", params![id.to_string()])?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Input".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn select_sql(suffix: &str) -> String {
    format!(
        "SELECT id, program_id, format, filename, raw_content, normalized_content,
         metadata_json, status, error_message, created_at
         FROM inputs {suffix}"
    )
}

type InputParts = (
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    String,
);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<InputParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn input_from_parts(parts: InputParts) -> Result<InputRecord, DatabaseError> {
    let (
        id,
        program_id,
        format,
        filename,
        raw_content,
        normalized_content,
        metadata_json,
        status,
        error_message,
        created_at,
    ) = parts;

    let metadata: Option<InputMetadata> = match metadata_json {
        Some(json) => Some(
            serde_json::from_str(&json)
                .map_err(|e| DatabaseError::InvalidStoredValue(e.to_string()))?,
        ),
        None => None,
    };

    Ok(InputRecord {
        id: parse_uuid(&id)?,
        program_id: parse_uuid(&program_id)?,
        format: InputFormat::from_str(&format)?,
        filename,
        raw_content,
        normalized_content,
        metadata,
        status: InputStatus::from_str(&status)?,
        error_message,
        created_at: parse_datetime(&created_at)?,
    })
}

fn collect_inputs(
    rows: impl Iterator<Item = rusqlite::Result<InputParts>>,
) -> Result<Vec<InputRecord>, DatabaseError> {
    let mut inputs = Vec::new();
    for row in rows {
        inputs.push(input_from_parts(row?)?);
    }
    Ok(inputs)
}
