use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::ProgramStatus;
use crate::models::Program;

pub fn insert_program(conn: &Connection, program: &Program) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO programs (id, name, description, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            program.id.to_string(),
            program.name,
            program.description,
            program.status.as_str(),
            program.created_at.to_string(),
            program.updated_at.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_program(conn: &Connection, id: &Uuid) -> Result<Option<Program>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, status, created_at, updated_at
         FROM programs WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], row_to_parts);

    match result {
        Ok(parts) => Ok(Some(program_from_parts(parts)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_programs(
    conn: &Connection,
    status: Option<ProgramStatus>,
) -> Result<Vec<Program>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, status, created_at, updated_at
         FROM programs
         WHERE (?1 IS NULL OR status = ?1)
         ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![status.map(|s| s.as_str())], row_to_parts)?;

    let mut programs = Vec::new();
    for row in rows {
        programs.push(program_from_parts(row?)?);
    }
    Ok(programs)
}

pub fn update_program(conn: &Connection, program: &Program) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE programs SET name = ?2, description = ?3, status = ?4, updated_at = ?5
         WHERE id = ?1",
        params![
            program.id.to_string(),
            program.name,
            program.description,
            program.status.as_str(),
            program.updated_at.to_string(),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Program".into(),
            id: program.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_program(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute("DELETE FROM programs WHERE id = ?1", params![id.to_string()])?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Program".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn count_program_inputs(conn: &Connection, program_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM inputs WHERE program_id = ?1",
        params![program_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_program_signals(conn: &Connection, program_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM signals WHERE program_id = ?1",
        params![program_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

type ProgramParts = (String, String, Option<String>, String, String, String);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgramParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn program_from_parts(parts: ProgramParts) -> Result<Program, DatabaseError> {
    let (id, name, description, status, created_at, updated_at) = parts;
    Ok(Program {
        id: parse_uuid(&id)?,
        name,
        description,
        status: ProgramStatus::from_str(&status)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::from_str(value)
        .map_err(|_| DatabaseError::InvalidStoredValue(format!("bad uuid: {value}")))
}

pub(crate) fn parse_datetime(value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::from_str(value)
        .map_err(|_| DatabaseError::InvalidStoredValue(format!("bad timestamp: {value}")))
}
