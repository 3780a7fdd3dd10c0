use rusqlite::{params, Connection};
use uuid::Uuid;

use super::program::{parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::AnalystOverride;

/// Record an override and flip the parent signal to `overridden`, atomically.
pub fn insert_override(
    conn: &Connection,
    entry: &AnalystOverride,
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO analyst_overrides (id, signal_id, original_value, override_value,
         justification, analyst_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id.to_string(),
            entry.signal_id.to_string(),
            entry.original_value,
            entry.override_value,
            entry.justification,
            entry.analyst_name,
            entry.created_at.to_string(),
        ],
    )?;

    tx.execute(
        "UPDATE signals SET status = 'overridden' WHERE id = ?1",
        params![entry.signal_id.to_string()],
    )?;

    tx.commit()?;
    Ok(())
}

pub fn list_overrides_for_signal(
    conn: &Connection,
    signal_id: &Uuid,
) -> Result<Vec<AnalystOverride>, DatabaseError> {
    let mut stmt = conn.prepare(&select_sql(
        "WHERE o.signal_id = ?1 ORDER BY o.created_at DESC, o.rowid DESC",
    ))?;
    let rows = stmt.query_map(params![signal_id.to_string()], row_to_parts)?;
    collect(rows)
}

/// All overrides, newest first, optionally scoped to one program.
pub fn list_overrides(
    conn: &Connection,
    program_id: Option<&Uuid>,
) -> Result<Vec<AnalystOverride>, DatabaseError> {
    let mut stmt = conn.prepare(&select_sql(
        "JOIN signals s ON s.id = o.signal_id
         WHERE (?1 IS NULL OR s.program_id = ?1)
         ORDER BY o.created_at DESC, o.rowid DESC",
    ))?;
    let rows = stmt.query_map(params![program_id.map(|id| id.to_string())], row_to_parts)?;
    collect(rows)
}

/// The current override is the most recently created one.
pub fn latest_override_for_signal(
    conn: &Connection,
    signal_id: &Uuid,
) -> Result<Option<AnalystOverride>, DatabaseError> {
    Ok(list_overrides_for_signal(conn, signal_id)?.into_iter().next())
}

fn select_sql(suffix: &str) -> String {
    format!(
        "SELECT o.id, o.signal_id, o.original_value, o.override_value, o.justification,
         o.analyst_name, o.created_at
         FROM analyst_overrides o {suffix}"
    )
}

type OverrideParts = (String, String, String, String, String, String, String);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<OverrideParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<OverrideParts>>,
) -> Result<Vec<AnalystOverride>, DatabaseError> {
    let mut entries = Vec::new();
    for row in rows {
        let (id, signal_id, original, replacement, justification, analyst, created) = row?;
        entries.push(AnalystOverride {
            id: parse_uuid(&id)?,
            signal_id: parse_uuid(&signal_id)?,
            original_value: original,
            override_value: replacement,
            justification,
            analyst_name: analyst,
            created_at: parse_datetime(&created)?,
        });
    }
    Ok(entries)
}
