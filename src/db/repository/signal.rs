use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::program::{parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{SignalStatus, SignalType};
use crate::models::{CostMetric, Signal};

/// Optional filters for signal listings.
#[derive(Debug, Clone, Default)]
pub struct SignalFilter {
    pub program_id: Option<Uuid>,
    pub signal_type: Option<SignalType>,
    pub signal_value: Option<String>,
}

/// Persist a signal and its cost metric as one atomic unit — both rows
/// commit together or neither does.
pub fn insert_signal_with_cost(
    conn: &Connection,
    signal: &Signal,
    cost: &CostMetric,
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO signals (id, input_id, program_id, signal_type, signal_value,
         confidence_score, explanation, model_used, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            signal.id.to_string(),
            signal.input_id.to_string(),
            signal.program_id.to_string(),
            signal.signal_type.as_str(),
            signal.signal_value,
            signal.confidence_score,
            signal.explanation,
            signal.model_used,
            signal.status.as_str(),
            signal.created_at.to_string(),
        ],
    )?;

    tx.execute(
        "INSERT INTO cost_metrics (id, signal_id, tokens_input, tokens_output,
         tokens_total, estimated_cost_usd, model_name, latency_ms, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            cost.id.to_string(),
            cost.signal_id.to_string(),
            cost.tokens_input,
            cost.tokens_output,
            cost.tokens_total,
            cost.estimated_cost_usd,
            cost.model_name,
            cost.latency_ms,
            cost.created_at.to_string(),
        ],
    )?;

    tx.commit()?;
    Ok(())
}

pub fn get_signal(conn: &Connection, id: &Uuid) -> Result<Option<Signal>, DatabaseError> {
    let mut stmt = conn.prepare(&select_sql("WHERE id = ?1"))?;
    let result = stmt.query_row(params![id.to_string()], row_to_parts);

    match result {
        Ok(parts) => Ok(Some(signal_from_parts(parts)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_signals(
    conn: &Connection,
    filter: &SignalFilter,
) -> Result<Vec<Signal>, DatabaseError> {
    let mut stmt = conn.prepare(&select_sql(
        "WHERE (?1 IS NULL OR program_id = ?1)
           AND (?2 IS NULL OR signal_type = ?2)
           AND (?3 IS NULL OR signal_value = ?3)
         ORDER BY created_at DESC",
    ))?;

    let rows = stmt.query_map(
        params![
            filter.program_id.map(|id| id.to_string()),
            filter.signal_type.map(|t| t.as_str()),
            filter.signal_value.as_deref(),
        ],
        row_to_parts,
    )?;

    let mut signals = Vec::new();
    for row in rows {
        signals.push(signal_from_parts(row?)?);
    }
    Ok(signals)
}

/// One-way status transition to `overridden`.
pub fn mark_signal_overridden(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE signals SET status = ?2 WHERE id = ?1",
        params![id.to_string(), SignalStatus::Overridden.as_str()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Signal".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn select_sql(suffix: &str) -> String {
    format!(
        "SELECT id, input_id, program_id, signal_type, signal_value, confidence_score,
         explanation, model_used, status, created_at
         FROM signals {suffix}"
    )
}

type SignalParts = (
    String,
    String,
    String,
    String,
    String,
    f64,
    String,
    Option<String>,
    String,
    String,
);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<SignalParts> {
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

fn signal_from_parts(parts: SignalParts) -> Result<Signal, DatabaseError> {
    let (
        id,
        input_id,
        program_id,
        signal_type,
        signal_value,
        confidence_score,
        explanation,
        model_used,
        status,
        created_at,
    ) = parts;

    Ok(Signal {
        id: parse_uuid(&id)?,
        input_id: parse_uuid(&input_id)?,
        program_id: parse_uuid(&program_id)?,
        signal_type: SignalType::from_str(&signal_type)?,
        signal_value,
        confidence_score,
        explanation,
        model_used,
        status: SignalStatus::from_str(&status)?,
        created_at: parse_datetime(&created_at)?,
    })
}
