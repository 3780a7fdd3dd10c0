use rusqlite::{params, Connection};
use serde::Serialize;
use uuid::Uuid;

use super::program::{parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::CostMetric;

/// Aggregated cost roll-up across all signal generations.
#[derive(Debug, Clone, Serialize)]
pub struct CostSummary {
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub total_signals: i64,
    pub avg_cost_per_signal: f64,
    pub avg_tokens_per_signal: i64,
    pub model_breakdown: Vec<ModelUsage>,
}

/// Per-model slice of the roll-up.
#[derive(Debug, Clone, Serialize)]
pub struct ModelUsage {
    pub model_name: String,
    pub invocations: i64,
    pub tokens: i64,
    pub cost_usd: f64,
}

pub fn cost_summary(
    conn: &Connection,
    program_id: Option<&Uuid>,
) -> Result<CostSummary, DatabaseError> {
    let program_param = program_id.map(|id| id.to_string());

    let (total_signals, total_tokens, total_cost): (i64, i64, f64) = conn.query_row(
        "SELECT COUNT(c.id), COALESCE(SUM(c.tokens_total), 0), COALESCE(SUM(c.estimated_cost_usd), 0.0)
         FROM cost_metrics c
         JOIN signals s ON s.id = c.signal_id
         WHERE (?1 IS NULL OR s.program_id = ?1)",
        params![program_param],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT c.model_name, COUNT(c.id), COALESCE(SUM(c.tokens_total), 0),
                COALESCE(SUM(c.estimated_cost_usd), 0.0)
         FROM cost_metrics c
         JOIN signals s ON s.id = c.signal_id
         WHERE (?1 IS NULL OR s.program_id = ?1)
         GROUP BY c.model_name
         ORDER BY c.model_name",
    )?;

    let rows = stmt.query_map(params![program_param], |row| {
        Ok(ModelUsage {
            model_name: row.get(0)?,
            invocations: row.get(1)?,
            tokens: row.get(2)?,
            cost_usd: row.get(3)?,
        })
    })?;

    let mut model_breakdown = Vec::new();
    for row in rows {
        model_breakdown.push(row?);
    }

    tracing::info!(
        program_id = ?program_id,
        total_signals,
        total_cost_usd = total_cost,
        "Generated cost summary"
    );

    Ok(CostSummary {
        total_tokens,
        total_cost_usd: round6(total_cost),
        total_signals,
        avg_cost_per_signal: if total_signals > 0 {
            round6(total_cost / total_signals as f64)
        } else {
            0.0
        },
        avg_tokens_per_signal: if total_signals > 0 {
            total_tokens / total_signals
        } else {
            0
        },
        model_breakdown,
    })
}

pub fn recent_costs(
    conn: &Connection,
    limit: usize,
    program_id: Option<&Uuid>,
) -> Result<Vec<CostMetric>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.signal_id, c.tokens_input, c.tokens_output, c.tokens_total,
                c.estimated_cost_usd, c.model_name, c.latency_ms, c.created_at
         FROM cost_metrics c
         JOIN signals s ON s.id = c.signal_id
         WHERE (?1 IS NULL OR s.program_id = ?1)
         ORDER BY c.created_at DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(
        params![program_id.map(|id| id.to_string()), limit as i64],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<i64>>(7)?,
                row.get::<_, String>(8)?,
            ))
        },
    )?;

    let mut metrics = Vec::new();
    for row in rows {
        let (id, signal_id, tokens_input, tokens_output, tokens_total, cost, model, latency, created) =
            row?;
        metrics.push(CostMetric {
            id: parse_uuid(&id)?,
            signal_id: parse_uuid(&signal_id)?,
            tokens_input,
            tokens_output,
            tokens_total,
            estimated_cost_usd: cost,
            model_name: model,
            latency_ms: latency,
            created_at: parse_datetime(&created)?,
        });
    }
    Ok(metrics)
}

pub fn cost_for_signal(
    conn: &Connection,
    signal_id: &Uuid,
) -> Result<Option<CostMetric>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, signal_id, tokens_input, tokens_output, tokens_total,
                estimated_cost_usd, model_name, latency_ms, created_at
         FROM cost_metrics WHERE signal_id = ?1",
    )?;

    let result = stmt.query_row(params![signal_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, f64>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, Option<i64>>(7)?,
            row.get::<_, String>(8)?,
        ))
    });

    match result {
        Ok((id, sid, tin, tout, ttotal, cost, model, latency, created)) => Ok(Some(CostMetric {
            id: parse_uuid(&id)?,
            signal_id: parse_uuid(&sid)?,
            tokens_input: tin,
            tokens_output: tout,
            tokens_total: ttotal,
            estimated_cost_usd: cost,
            model_name: model,
            latency_ms: latency,
            created_at: parse_datetime(&created)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
