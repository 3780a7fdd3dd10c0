use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token usage and estimated cost for one signal generation.
/// Created atomically with its parent signal, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostMetric {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub tokens_input: i64,
    pub tokens_output: i64,
    pub tokens_total: i64,
    pub estimated_cost_usd: f64,
    pub model_name: String,
    pub latency_ms: Option<i64>,
    pub created_at: NaiveDateTime,
}
