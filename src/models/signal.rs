use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{SignalStatus, SignalType};

/// An AI-generated assessment of one input: delivery risk, cost anomaly, or
/// AI usage efficiency.
///
/// `signal_value` is always a member of `signal_type.allowed_values()` —
/// enforced by response validation before persistence, not by the schema.
/// `status` moves one-way: `active`/`unverified` → `overridden`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub input_id: Uuid,
    pub program_id: Uuid,
    pub signal_type: SignalType,
    pub signal_value: String,
    pub confidence_score: f64,
    pub explanation: String,
    pub model_used: Option<String>,
    pub status: SignalStatus,
    pub created_at: NaiveDateTime,
}
