use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ProgramStatus;

/// A government program being monitored for delivery risk and cost signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProgramStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
