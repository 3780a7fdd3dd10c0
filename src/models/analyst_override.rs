use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum justification length for an override (audit-trail requirement).
pub const MIN_JUSTIFICATION_CHARS: usize = 10;

/// An append-only human correction of an AI-generated signal. Creating one
/// flips the parent signal to `overridden`; the most recently created entry
/// is the current override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystOverride {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub original_value: String,
    pub override_value: String,
    pub justification: String,
    pub analyst_name: String,
    pub created_at: NaiveDateTime,
}
