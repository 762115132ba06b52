use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ApprovalDecision;

/// One recorded decision at an approval gate level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub level: i32,
    pub decision: ApprovalDecision,
    pub decided_by: Uuid,
    pub note: Option<String>,
    pub decided_at: NaiveDateTime,
}
