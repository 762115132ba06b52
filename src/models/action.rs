use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ActionStatus;

/// Corrective/preventive action attached to an incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectiveAction {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub title: String,
    /// Definition of done — what must be demonstrably in place.
    pub description: String,
    pub owner_id: Uuid,
    pub due_date: NaiveDate,
    pub status: ActionStatus,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub completed_by: Option<Uuid>,
    pub verified_at: Option<NaiveDateTime>,
    pub verified_by: Option<Uuid>,
    pub verification_note: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancel_reason: Option<String>,
}

impl CorrectiveAction {
    /// Derived read-only property, never stored: an action is overdue when
    /// its due date has passed and it is still open or in progress.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        matches!(self.status, ActionStatus::Open | ActionStatus::InProgress)
            && now.date() > self.due_date
    }
}
