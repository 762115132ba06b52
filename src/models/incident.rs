use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{IncidentCategory, IncidentGrade, IncidentStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub category: IncidentCategory,
    pub grade: IncidentGrade,
    pub status: IncidentStatus,
    /// Next pending approval gate level while `status` is `Submitted`.
    pub approval_level: i32,
    pub patient: PatientRef,
    pub occurred_at: NaiveDateTime,
    pub reported_at: NaiveDateTime,
    pub location: String,
    /// Body-location picker coding (e.g. "sacrum", "left_heel").
    pub body_site: Option<String>,
    pub description: String,
    pub immediate_action: Option<String>,
    pub reported_by: Uuid,
}

/// Embedded patient reference. The register is not a patient registry;
/// the MRN points at the hospital's own systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRef {
    pub mrn: String,
    pub name: String,
    pub ward: Option<String>,
}
