use serde::Deserialize;
use uuid::Uuid;

/// Filter parameters for the incident list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentListFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub grade: Option<String>,
    /// Matches against description, location and patient name.
    pub search: Option<String>,
}

/// Filter parameters for the action list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionListFilter {
    pub incident_id: Option<Uuid>,
    pub status: Option<String>,
    pub owner_id: Option<Uuid>,
    pub overdue: Option<bool>,
}

/// Filter parameters for the risk register list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskListFilter {
    pub level: Option<String>,
    pub category: Option<String>,
}
