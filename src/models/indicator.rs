use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::IndicatorFrequency;

/// Named recurring QI metric (e.g. monthly pressure-ulcer improvement rate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indicator {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub description: Option<String>,
    pub target: Option<f64>,
    pub frequency: IndicatorFrequency,
    pub created_at: NaiveDateTime,
}

/// One recorded value for an indicator period (e.g. "2026-07").
/// Immutable once verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorValue {
    pub id: Uuid,
    pub indicator_id: Uuid,
    pub period: String,
    pub value: f64,
    pub recorded_by: Uuid,
    pub recorded_at: NaiveDateTime,
    pub verified: bool,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<NaiveDateTime>,
}
