//! QI indicators — recurring metrics with periodic recorded values.
//!
//! A period value stays editable (re-recording replaces it) until someone
//! verifies it; from then on it is immutable.

use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::models::enums::*;
use crate::models::*;
use crate::workflow::WorkflowError;

// ═══════════════════════════════════════════
// View types — serialised to frontend
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub target: Option<f64>,
    pub frequency: String,
    pub latest_period: Option<String>,
    pub latest_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorDetail {
    pub indicator: Indicator,
    pub values: Vec<ValueView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueView {
    pub id: Uuid,
    pub period: String,
    pub value: f64,
    pub recorded_by_name: Option<String>,
    pub recorded_at: NaiveDateTime,
    pub verified: bool,
    pub verified_by_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorInput {
    pub name: String,
    pub unit: String,
    pub description: Option<String>,
    pub target: Option<f64>,
    pub frequency: IndicatorFrequency,
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

pub fn create_indicator(conn: &Connection, input: IndicatorInput) -> Result<Indicator, WorkflowError> {
    if input.name.trim().is_empty() {
        return Err(WorkflowError::validation("name", "Name is required"));
    }
    if db::get_indicator_by_name(conn, &input.name)?.is_some() {
        return Err(WorkflowError::validation("name", "An indicator with this name exists"));
    }

    let indicator = Indicator {
        id: Uuid::new_v4(),
        name: input.name,
        unit: input.unit,
        description: input.description,
        target: input.target,
        frequency: input.frequency,
        created_at: Local::now().naive_local(),
    };
    db::insert_indicator(conn, &indicator)?;
    Ok(indicator)
}

/// "2026-07" for monthly indicators, "2026-Q3" for quarterly ones.
fn validate_period(frequency: IndicatorFrequency, period: &str) -> Result<(), WorkflowError> {
    let bytes = period.as_bytes();
    let valid = match frequency {
        IndicatorFrequency::Monthly => {
            bytes.len() == 7
                && bytes[..4].iter().all(u8::is_ascii_digit)
                && bytes[4] == b'-'
                && bytes[5..].iter().all(u8::is_ascii_digit)
                && period[5..].parse::<u8>().is_ok_and(|m| (1..=12).contains(&m))
        }
        IndicatorFrequency::Quarterly => {
            bytes.len() == 7
                && bytes[..4].iter().all(u8::is_ascii_digit)
                && bytes[4] == b'-'
                && bytes[5] == b'Q'
                && matches!(bytes[6], b'1'..=b'4')
        }
    };
    if !valid {
        return Err(WorkflowError::validation(
            "period",
            match frequency {
                IndicatorFrequency::Monthly => "Expected YYYY-MM",
                IndicatorFrequency::Quarterly => "Expected YYYY-Qn",
            },
        ));
    }
    Ok(())
}

/// Record a value for a period. Replaces a pending value for the same
/// period; rejected once that period's value has been verified.
pub fn record_value(
    conn: &Connection,
    indicator_id: &Uuid,
    period: &str,
    value: f64,
    recorded_by: &Staff,
) -> Result<IndicatorValue, WorkflowError> {
    let indicator = db::get_indicator(conn, indicator_id)?
        .ok_or_else(|| WorkflowError::not_found("Indicator", indicator_id))?;
    validate_period(indicator.frequency, period)?;

    if let Some(existing) = db::get_value_for_period(conn, indicator_id, period)? {
        if existing.verified {
            return Err(WorkflowError::IllegalTransition(format!(
                "value for {period} is verified and immutable"
            )));
        }
    }

    let value = IndicatorValue {
        id: Uuid::new_v4(),
        indicator_id: *indicator_id,
        period: period.to_string(),
        value,
        recorded_by: recorded_by.id,
        recorded_at: Local::now().naive_local(),
        verified: false,
        verified_by: None,
        verified_at: None,
    };
    db::upsert_indicator_value(conn, &value)?;
    tracing::info!(indicator = %indicator.name, period, "Indicator value recorded");
    Ok(value)
}

/// Verify a recorded value, freezing it.
pub fn verify_value(
    conn: &Connection,
    value_id: &Uuid,
    verifier: &Staff,
) -> Result<IndicatorValue, WorkflowError> {
    let value = db::get_indicator_value(conn, value_id)?
        .ok_or_else(|| WorkflowError::not_found("IndicatorValue", value_id))?;
    if value.verified {
        return Err(WorkflowError::IllegalTransition(format!(
            "value for {} is already verified",
            value.period
        )));
    }
    if !verifier.role.can_verify_actions() {
        return Err(WorkflowError::Forbidden(format!(
            "{} may not verify indicator values",
            verifier.role.as_str()
        )));
    }

    db::mark_value_verified(conn, value_id, &verifier.id, Local::now().naive_local())?;
    db::get_indicator_value(conn, value_id)?
        .ok_or_else(|| WorkflowError::not_found("IndicatorValue", value_id))
}

// ═══════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════

pub fn fetch_indicator_summaries(conn: &Connection) -> Result<Vec<IndicatorSummary>, WorkflowError> {
    let indicators = db::list_indicators(conn)?;
    let latest = db::latest_indicator_values(conn)?;

    Ok(indicators
        .into_iter()
        .map(|indicator| {
            let latest = latest.iter().find(|v| v.indicator_id == indicator.id);
            IndicatorSummary {
                id: indicator.id,
                name: indicator.name,
                unit: indicator.unit,
                target: indicator.target,
                frequency: indicator.frequency.as_str().into(),
                latest_period: latest.map(|v| v.period.clone()),
                latest_value: latest.map(|v| v.value),
            }
        })
        .collect())
}

pub fn fetch_indicator_detail(conn: &Connection, id: &Uuid) -> Result<IndicatorDetail, WorkflowError> {
    let indicator = db::get_indicator(conn, id)?
        .ok_or_else(|| WorkflowError::not_found("Indicator", id))?;
    let values = db::list_values_for_indicator(conn, id)?
        .into_iter()
        .map(|v| ValueView {
            recorded_by_name: db::staff_name(conn, &v.recorded_by),
            verified_by_name: v.verified_by.and_then(|id| db::staff_name(conn, &id)),
            id: v.id,
            period: v.period,
            value: v.value,
            recorded_at: v.recorded_at,
            verified: v.verified,
        })
        .collect();
    Ok(IndicatorDetail { indicator, values })
}
