use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

pub fn insert_indicator(conn: &Connection, indicator: &Indicator) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO indicators (id, name, unit, description, target, frequency, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            indicator.id.to_string(),
            indicator.name,
            indicator.unit,
            indicator.description,
            indicator.target,
            indicator.frequency.as_str(),
            indicator.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_indicator(conn: &Connection, id: &Uuid) -> Result<Option<Indicator>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, unit, description, target, frequency, created_at
             FROM indicators WHERE id = ?1",
            params![id.to_string()],
            indicator_row,
        )
        .optional()?;
    row.map(indicator_from_row).transpose()
}

pub fn get_indicator_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<Indicator>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, unit, description, target, frequency, created_at
             FROM indicators WHERE name = ?1",
            params![name],
            indicator_row,
        )
        .optional()?;
    row.map(indicator_from_row).transpose()
}

pub fn list_indicators(conn: &Connection) -> Result<Vec<Indicator>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, unit, description, target, frequency, created_at
         FROM indicators ORDER BY name",
    )?;
    let rows = stmt.query_map([], indicator_row)?;

    let mut indicators = Vec::new();
    for row in rows {
        indicators.push(indicator_from_row(row?)?);
    }
    Ok(indicators)
}

/// Insert a period value, replacing a pending (unverified) value for the
/// same period. The workflow layer rejects the write when the existing
/// value is verified.
pub fn upsert_indicator_value(
    conn: &Connection,
    value: &IndicatorValue,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO indicator_values
         (id, indicator_id, period, value, recorded_by, recorded_at, verified, verified_by, verified_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (indicator_id, period) DO UPDATE SET
           id = excluded.id,
           value = excluded.value,
           recorded_by = excluded.recorded_by,
           recorded_at = excluded.recorded_at",
        params![
            value.id.to_string(),
            value.indicator_id.to_string(),
            value.period,
            value.value,
            value.recorded_by.to_string(),
            value.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            value.verified as i32,
            value.verified_by.map(|id| id.to_string()),
            value.verified_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_indicator_value(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<IndicatorValue>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, indicator_id, period, value, recorded_by, recorded_at,
                    verified, verified_by, verified_at
             FROM indicator_values WHERE id = ?1",
            params![id.to_string()],
            value_row,
        )
        .optional()?;
    row.map(value_from_row).transpose()
}

pub fn get_value_for_period(
    conn: &Connection,
    indicator_id: &Uuid,
    period: &str,
) -> Result<Option<IndicatorValue>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, indicator_id, period, value, recorded_by, recorded_at,
                    verified, verified_by, verified_at
             FROM indicator_values WHERE indicator_id = ?1 AND period = ?2",
            params![indicator_id.to_string(), period],
            value_row,
        )
        .optional()?;
    row.map(value_from_row).transpose()
}

pub fn list_values_for_indicator(
    conn: &Connection,
    indicator_id: &Uuid,
) -> Result<Vec<IndicatorValue>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, indicator_id, period, value, recorded_by, recorded_at,
                verified, verified_by, verified_at
         FROM indicator_values WHERE indicator_id = ?1 ORDER BY period",
    )?;
    let rows = stmt.query_map(params![indicator_id.to_string()], value_row)?;

    let mut values = Vec::new();
    for row in rows {
        values.push(value_from_row(row?)?);
    }
    Ok(values)
}

/// Most recent recorded value per indicator, for the dashboard.
pub fn latest_indicator_values(
    conn: &Connection,
) -> Result<Vec<IndicatorValue>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, indicator_id, period, value, recorded_by, recorded_at,
                verified, verified_by, verified_at
         FROM indicator_values v
         WHERE period = (SELECT MAX(period) FROM indicator_values
                         WHERE indicator_id = v.indicator_id)",
    )?;
    let rows = stmt.query_map([], value_row)?;

    let mut values = Vec::new();
    for row in rows {
        values.push(value_from_row(row?)?);
    }
    Ok(values)
}

pub fn mark_value_verified(
    conn: &Connection,
    id: &Uuid,
    verified_by: &Uuid,
    verified_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE indicator_values SET verified = 1, verified_by = ?2, verified_at = ?3
         WHERE id = ?1",
        params![
            id.to_string(),
            verified_by.to_string(),
            verified_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

type IndicatorRow = (String, String, String, Option<String>, Option<f64>, String, String);

fn indicator_row(row: &rusqlite::Row<'_>) -> Result<IndicatorRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn indicator_from_row(row: IndicatorRow) -> Result<Indicator, DatabaseError> {
    let (id, name, unit, description, target, frequency, created_at) = row;
    Ok(Indicator {
        id: Uuid::parse_str(&id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        name,
        unit,
        description,
        target,
        frequency: IndicatorFrequency::from_str(&frequency)?,
        created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}

type ValueRow = (
    String,
    String,
    String,
    f64,
    String,
    String,
    i32,
    Option<String>,
    Option<String>,
);

fn value_row(row: &rusqlite::Row<'_>) -> Result<ValueRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn value_from_row(row: ValueRow) -> Result<IndicatorValue, DatabaseError> {
    let (id, indicator_id, period, value, recorded_by, recorded_at, verified, verified_by, verified_at) =
        row;
    Ok(IndicatorValue {
        id: Uuid::parse_str(&id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        indicator_id: Uuid::parse_str(&indicator_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        period,
        value,
        recorded_by: Uuid::parse_str(&recorded_by)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        recorded_at: NaiveDateTime::parse_from_str(&recorded_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
        verified: verified != 0,
        verified_by: verified_by.and_then(|s| Uuid::parse_str(&s).ok()),
        verified_at: verified_at
            .map(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").unwrap_or_default()),
    })
}
