use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const RISK_COLUMNS: &str = "id, title, description, category, owner_id,
         probability, severity, mitigation, source_incident_id, identified_at";

pub fn insert_risk(conn: &Connection, risk: &Risk) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO risks (id, title, description, category, owner_id,
         probability, severity, mitigation, source_incident_id, identified_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            risk.id.to_string(),
            risk.title,
            risk.description,
            risk.category.as_str(),
            risk.owner_id.to_string(),
            risk.probability,
            risk.severity,
            risk.mitigation,
            risk.source_incident_id.map(|id| id.to_string()),
            risk.identified_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_risk(conn: &Connection, id: &Uuid) -> Result<Option<Risk>, DatabaseError> {
    let sql = format!("SELECT {RISK_COLUMNS} FROM risks WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| Ok(risk_row_from_rusqlite(row)))
        .optional()?;
    match row {
        Some(row) => Ok(Some(risk_from_row(row?)?)),
        None => Ok(None),
    }
}

/// Rescore/update an entry. Probability and severity are stored; score and
/// level stay derived.
pub fn update_risk(conn: &Connection, risk: &Risk) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE risks SET title = ?2, description = ?3, category = ?4, owner_id = ?5,
         probability = ?6, severity = ?7, mitigation = ?8 WHERE id = ?1",
        params![
            risk.id.to_string(),
            risk.title,
            risk.description,
            risk.category.as_str(),
            risk.owner_id.to_string(),
            risk.probability,
            risk.severity,
            risk.mitigation,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Risk".into(),
            id: risk.id.to_string(),
        });
    }
    Ok(())
}

pub fn list_risks(conn: &Connection, filter: &RiskListFilter) -> Result<Vec<Risk>, DatabaseError> {
    let mut sql = format!("SELECT {RISK_COLUMNS} FROM risks WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(category) = &filter.category {
        args.push(Box::new(category.clone()));
        sql.push_str(&format!(" AND category = ?{}", args.len()));
    }
    sql.push_str(" ORDER BY probability * severity DESC, identified_at");

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
    let rows = stmt.query_map(params_ref.as_slice(), |row| Ok(risk_row_from_rusqlite(row)))?;

    let mut risks = Vec::new();
    for row in rows {
        risks.push(risk_from_row(row??)?);
    }

    // Level is derived, so the level filter is applied after banding.
    if let Some(level) = &filter.level {
        let level = RiskLevel::from_str(level)?;
        risks.retain(|r| r.level() == level);
    }
    Ok(risks)
}

pub fn risk_exists_for_incident(
    conn: &Connection,
    incident_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM risks WHERE source_incident_id = ?1",
        params![incident_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_risks_for_incident(
    conn: &Connection,
    incident_id: &Uuid,
) -> Result<Vec<Risk>, DatabaseError> {
    let sql = format!("SELECT {RISK_COLUMNS} FROM risks WHERE source_incident_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![incident_id.to_string()], |row| {
        Ok(risk_row_from_rusqlite(row))
    })?;

    let mut risks = Vec::new();
    for row in rows {
        risks.push(risk_from_row(row??)?);
    }
    Ok(risks)
}

/// Raw (probability, severity, count) cells for the 5×5 matrix.
pub fn risk_matrix_counts(conn: &Connection) -> Result<Vec<(i32, i32, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT probability, severity, COUNT(*) FROM risks
         GROUP BY probability, severity",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i32>(0)?, row.get::<_, i32>(1)?, row.get::<_, i64>(2)?))
    })?;
    let mut cells = Vec::new();
    for row in rows {
        cells.push(row?);
    }
    Ok(cells)
}

// Internal row type for Risk mapping
struct RiskRow {
    id: String,
    title: String,
    description: Option<String>,
    category: String,
    owner_id: String,
    probability: i32,
    severity: i32,
    mitigation: Option<String>,
    source_incident_id: Option<String>,
    identified_at: String,
}

fn risk_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<RiskRow, rusqlite::Error> {
    Ok(RiskRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        owner_id: row.get(4)?,
        probability: row.get(5)?,
        severity: row.get(6)?,
        mitigation: row.get(7)?,
        source_incident_id: row.get(8)?,
        identified_at: row.get(9)?,
    })
}

fn risk_from_row(row: RiskRow) -> Result<Risk, DatabaseError> {
    Ok(Risk {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        title: row.title,
        description: row.description,
        category: RiskCategory::from_str(&row.category)?,
        owner_id: Uuid::parse_str(&row.owner_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        probability: row.probability,
        severity: row.severity,
        mitigation: row.mitigation,
        source_incident_id: row.source_incident_id.and_then(|s| Uuid::parse_str(&s).ok()),
        identified_at: NaiveDateTime::parse_from_str(&row.identified_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}
