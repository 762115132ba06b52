use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

pub fn insert_approval(conn: &Connection, record: &ApprovalRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO incident_approvals (id, incident_id, level, decision, decided_by, note, decided_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id.to_string(),
            record.incident_id.to_string(),
            record.level,
            record.decision.as_str(),
            record.decided_by.to_string(),
            record.note,
            record.decided_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_approvals_for_incident(
    conn: &Connection,
    incident_id: &Uuid,
) -> Result<Vec<ApprovalRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, incident_id, level, decision, decided_by, note, decided_at
         FROM incident_approvals WHERE incident_id = ?1 ORDER BY level, decided_at",
    )?;

    let rows = stmt.query_map(params![incident_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i32>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, incident_id, level, decision, decided_by, note, decided_at) = row?;
        records.push(ApprovalRecord {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            incident_id: Uuid::parse_str(&incident_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            level,
            decision: ApprovalDecision::from_str(&decision)?,
            decided_by: Uuid::parse_str(&decided_by)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            note,
            decided_at: NaiveDateTime::parse_from_str(&decided_at, "%Y-%m-%d %H:%M:%S")
                .unwrap_or_default(),
        });
    }
    Ok(records)
}
