use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const ACTION_COLUMNS: &str = "id, incident_id, title, description, owner_id, due_date,
         status, created_at, started_at, completed_at, completed_by,
         verified_at, verified_by, verification_note, cancelled_at, cancel_reason";

pub fn insert_action(conn: &Connection, action: &CorrectiveAction) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO actions (id, incident_id, title, description, owner_id, due_date,
         status, created_at, started_at, completed_at, completed_by,
         verified_at, verified_by, verification_note, cancelled_at, cancel_reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            action.id.to_string(),
            action.incident_id.to_string(),
            action.title,
            action.description,
            action.owner_id.to_string(),
            action.due_date.to_string(),
            action.status.as_str(),
            action.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            action.started_at.map(fmt_dt),
            action.completed_at.map(fmt_dt),
            action.completed_by.map(|id| id.to_string()),
            action.verified_at.map(fmt_dt),
            action.verified_by.map(|id| id.to_string()),
            action.verification_note,
            action.cancelled_at.map(fmt_dt),
            action.cancel_reason,
        ],
    )?;
    Ok(())
}

pub fn get_action(conn: &Connection, id: &Uuid) -> Result<Option<CorrectiveAction>, DatabaseError> {
    let sql = format!("SELECT {ACTION_COLUMNS} FROM actions WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| Ok(action_row_from_rusqlite(row)))
        .optional()?;
    match row {
        Some(row) => Ok(Some(action_from_row(row?)?)),
        None => Ok(None),
    }
}

pub fn list_actions(
    conn: &Connection,
    filter: &ActionListFilter,
) -> Result<Vec<CorrectiveAction>, DatabaseError> {
    let mut sql = format!("SELECT {ACTION_COLUMNS} FROM actions WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(incident_id) = &filter.incident_id {
        args.push(Box::new(incident_id.to_string()));
        sql.push_str(&format!(" AND incident_id = ?{}", args.len()));
    }
    if let Some(status) = &filter.status {
        args.push(Box::new(status.clone()));
        sql.push_str(&format!(" AND status = ?{}", args.len()));
    }
    if let Some(owner_id) = &filter.owner_id {
        args.push(Box::new(owner_id.to_string()));
        sql.push_str(&format!(" AND owner_id = ?{}", args.len()));
    }
    sql.push_str(" ORDER BY due_date");

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
    let rows = stmt.query_map(params_ref.as_slice(), |row| Ok(action_row_from_rusqlite(row)))?;

    let mut actions = Vec::new();
    for row in rows {
        actions.push(action_from_row(row??)?);
    }
    Ok(actions)
}

/// Actions still open or in progress, ordered by due date.
/// Overdue is derived against the caller's clock, not here.
pub fn list_active_actions(conn: &Connection) -> Result<Vec<CorrectiveAction>, DatabaseError> {
    let sql = format!(
        "SELECT {ACTION_COLUMNS} FROM actions
         WHERE status IN ('open', 'in_progress') ORDER BY due_date"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(action_row_from_rusqlite(row)))?;

    let mut actions = Vec::new();
    for row in rows {
        actions.push(action_from_row(row??)?);
    }
    Ok(actions)
}

pub fn mark_action_started(
    conn: &Connection,
    id: &Uuid,
    started_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE actions SET status = 'in_progress', started_at = ?2 WHERE id = ?1",
        params![id.to_string(), fmt_dt(started_at)],
    )?;
    Ok(())
}

pub fn mark_action_completed(
    conn: &Connection,
    id: &Uuid,
    completed_by: &Uuid,
    completed_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE actions SET status = 'completed', completed_at = ?2, completed_by = ?3
         WHERE id = ?1",
        params![id.to_string(), fmt_dt(completed_at), completed_by.to_string()],
    )?;
    Ok(())
}

pub fn mark_action_verified(
    conn: &Connection,
    id: &Uuid,
    verified_by: &Uuid,
    verified_at: NaiveDateTime,
    note: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE actions SET status = 'verified', verified_at = ?2, verified_by = ?3,
         verification_note = ?4 WHERE id = ?1",
        params![id.to_string(), fmt_dt(verified_at), verified_by.to_string(), note],
    )?;
    Ok(())
}

pub fn mark_action_cancelled(
    conn: &Connection,
    id: &Uuid,
    cancelled_at: NaiveDateTime,
    reason: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE actions SET status = 'cancelled', cancelled_at = ?2, cancel_reason = ?3
         WHERE id = ?1",
        params![id.to_string(), fmt_dt(cancelled_at), reason],
    )?;
    Ok(())
}

fn fmt_dt(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

// Internal row type for CorrectiveAction mapping
struct ActionRow {
    id: String,
    incident_id: String,
    title: String,
    description: String,
    owner_id: String,
    due_date: String,
    status: String,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    completed_by: Option<String>,
    verified_at: Option<String>,
    verified_by: Option<String>,
    verification_note: Option<String>,
    cancelled_at: Option<String>,
    cancel_reason: Option<String>,
}

fn action_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ActionRow, rusqlite::Error> {
    Ok(ActionRow {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        owner_id: row.get(4)?,
        due_date: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        started_at: row.get(8)?,
        completed_at: row.get(9)?,
        completed_by: row.get(10)?,
        verified_at: row.get(11)?,
        verified_by: row.get(12)?,
        verification_note: row.get(13)?,
        cancelled_at: row.get(14)?,
        cancel_reason: row.get(15)?,
    })
}

fn action_from_row(row: ActionRow) -> Result<CorrectiveAction, DatabaseError> {
    Ok(CorrectiveAction {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        incident_id: Uuid::parse_str(&row.incident_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        title: row.title,
        description: row.description,
        owner_id: Uuid::parse_str(&row.owner_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        due_date: NaiveDate::parse_from_str(&row.due_date, "%Y-%m-%d").unwrap_or_default(),
        status: ActionStatus::from_str(&row.status)?,
        created_at: parse_dt(&row.created_at),
        started_at: row.started_at.as_deref().map(parse_dt),
        completed_at: row.completed_at.as_deref().map(parse_dt),
        completed_by: row.completed_by.and_then(|s| Uuid::parse_str(&s).ok()),
        verified_at: row.verified_at.as_deref().map(parse_dt),
        verified_by: row.verified_by.and_then(|s| Uuid::parse_str(&s).ok()),
        verification_note: row.verification_note,
        cancelled_at: row.cancelled_at.as_deref().map(parse_dt),
        cancel_reason: row.cancel_reason,
    })
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap_or_default()
}
