use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

pub fn insert_staff(conn: &Connection, staff: &Staff) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO staff (id, badge, name, role, password_salt, password_hash, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            staff.id.to_string(),
            staff.badge,
            staff.name,
            staff.role.as_str(),
            staff.password_salt,
            staff.password_hash,
            staff.active as i32,
            staff.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_staff(conn: &Connection, id: &Uuid) -> Result<Option<Staff>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, badge, name, role, password_salt, password_hash, active, created_at
             FROM staff WHERE id = ?1",
            params![id.to_string()],
            staff_row,
        )
        .optional()?;
    row.map(staff_from_row).transpose()
}

pub fn get_staff_by_badge(conn: &Connection, badge: &str) -> Result<Option<Staff>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, badge, name, role, password_salt, password_hash, active, created_at
             FROM staff WHERE badge = ?1",
            params![badge],
            staff_row,
        )
        .optional()?;
    row.map(staff_from_row).transpose()
}

pub fn list_active_staff(conn: &Connection) -> Result<Vec<Staff>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, badge, name, role, password_salt, password_hash, active, created_at
         FROM staff WHERE active = 1 ORDER BY name",
    )?;
    let rows = stmt.query_map([], staff_row)?;

    let mut staff = Vec::new();
    for row in rows {
        staff.push(staff_from_row(row?)?);
    }
    Ok(staff)
}

pub fn count_active_admins(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM staff WHERE role = 'admin' AND active = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Name lookup used by view enrichment; missing staff map to None.
pub fn staff_name(conn: &Connection, id: &Uuid) -> Option<String> {
    conn.query_row(
        "SELECT name FROM staff WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )
    .optional()
    .ok()
    .flatten()
}

type StaffRow = (String, String, String, String, String, String, i32, String);

fn staff_row(row: &rusqlite::Row<'_>) -> Result<StaffRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn staff_from_row(row: StaffRow) -> Result<Staff, DatabaseError> {
    let (id, badge, name, role, password_salt, password_hash, active, created_at) = row;
    Ok(Staff {
        id: Uuid::parse_str(&id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        badge,
        name,
        role: StaffRole::from_str(&role)?,
        password_salt,
        password_hash,
        active: active != 0,
        created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}
