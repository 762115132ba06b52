use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const INCIDENT_COLUMNS: &str = "id, category, grade, status, approval_level,
         patient_ref, patient_name, patient_ward, occurred_at, reported_at,
         location, body_site, description, immediate_action, reported_by";

pub fn insert_incident(conn: &Connection, incident: &Incident) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO incidents (id, category, grade, status, approval_level,
         patient_ref, patient_name, patient_ward, occurred_at, reported_at,
         location, body_site, description, immediate_action, reported_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            incident.id.to_string(),
            incident.category.as_str(),
            incident.grade.as_str(),
            incident.status.as_str(),
            incident.approval_level,
            incident.patient.mrn,
            incident.patient.name,
            incident.patient.ward,
            incident.occurred_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            incident.reported_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            incident.location,
            incident.body_site,
            incident.description,
            incident.immediate_action,
            incident.reported_by.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_incident(conn: &Connection, id: &Uuid) -> Result<Option<Incident>, DatabaseError> {
    let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| Ok(incident_row_from_rusqlite(row)))
        .optional()?;
    match row {
        Some(row) => Ok(Some(incident_from_row(row?)?)),
        None => Ok(None),
    }
}

/// Update the report content of a draft. Status fields are untouched;
/// the workflow layer guards that only drafts reach this.
pub fn update_incident_content(conn: &Connection, incident: &Incident) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE incidents SET category = ?2, grade = ?3, patient_ref = ?4,
         patient_name = ?5, patient_ward = ?6, occurred_at = ?7, location = ?8,
         body_site = ?9, description = ?10, immediate_action = ?11
         WHERE id = ?1",
        params![
            incident.id.to_string(),
            incident.category.as_str(),
            incident.grade.as_str(),
            incident.patient.mrn,
            incident.patient.name,
            incident.patient.ward,
            incident.occurred_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            incident.location,
            incident.body_site,
            incident.description,
            incident.immediate_action,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Incident".into(),
            id: incident.id.to_string(),
        });
    }
    Ok(())
}

/// Advance the approval gate: new status plus the next pending level.
pub fn set_incident_gate(
    conn: &Connection,
    id: &Uuid,
    status: IncidentStatus,
    approval_level: i32,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE incidents SET status = ?2, approval_level = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), approval_level],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Incident".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn list_incidents(
    conn: &Connection,
    filter: &IncidentListFilter,
) -> Result<Vec<Incident>, DatabaseError> {
    let mut sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(status) = &filter.status {
        args.push(Box::new(status.clone()));
        sql.push_str(&format!(" AND status = ?{}", args.len()));
    }
    if let Some(category) = &filter.category {
        args.push(Box::new(category.clone()));
        sql.push_str(&format!(" AND category = ?{}", args.len()));
    }
    if let Some(grade) = &filter.grade {
        args.push(Box::new(grade.clone()));
        sql.push_str(&format!(" AND grade = ?{}", args.len()));
    }
    if let Some(search) = &filter.search {
        args.push(Box::new(format!("%{search}%")));
        let n = args.len();
        sql.push_str(&format!(
            " AND (description LIKE ?{n} OR location LIKE ?{n} OR patient_name LIKE ?{n})"
        ));
    }
    sql.push_str(" ORDER BY reported_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
    let rows = stmt.query_map(params_ref.as_slice(), |row| Ok(incident_row_from_rusqlite(row)))?;

    let mut incidents = Vec::new();
    for row in rows {
        incidents.push(incident_from_row(row??)?);
    }
    Ok(incidents)
}

/// Approved incidents at or above the grade threshold with no linked risk
/// register entry. Used by auto-escalation.
pub fn escalation_candidates(
    conn: &Connection,
    min_grade_rank: i32,
) -> Result<Vec<Incident>, DatabaseError> {
    let sql = format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents i
         WHERE i.status = 'approved'
           AND i.grade IN ('severe', 'catastrophic')
           AND NOT EXISTS (SELECT 1 FROM risks r WHERE r.source_incident_id = i.id)
         ORDER BY i.reported_at"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(incident_row_from_rusqlite(row)))?;

    let mut incidents = Vec::new();
    for row in rows {
        let incident = incident_from_row(row??)?;
        if incident.grade.rank() >= min_grade_rank {
            incidents.push(incident);
        }
    }
    Ok(incidents)
}

/// Incident counts per status, for the dashboard.
pub fn count_incidents_by_status(
    conn: &Connection,
) -> Result<Vec<(IncidentStatus, i64)>, DatabaseError> {
    count_grouped(conn, "status", |s| IncidentStatus::from_str(s))
}

/// Incident counts per grade, for the dashboard.
pub fn count_incidents_by_grade(
    conn: &Connection,
) -> Result<Vec<(IncidentGrade, i64)>, DatabaseError> {
    count_grouped(conn, "grade", |s| IncidentGrade::from_str(s))
}

fn count_grouped<T>(
    conn: &Connection,
    column: &str,
    parse: impl Fn(&str) -> Result<T, DatabaseError>,
) -> Result<Vec<(T, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(*) FROM incidents GROUP BY {column}"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = Vec::new();
    for row in rows {
        let (value, count) = row?;
        counts.push((parse(&value)?, count));
    }
    Ok(counts)
}

// Internal row type for Incident mapping
struct IncidentRow {
    id: String,
    category: String,
    grade: String,
    status: String,
    approval_level: i32,
    patient_ref: String,
    patient_name: String,
    patient_ward: Option<String>,
    occurred_at: String,
    reported_at: String,
    location: String,
    body_site: Option<String>,
    description: String,
    immediate_action: Option<String>,
    reported_by: String,
}

fn incident_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<IncidentRow, rusqlite::Error> {
    Ok(IncidentRow {
        id: row.get(0)?,
        category: row.get(1)?,
        grade: row.get(2)?,
        status: row.get(3)?,
        approval_level: row.get(4)?,
        patient_ref: row.get(5)?,
        patient_name: row.get(6)?,
        patient_ward: row.get(7)?,
        occurred_at: row.get(8)?,
        reported_at: row.get(9)?,
        location: row.get(10)?,
        body_site: row.get(11)?,
        description: row.get(12)?,
        immediate_action: row.get(13)?,
        reported_by: row.get(14)?,
    })
}

fn incident_from_row(row: IncidentRow) -> Result<Incident, DatabaseError> {
    Ok(Incident {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        category: IncidentCategory::from_str(&row.category)?,
        grade: IncidentGrade::from_str(&row.grade)?,
        status: IncidentStatus::from_str(&row.status)?,
        approval_level: row.approval_level,
        patient: PatientRef {
            mrn: row.patient_ref,
            name: row.patient_name,
            ward: row.patient_ward,
        },
        occurred_at: NaiveDateTime::parse_from_str(&row.occurred_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
        reported_at: NaiveDateTime::parse_from_str(&row.reported_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
        location: row.location,
        body_site: row.body_site,
        description: row.description,
        immediate_action: row.immediate_action,
        reported_by: Uuid::parse_str(&row.reported_by)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
    })
}
