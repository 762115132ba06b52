use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Insert a batch of audit entries into the audit_log table.
pub fn insert_audit_entries(
    conn: &Connection,
    entries: &[(String, String, String, String)], // (timestamp, staff, action, detail)
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO audit_log (timestamp, staff, action, detail) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (timestamp, staff, action, detail) in entries {
        stmt.execute(params![timestamp, staff, action, detail])?;
    }
    Ok(())
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < datetime('now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

/// Audit entries within the last N days, newest first.
pub fn query_recent_audit(
    conn: &Connection,
    days: i64,
) -> Result<Vec<(String, String, String, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, staff, action, detail FROM audit_log
         WHERE timestamp >= datetime('now', ?1)
         ORDER BY timestamp DESC",
    )?;
    let rows = stmt
        .query_map(params![format!("-{days} days")], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
