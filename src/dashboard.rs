//! Dashboard — aggregate counts for the quality-improvement home screen.

use chrono::Local;
use rusqlite::Connection;
use serde::Serialize;

use crate::actions;
use crate::db;
use crate::indicators::{self, IndicatorSummary};
use crate::risks::{self, LevelCount};
use crate::workflow::WorkflowError;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub incidents_by_status: Vec<StatusCount>,
    pub incidents_by_grade: Vec<StatusCount>,
    pub active_actions: i64,
    pub overdue_actions: i64,
    pub risk_levels: Vec<LevelCount>,
    pub indicators: Vec<IndicatorSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub key: String,
    pub count: i64,
}

pub fn fetch_dashboard(conn: &Connection) -> Result<DashboardData, WorkflowError> {
    let now = Local::now().naive_local();

    let incidents_by_status = db::count_incidents_by_status(conn)?
        .into_iter()
        .map(|(status, count)| StatusCount { key: status.as_str().into(), count })
        .collect();
    let incidents_by_grade = db::count_incidents_by_grade(conn)?
        .into_iter()
        .map(|(grade, count)| StatusCount { key: grade.as_str().into(), count })
        .collect();

    let (active_actions, overdue_actions) = actions::active_and_overdue_counts(conn, now)?;
    let risk_levels = risks::fetch_matrix(conn)?.level_counts;
    let indicators = indicators::fetch_indicator_summaries(conn)?;

    Ok(DashboardData {
        incidents_by_status,
        incidents_by_grade,
        active_actions,
        overdue_actions,
        risk_levels,
        indicators,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use uuid::Uuid;

    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::*;
    use crate::models::*;

    #[test]
    fn empty_register_gives_zeroed_dashboard() {
        let conn = open_memory_database().unwrap();
        let data = fetch_dashboard(&conn).unwrap();
        assert!(data.incidents_by_status.is_empty());
        assert_eq!(data.active_actions, 0);
        assert_eq!(data.overdue_actions, 0);
        assert!(data.indicators.is_empty());
        assert!(data.risk_levels.iter().all(|c| c.count == 0));
    }

    #[test]
    fn counts_reflect_register_contents() {
        let conn = open_memory_database().unwrap();
        let salt = generate_salt();
        let reporter = Staff {
            id: Uuid::new_v4(),
            badge: "N1".into(),
            name: "Staff N1".into(),
            role: StaffRole::Reporter,
            password_hash: hash_password(&salt, "pw"),
            password_salt: salt,
            active: true,
            created_at: NaiveDateTime::default(),
        };
        db::insert_staff(&conn, &reporter).unwrap();

        for (grade, status) in [
            (IncidentGrade::Minor, IncidentStatus::Draft),
            (IncidentGrade::Severe, IncidentStatus::Submitted),
            (IncidentGrade::Severe, IncidentStatus::Approved),
        ] {
            db::insert_incident(&conn, &Incident {
                id: Uuid::new_v4(),
                category: IncidentCategory::Fall,
                grade,
                status,
                approval_level: 1,
                patient: PatientRef { mrn: "MRN-1".into(), name: "P".into(), ward: None },
                occurred_at: NaiveDateTime::default(),
                reported_at: NaiveDateTime::default(),
                location: "Ward 2".into(),
                body_site: None,
                description: "fall".into(),
                immediate_action: None,
                reported_by: reporter.id,
            }).unwrap();
        }

        let data = fetch_dashboard(&conn).unwrap();
        let severe = data.incidents_by_grade.iter().find(|c| c.key == "severe").unwrap();
        assert_eq!(severe.count, 2);
        let drafts = data.incidents_by_status.iter().find(|c| c.key == "draft").unwrap();
        assert_eq!(drafts.count, 1);
    }
}
