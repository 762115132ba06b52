//! Risk register — probability×severity scoring, the 5×5 matrix, and
//! auto-escalation of severe approved incidents.

use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::models::enums::*;
use crate::models::*;
use crate::workflow::WorkflowError;

/// Escalation picks up approved incidents at or above this grade.
pub const ESCALATION_MIN_GRADE: IncidentGrade = IncidentGrade::Severe;

/// Probability assigned to auto-escalated risks, pending review.
const ESCALATION_DEFAULT_PROBABILITY: i32 = 3;

/// Severity rating for an escalated incident's grade.
fn severity_for_grade(grade: IncidentGrade) -> i32 {
    match grade {
        IncidentGrade::Catastrophic => 5,
        _ => 4,
    }
}

// ═══════════════════════════════════════════
// View types — serialised to frontend
// ═══════════════════════════════════════════

/// A risk card with its derived score and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCard {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub owner_name: Option<String>,
    pub probability: i32,
    pub severity: i32,
    pub score: i32,
    pub level: String,
    pub mitigation: Option<String>,
    pub source_incident_id: Option<Uuid>,
    pub identified_at: NaiveDateTime,
}

impl RiskCard {
    fn from_risk(conn: &Connection, risk: Risk) -> Self {
        Self {
            score: risk.score(),
            level: risk.level().as_str().into(),
            owner_name: db::staff_name(conn, &risk.owner_id),
            id: risk.id,
            title: risk.title,
            description: risk.description,
            category: risk.category.as_str().into(),
            probability: risk.probability,
            severity: risk.severity,
            mitigation: risk.mitigation,
            source_incident_id: risk.source_incident_id,
            identified_at: risk.identified_at,
        }
    }
}

/// The 5×5 matrix: cell [probability-1][severity-1] holds the entry count.
#[derive(Debug, Clone, Serialize)]
pub struct RiskMatrix {
    pub cells: [[i64; 5]; 5],
    pub level_counts: Vec<LevelCount>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelCount {
    pub level: String,
    pub count: i64,
}

/// Outcome of one auto-escalation batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EscalationReport {
    pub escalated: u32,
    pub skipped: u32,
    pub errored: u32,
}

/// Input for creating or rescoring a register entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskInput {
    pub title: String,
    pub description: Option<String>,
    pub category: RiskCategory,
    pub owner_id: Uuid,
    pub probability: i32,
    pub severity: i32,
    pub mitigation: Option<String>,
}

fn validate_rating(field: &str, value: i32) -> Result<(), WorkflowError> {
    if !(1..=5).contains(&value) {
        return Err(WorkflowError::validation(field, "Rating must be between 1 and 5"));
    }
    Ok(())
}

fn validate_input(input: &RiskInput) -> Result<(), WorkflowError> {
    if input.title.trim().is_empty() {
        return Err(WorkflowError::validation("title", "Title is required"));
    }
    validate_rating("probability", input.probability)?;
    validate_rating("severity", input.severity)?;
    Ok(())
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

pub fn create_risk(conn: &Connection, input: RiskInput) -> Result<Risk, WorkflowError> {
    validate_input(&input)?;
    db::get_staff(conn, &input.owner_id)?
        .ok_or_else(|| WorkflowError::not_found("Staff", input.owner_id))?;

    let risk = Risk {
        id: Uuid::new_v4(),
        title: input.title,
        description: input.description,
        category: input.category,
        owner_id: input.owner_id,
        probability: input.probability,
        severity: input.severity,
        mitigation: input.mitigation,
        source_incident_id: None,
        identified_at: Local::now().naive_local(),
    };
    db::insert_risk(conn, &risk)?;
    tracing::info!(risk = %risk.id, score = risk.score(), level = risk.level().as_str(), "Risk registered");
    Ok(risk)
}

/// Rescore or edit an entry. Score and level follow from the new ratings.
pub fn update_risk(conn: &Connection, id: &Uuid, input: RiskInput) -> Result<Risk, WorkflowError> {
    validate_input(&input)?;
    let mut risk = db::get_risk(conn, id)?
        .ok_or_else(|| WorkflowError::not_found("Risk", id))?;

    risk.title = input.title;
    risk.description = input.description;
    risk.category = input.category;
    risk.owner_id = input.owner_id;
    risk.probability = input.probability;
    risk.severity = input.severity;
    risk.mitigation = input.mitigation;

    db::update_risk(conn, &risk)?;
    Ok(risk)
}

/// Create one register entry per qualifying incident: approved, grade at or
/// above the threshold, no linked entry yet. The batch never aborts; items
/// that fail are counted and logged.
pub fn run_escalation(conn: &Connection, owner: &Staff) -> Result<EscalationReport, WorkflowError> {
    let candidates = db::escalation_candidates(conn, ESCALATION_MIN_GRADE.rank())?;
    let mut report = EscalationReport::default();

    for incident in candidates {
        // Re-check the link; an earlier batch run or manual entry wins.
        match db::risk_exists_for_incident(conn, &incident.id) {
            Ok(true) => {
                report.skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(incident = %incident.id, error = %e, "Escalation link check failed");
                report.errored += 1;
                continue;
            }
        }

        let risk = Risk {
            id: Uuid::new_v4(),
            title: format!("Escalated: {} ({})", incident.category.as_str(), incident.location),
            description: Some(incident.description.clone()),
            category: category_for_incident(incident.category),
            owner_id: owner.id,
            probability: ESCALATION_DEFAULT_PROBABILITY,
            severity: severity_for_grade(incident.grade),
            mitigation: None,
            source_incident_id: Some(incident.id),
            identified_at: Local::now().naive_local(),
        };
        match db::insert_risk(conn, &risk) {
            Ok(()) => report.escalated += 1,
            Err(e) => {
                tracing::warn!(incident = %incident.id, error = %e, "Escalation insert failed");
                report.errored += 1;
            }
        }
    }

    tracing::info!(
        escalated = report.escalated,
        skipped = report.skipped,
        errored = report.errored,
        "Escalation batch finished"
    );
    Ok(report)
}

fn category_for_incident(category: IncidentCategory) -> RiskCategory {
    match category {
        IncidentCategory::MedicationError => RiskCategory::Medication,
        IncidentCategory::Infection => RiskCategory::Infection,
        IncidentCategory::Device => RiskCategory::Equipment,
        _ => RiskCategory::Clinical,
    }
}

// ═══════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════

pub fn fetch_risk_cards(
    conn: &Connection,
    filter: &RiskListFilter,
) -> Result<Vec<RiskCard>, WorkflowError> {
    let risks = db::list_risks(conn, filter)?;
    Ok(risks.into_iter().map(|r| RiskCard::from_risk(conn, r)).collect())
}

pub fn fetch_risk_card(conn: &Connection, id: &Uuid) -> Result<RiskCard, WorkflowError> {
    let risk = db::get_risk(conn, id)?
        .ok_or_else(|| WorkflowError::not_found("Risk", id))?;
    Ok(RiskCard::from_risk(conn, risk))
}

pub fn fetch_matrix(conn: &Connection) -> Result<RiskMatrix, WorkflowError> {
    let mut cells = [[0i64; 5]; 5];
    let mut total = 0;
    let mut by_level = std::collections::HashMap::new();

    for (probability, severity, count) in db::risk_matrix_counts(conn)? {
        // CHECK constraints bound the ratings, so indexing is safe
        cells[(probability - 1) as usize][(severity - 1) as usize] = count;
        total += count;
        let level = RiskLevel::from_score(probability * severity);
        *by_level.entry(level.as_str()).or_insert(0) += count;
    }

    let level_counts = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical]
        .iter()
        .map(|level| LevelCount {
            level: level.as_str().into(),
            count: by_level.get(level.as_str()).copied().unwrap_or(0),
        })
        .collect();

    Ok(RiskMatrix { cells, level_counts, total })
}

/// Incidents the next escalation batch would pick up.
pub fn fetch_escalation_candidates(conn: &Connection) -> Result<Vec<Incident>, WorkflowError> {
    Ok(db::escalation_candidates(conn, ESCALATION_MIN_GRADE.rank())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{generate_salt, hash_password};

    fn staff(conn: &Connection, badge: &str, role: StaffRole) -> Staff {
        let salt = generate_salt();
        let staff = Staff {
            id: Uuid::new_v4(),
            badge: badge.into(),
            name: format!("Staff {badge}"),
            role,
            password_hash: hash_password(&salt, "pw"),
            password_salt: salt,
            active: true,
            created_at: NaiveDateTime::default(),
        };
        db::insert_staff(conn, &staff).unwrap();
        staff
    }

    fn approved_incident(conn: &Connection, reporter: &Staff, grade: IncidentGrade) -> Uuid {
        let id = Uuid::new_v4();
        db::insert_incident(conn, &Incident {
            id,
            category: IncidentCategory::Fall,
            grade,
            status: IncidentStatus::Approved,
            approval_level: 2,
            patient: PatientRef { mrn: "MRN-1".into(), name: "P".into(), ward: None },
            occurred_at: NaiveDateTime::default(),
            reported_at: NaiveDateTime::default(),
            location: "Ward 2".into(),
            body_site: None,
            description: "fall with fracture".into(),
            immediate_action: None,
            reported_by: reporter.id,
        }).unwrap();
        id
    }

    fn risk_input(owner: &Staff, probability: i32, severity: i32) -> RiskInput {
        RiskInput {
            title: "Night staffing below minimum".into(),
            description: None,
            category: RiskCategory::Organisational,
            owner_id: owner.id,
            probability,
            severity,
            mitigation: None,
        }
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let conn = open_memory_database().unwrap();
        let owner = staff(&conn, "Q1", StaffRole::Qps);
        for (probability, severity) in [(0, 3), (6, 3), (3, 0), (3, 6)] {
            let err = create_risk(&conn, risk_input(&owner, probability, severity)).unwrap_err();
            assert!(matches!(err, WorkflowError::Validation { .. }), "p={probability} s={severity}");
        }
    }

    #[test]
    fn rescoring_changes_derived_level() {
        let conn = open_memory_database().unwrap();
        let owner = staff(&conn, "Q1", StaffRole::Qps);
        let risk = create_risk(&conn, risk_input(&owner, 2, 2)).unwrap();
        assert_eq!(risk.level(), RiskLevel::Low);

        let updated = update_risk(&conn, &risk.id, risk_input(&owner, 5, 4)).unwrap();
        assert_eq!(updated.level(), RiskLevel::Critical);

        let card = fetch_risk_card(&conn, &risk.id).unwrap();
        assert_eq!(card.score, 20);
        assert_eq!(card.level, "critical");
    }

    #[test]
    fn matrix_counts_and_level_totals() {
        let conn = open_memory_database().unwrap();
        let owner = staff(&conn, "Q1", StaffRole::Qps);
        create_risk(&conn, risk_input(&owner, 1, 1)).unwrap();
        create_risk(&conn, risk_input(&owner, 1, 1)).unwrap();
        create_risk(&conn, risk_input(&owner, 5, 5)).unwrap();

        let matrix = fetch_matrix(&conn).unwrap();
        assert_eq!(matrix.cells[0][0], 2);
        assert_eq!(matrix.cells[4][4], 1);
        assert_eq!(matrix.total, 3);

        let low = matrix.level_counts.iter().find(|c| c.level == "low").unwrap();
        assert_eq!(low.count, 2);
        let critical = matrix.level_counts.iter().find(|c| c.level == "critical").unwrap();
        assert_eq!(critical.count, 1);
    }

    #[test]
    fn escalation_creates_one_risk_per_qualifying_incident() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let owner = staff(&conn, "Q1", StaffRole::Qps);

        let severe = approved_incident(&conn, &reporter, IncidentGrade::Severe);
        let catastrophic = approved_incident(&conn, &reporter, IncidentGrade::Catastrophic);
        approved_incident(&conn, &reporter, IncidentGrade::Minor);

        let report = run_escalation(&conn, &owner).unwrap();
        assert_eq!(report.escalated, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.errored, 0);

        let severe_risks = db::get_risks_for_incident(&conn, &severe).unwrap();
        assert_eq!(severe_risks.len(), 1);
        assert_eq!(severe_risks[0].severity, 4);
        assert_eq!(severe_risks[0].probability, 3);

        let cat_risks = db::get_risks_for_incident(&conn, &catastrophic).unwrap();
        assert_eq!(cat_risks[0].severity, 5);
    }

    #[test]
    fn escalation_rerun_is_a_no_op() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let owner = staff(&conn, "Q1", StaffRole::Qps);
        approved_incident(&conn, &reporter, IncidentGrade::Severe);

        let first = run_escalation(&conn, &owner).unwrap();
        assert_eq!(first.escalated, 1);

        // Candidates query already excludes linked incidents
        let second = run_escalation(&conn, &owner).unwrap();
        assert_eq!(second.escalated, 0);
        assert_eq!(second.skipped, 0);
        assert!(fetch_escalation_candidates(&conn).unwrap().is_empty());
    }
}
