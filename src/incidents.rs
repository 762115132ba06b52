//! Incident reporting — report intake, the approval gate, and the view
//! types the frontend renders.
//!
//! Reports start as drafts, are submitted into a sequential approval gate
//! (L1 QPS review, L2 quality management sign-off), and end approved or
//! rejected. Forward-only except the explicit reject.

use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions;
use crate::db;
use crate::models::enums::*;
use crate::models::*;
use crate::workflow::WorkflowError;

/// Number of sequential approval gate levels.
pub const APPROVAL_LEVELS: i32 = 2;

/// Human-readable gate name for a level.
pub fn level_name(level: i32) -> &'static str {
    match level {
        1 => "QPS review",
        2 => "Quality management",
        _ => "Unknown",
    }
}

// ═══════════════════════════════════════════
// View types — serialised to frontend
// ═══════════════════════════════════════════

/// An incident card for the register list view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentCard {
    pub id: Uuid,
    pub category: String,
    pub grade: String,
    pub status: String,
    pub approval_level: i32,
    pub pending_gate: Option<String>,
    pub patient_ref: String,
    pub patient_name: String,
    pub occurred_at: NaiveDateTime,
    pub reported_at: NaiveDateTime,
    pub location: String,
    pub description: String,
    pub reporter_name: Option<String>,
    pub open_actions: i64,
}

/// Full incident detail (expanded view).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentDetail {
    pub incident: Incident,
    pub reporter_name: Option<String>,
    pub approvals: Vec<ApprovalView>,
    pub actions: Vec<actions::ActionCard>,
    pub risks: Vec<Risk>,
}

/// Approval log entry display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalView {
    pub level: i32,
    pub gate: String,
    pub decision: String,
    pub decided_by_name: Option<String>,
    pub note: Option<String>,
    pub decided_at: NaiveDateTime,
}

/// Input for creating or editing a report draft.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentInput {
    pub category: IncidentCategory,
    pub grade: IncidentGrade,
    pub patient_ref: String,
    pub patient_name: String,
    pub patient_ward: Option<String>,
    pub occurred_at: NaiveDateTime,
    pub location: String,
    pub body_site: Option<String>,
    pub description: String,
    pub immediate_action: Option<String>,
}

fn validate_input(input: &IncidentInput) -> Result<(), WorkflowError> {
    if input.patient_ref.trim().is_empty() {
        return Err(WorkflowError::validation("patient_ref", "MRN is required"));
    }
    if input.patient_name.trim().is_empty() {
        return Err(WorkflowError::validation("patient_name", "Patient name is required"));
    }
    if input.location.trim().is_empty() {
        return Err(WorkflowError::validation("location", "Location is required"));
    }
    if input.description.trim().is_empty() {
        return Err(WorkflowError::validation("description", "Description is required"));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

/// Create a new report draft.
pub fn create_incident(
    conn: &Connection,
    reporter: &Staff,
    input: IncidentInput,
) -> Result<Incident, WorkflowError> {
    validate_input(&input)?;

    let incident = Incident {
        id: Uuid::new_v4(),
        category: input.category,
        grade: input.grade,
        status: IncidentStatus::Draft,
        approval_level: 1,
        patient: PatientRef {
            mrn: input.patient_ref,
            name: input.patient_name,
            ward: input.patient_ward,
        },
        occurred_at: input.occurred_at,
        reported_at: Local::now().naive_local(),
        location: input.location,
        body_site: input.body_site,
        description: input.description,
        immediate_action: input.immediate_action,
        reported_by: reporter.id,
    };
    db::insert_incident(conn, &incident)?;
    tracing::info!(incident = %incident.id, category = incident.category.as_str(), "Incident draft created");
    Ok(incident)
}

/// Edit a report. Only drafts are editable.
pub fn update_incident(
    conn: &Connection,
    id: &Uuid,
    input: IncidentInput,
) -> Result<Incident, WorkflowError> {
    validate_input(&input)?;

    let mut incident = db::get_incident(conn, id)?
        .ok_or_else(|| WorkflowError::not_found("Incident", id))?;
    if incident.status != IncidentStatus::Draft {
        return Err(WorkflowError::IllegalTransition(format!(
            "cannot edit a {} incident",
            incident.status.as_str()
        )));
    }

    incident.category = input.category;
    incident.grade = input.grade;
    incident.patient = PatientRef {
        mrn: input.patient_ref,
        name: input.patient_name,
        ward: input.patient_ward,
    };
    incident.occurred_at = input.occurred_at;
    incident.location = input.location;
    incident.body_site = input.body_site;
    incident.description = input.description;
    incident.immediate_action = input.immediate_action;

    db::update_incident_content(conn, &incident)?;
    Ok(incident)
}

/// Submit a draft into the approval gate.
pub fn submit_incident(conn: &Connection, id: &Uuid) -> Result<Incident, WorkflowError> {
    let incident = db::get_incident(conn, id)?
        .ok_or_else(|| WorkflowError::not_found("Incident", id))?;
    if incident.status != IncidentStatus::Draft {
        return Err(WorkflowError::IllegalTransition(format!(
            "cannot submit a {} incident",
            incident.status.as_str()
        )));
    }

    db::set_incident_gate(conn, id, IncidentStatus::Submitted, 1)?;
    tracing::info!(incident = %id, "Incident submitted for QPS review");
    db::get_incident(conn, id)?.ok_or_else(|| WorkflowError::not_found("Incident", id))
}

/// Record a decision at the incident's current gate level.
///
/// Approving the final level approves the incident; a reject at any level
/// rejects it. Both outcomes are terminal.
pub fn decide_incident(
    conn: &Connection,
    id: &Uuid,
    decider: &Staff,
    decision: ApprovalDecision,
    note: Option<String>,
) -> Result<Incident, WorkflowError> {
    let incident = db::get_incident(conn, id)?
        .ok_or_else(|| WorkflowError::not_found("Incident", id))?;
    if incident.status != IncidentStatus::Submitted {
        return Err(WorkflowError::IllegalTransition(format!(
            "cannot decide a {} incident",
            incident.status.as_str()
        )));
    }

    let level = incident.approval_level;
    if !decider.role.can_decide_level(level) {
        return Err(WorkflowError::Forbidden(format!(
            "{} may not decide the {} gate",
            decider.role.as_str(),
            level_name(level)
        )));
    }

    db::insert_approval(conn, &ApprovalRecord {
        id: Uuid::new_v4(),
        incident_id: *id,
        level,
        decision,
        decided_by: decider.id,
        note,
        decided_at: Local::now().naive_local(),
    })?;

    match decision {
        ApprovalDecision::Rejected => {
            db::set_incident_gate(conn, id, IncidentStatus::Rejected, level)?;
            tracing::info!(incident = %id, level, "Incident rejected");
        }
        ApprovalDecision::Approved if level >= APPROVAL_LEVELS => {
            db::set_incident_gate(conn, id, IncidentStatus::Approved, level)?;
            tracing::info!(incident = %id, "Incident approved");
        }
        ApprovalDecision::Approved => {
            db::set_incident_gate(conn, id, IncidentStatus::Submitted, level + 1)?;
            tracing::info!(incident = %id, next_level = level + 1, "Incident advanced to next gate");
        }
    }

    db::get_incident(conn, id)?.ok_or_else(|| WorkflowError::not_found("Incident", id))
}

// ═══════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════

pub fn fetch_incident_cards(
    conn: &Connection,
    filter: &IncidentListFilter,
) -> Result<Vec<IncidentCard>, WorkflowError> {
    let incidents = db::list_incidents(conn, filter)?;
    let mut cards = Vec::with_capacity(incidents.len());
    for incident in incidents {
        let open_actions = db::list_actions(conn, &ActionListFilter {
            incident_id: Some(incident.id),
            ..Default::default()
        })?
        .iter()
        .filter(|a| matches!(a.status, ActionStatus::Open | ActionStatus::InProgress))
        .count() as i64;

        cards.push(IncidentCard {
            id: incident.id,
            category: incident.category.as_str().into(),
            grade: incident.grade.as_str().into(),
            status: incident.status.as_str().into(),
            approval_level: incident.approval_level,
            pending_gate: (incident.status == IncidentStatus::Submitted)
                .then(|| level_name(incident.approval_level).to_string()),
            patient_ref: incident.patient.mrn,
            patient_name: incident.patient.name,
            occurred_at: incident.occurred_at,
            reported_at: incident.reported_at,
            location: incident.location,
            description: incident.description,
            reporter_name: db::staff_name(conn, &incident.reported_by),
            open_actions,
        });
    }
    Ok(cards)
}

pub fn fetch_incident_detail(
    conn: &Connection,
    id: &Uuid,
) -> Result<IncidentDetail, WorkflowError> {
    let incident = db::get_incident(conn, id)?
        .ok_or_else(|| WorkflowError::not_found("Incident", id))?;

    let approvals = db::get_approvals_for_incident(conn, id)?
        .into_iter()
        .map(|record| ApprovalView {
            level: record.level,
            gate: level_name(record.level).into(),
            decision: record.decision.as_str().into(),
            decided_by_name: db::staff_name(conn, &record.decided_by),
            note: record.note,
            decided_at: record.decided_at,
        })
        .collect();

    let now = Local::now().naive_local();
    let action_cards = actions::fetch_action_cards(conn, &ActionListFilter {
        incident_id: Some(*id),
        ..Default::default()
    }, now)?;

    let risks = db::get_risks_for_incident(conn, id)?;

    Ok(IncidentDetail {
        reporter_name: db::staff_name(conn, &incident.reported_by),
        incident,
        approvals,
        actions: action_cards,
        risks,
    })
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

    fn input() -> IncidentInput {
        IncidentInput {
            category: IncidentCategory::MedicationError,
            grade: IncidentGrade::Moderate,
            patient_ref: "MRN-000123".into(),
            patient_name: "Test Patient".into(),
            patient_ward: Some("ICU".into()),
            occurred_at: NaiveDateTime::parse_from_str("2026-02-10 03:15:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            location: "ICU bay 3".into(),
            body_site: None,
            description: "Wrong infusion rate programmed".into(),
            immediate_action: Some("Rate corrected, patient monitored".into()),
        }
    }

    #[test]
    fn create_starts_as_draft() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let incident = create_incident(&conn, &reporter, input()).unwrap();
        assert_eq!(incident.status, IncidentStatus::Draft);
        assert_eq!(incident.approval_level, 1);
    }

    #[test]
    fn blank_description_is_field_level_error() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let mut bad = input();
        bad.description = "  ".into();
        let err = create_incident(&conn, &reporter, bad).unwrap_err();
        match err {
            WorkflowError::Validation { field, .. } => assert_eq!(field, "description"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn full_approval_path_through_both_gates() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let qps = staff(&conn, "Q1", StaffRole::Qps);
        let qm = staff(&conn, "M1", StaffRole::QualityManager);

        let incident = create_incident(&conn, &reporter, input()).unwrap();
        submit_incident(&conn, &incident.id).unwrap();

        let after_l1 = decide_incident(&conn, &incident.id, &qps, ApprovalDecision::Approved, None).unwrap();
        assert_eq!(after_l1.status, IncidentStatus::Submitted);
        assert_eq!(after_l1.approval_level, 2);

        let after_l2 = decide_incident(&conn, &incident.id, &qm, ApprovalDecision::Approved, Some("Closed at QM round".into())).unwrap();
        assert_eq!(after_l2.status, IncidentStatus::Approved);

        let log = db::get_approvals_for_incident(&conn, &incident.id).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].level, 1);
        assert_eq!(log[1].level, 2);
    }

    #[test]
    fn reject_at_first_gate_is_terminal() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let qps = staff(&conn, "Q1", StaffRole::Qps);

        let incident = create_incident(&conn, &reporter, input()).unwrap();
        submit_incident(&conn, &incident.id).unwrap();
        let rejected = decide_incident(&conn, &incident.id, &qps, ApprovalDecision::Rejected, Some("Duplicate report".into())).unwrap();
        assert_eq!(rejected.status, IncidentStatus::Rejected);

        // Terminal: no further decisions, no resubmit
        assert!(decide_incident(&conn, &incident.id, &qps, ApprovalDecision::Approved, None).is_err());
        assert!(submit_incident(&conn, &incident.id).is_err());
    }

    #[test]
    fn draft_cannot_be_decided_and_submitted_cannot_be_edited() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let qps = staff(&conn, "Q1", StaffRole::Qps);

        let incident = create_incident(&conn, &reporter, input()).unwrap();
        assert!(matches!(
            decide_incident(&conn, &incident.id, &qps, ApprovalDecision::Approved, None),
            Err(WorkflowError::IllegalTransition(_))
        ));

        submit_incident(&conn, &incident.id).unwrap();
        assert!(matches!(
            update_incident(&conn, &incident.id, input()),
            Err(WorkflowError::IllegalTransition(_))
        ));
        assert!(matches!(
            submit_incident(&conn, &incident.id),
            Err(WorkflowError::IllegalTransition(_))
        ));
    }

    #[test]
    fn wrong_role_for_gate_is_forbidden() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let qps = staff(&conn, "Q1", StaffRole::Qps);
        let qm = staff(&conn, "M1", StaffRole::QualityManager);

        let incident = create_incident(&conn, &reporter, input()).unwrap();
        submit_incident(&conn, &incident.id).unwrap();

        // QM cannot decide the L1 gate, reporter cannot decide anything
        assert!(matches!(
            decide_incident(&conn, &incident.id, &qm, ApprovalDecision::Approved, None),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            decide_incident(&conn, &incident.id, &reporter, ApprovalDecision::Approved, None),
            Err(WorkflowError::Forbidden(_))
        ));

        // Admin may stand in at any gate
        let admin = staff(&conn, "A1", StaffRole::Admin);
        decide_incident(&conn, &incident.id, &admin, ApprovalDecision::Approved, None).unwrap();
    }

    #[test]
    fn detail_includes_approval_log_and_reporter() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let qps = staff(&conn, "Q1", StaffRole::Qps);

        let incident = create_incident(&conn, &reporter, input()).unwrap();
        submit_incident(&conn, &incident.id).unwrap();
        decide_incident(&conn, &incident.id, &qps, ApprovalDecision::Approved, None).unwrap();

        let detail = fetch_incident_detail(&conn, &incident.id).unwrap();
        assert_eq!(detail.approvals.len(), 1);
        assert_eq!(detail.approvals[0].gate, "QPS review");
        assert_eq!(detail.reporter_name.as_deref(), Some("Staff N1"));
        assert!(detail.actions.is_empty());
        assert!(detail.risks.is_empty());
    }

    #[test]
    fn cards_show_pending_gate_only_while_submitted() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let incident = create_incident(&conn, &reporter, input()).unwrap();

        let cards = fetch_incident_cards(&conn, &IncidentListFilter::default()).unwrap();
        assert_eq!(cards.len(), 1);
        assert!(cards[0].pending_gate.is_none());

        submit_incident(&conn, &incident.id).unwrap();
        let cards = fetch_incident_cards(&conn, &IncidentListFilter::default()).unwrap();
        assert_eq!(cards[0].pending_gate.as_deref(), Some("QPS review"));
    }
}
