//! CAPA lifecycle — corrective actions attached to incidents.
//!
//! open → in_progress → completed → verified, with cancel out of the two
//! active states. Every transition is one explicit operator step; overdue
//! is derived at read time and never stored.

use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::models::enums::*;
use crate::models::*;
use crate::workflow::WorkflowError;

// ═══════════════════════════════════════════
// View types — serialised to frontend
// ═══════════════════════════════════════════

/// An action card for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCard {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub title: String,
    pub description: String,
    pub owner_name: Option<String>,
    pub due_date: NaiveDate,
    pub status: String,
    pub is_overdue: bool,
    pub completed_by_name: Option<String>,
    pub verified_by_name: Option<String>,
    pub verification_note: Option<String>,
    pub cancel_reason: Option<String>,
}

/// Input for attaching a new action to an incident.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionInput {
    pub incident_id: Uuid,
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
    pub due_date: NaiveDate,
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

pub fn create_action(conn: &Connection, input: ActionInput) -> Result<CorrectiveAction, WorkflowError> {
    if input.title.trim().is_empty() {
        return Err(WorkflowError::validation("title", "Title is required"));
    }
    if input.description.trim().is_empty() {
        return Err(WorkflowError::validation(
            "description",
            "Definition of done is required",
        ));
    }
    db::get_incident(conn, &input.incident_id)?
        .ok_or_else(|| WorkflowError::not_found("Incident", input.incident_id))?;
    db::get_staff(conn, &input.owner_id)?
        .ok_or_else(|| WorkflowError::not_found("Staff", input.owner_id))?;

    let action = CorrectiveAction {
        id: Uuid::new_v4(),
        incident_id: input.incident_id,
        title: input.title,
        description: input.description,
        owner_id: input.owner_id,
        due_date: input.due_date,
        status: ActionStatus::Open,
        created_at: Local::now().naive_local(),
        started_at: None,
        completed_at: None,
        completed_by: None,
        verified_at: None,
        verified_by: None,
        verification_note: None,
        cancelled_at: None,
        cancel_reason: None,
    };
    db::insert_action(conn, &action)?;
    tracing::info!(action = %action.id, incident = %action.incident_id, "Corrective action created");
    Ok(action)
}

fn load(conn: &Connection, id: &Uuid) -> Result<CorrectiveAction, WorkflowError> {
    db::get_action(conn, id)?.ok_or_else(|| WorkflowError::not_found("Action", id))
}

fn illegal(action: &CorrectiveAction, verb: &str) -> WorkflowError {
    WorkflowError::IllegalTransition(format!(
        "cannot {verb} a {} action",
        action.status.as_str()
    ))
}

/// open → in_progress.
pub fn start_action(conn: &Connection, id: &Uuid) -> Result<CorrectiveAction, WorkflowError> {
    let action = load(conn, id)?;
    if action.status != ActionStatus::Open {
        return Err(illegal(&action, "start"));
    }
    db::mark_action_started(conn, id, Local::now().naive_local())?;
    load(conn, id)
}

/// in_progress → completed.
pub fn complete_action(
    conn: &Connection,
    id: &Uuid,
    completed_by: &Staff,
) -> Result<CorrectiveAction, WorkflowError> {
    let action = load(conn, id)?;
    if action.status != ActionStatus::InProgress {
        return Err(illegal(&action, "complete"));
    }
    db::mark_action_completed(conn, id, &completed_by.id, Local::now().naive_local())?;
    tracing::info!(action = %id, by = %completed_by.badge, "Action completed");
    load(conn, id)
}

/// completed → verified. The verifier must not be the completer.
pub fn verify_action(
    conn: &Connection,
    id: &Uuid,
    verifier: &Staff,
    note: Option<String>,
) -> Result<CorrectiveAction, WorkflowError> {
    let action = load(conn, id)?;
    if action.status != ActionStatus::Completed {
        return Err(illegal(&action, "verify"));
    }
    if !verifier.role.can_verify_actions() {
        return Err(WorkflowError::Forbidden(format!(
            "{} may not verify actions",
            verifier.role.as_str()
        )));
    }
    if action.completed_by == Some(verifier.id) {
        return Err(WorkflowError::Forbidden(
            "an action cannot be verified by its own completer".into(),
        ));
    }
    db::mark_action_verified(conn, id, &verifier.id, Local::now().naive_local(), note.as_deref())?;
    tracing::info!(action = %id, by = %verifier.badge, "Action verified");
    load(conn, id)
}

/// open/in_progress → cancelled. A reason is required.
pub fn cancel_action(
    conn: &Connection,
    id: &Uuid,
    reason: &str,
) -> Result<CorrectiveAction, WorkflowError> {
    if reason.trim().is_empty() {
        return Err(WorkflowError::validation("reason", "Cancel reason is required"));
    }
    let action = load(conn, id)?;
    if !matches!(action.status, ActionStatus::Open | ActionStatus::InProgress) {
        return Err(illegal(&action, "cancel"));
    }
    db::mark_action_cancelled(conn, id, Local::now().naive_local(), reason)?;
    load(conn, id)
}

// ═══════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════

pub fn fetch_action_cards(
    conn: &Connection,
    filter: &ActionListFilter,
    now: NaiveDateTime,
) -> Result<Vec<ActionCard>, WorkflowError> {
    let mut actions = db::list_actions(conn, filter)?;
    if filter.overdue == Some(true) {
        actions.retain(|a| a.is_overdue(now));
    }

    Ok(actions
        .into_iter()
        .map(|action| ActionCard {
            is_overdue: action.is_overdue(now),
            owner_name: db::staff_name(conn, &action.owner_id),
            completed_by_name: action.completed_by.and_then(|id| db::staff_name(conn, &id)),
            verified_by_name: action.verified_by.and_then(|id| db::staff_name(conn, &id)),
            id: action.id,
            incident_id: action.incident_id,
            title: action.title,
            description: action.description,
            due_date: action.due_date,
            status: action.status.as_str().into(),
            verification_note: action.verification_note,
            cancel_reason: action.cancel_reason,
        })
        .collect())
}

/// Count of (active, overdue) actions for the dashboard.
pub fn active_and_overdue_counts(
    conn: &Connection,
    now: NaiveDateTime,
) -> Result<(i64, i64), WorkflowError> {
    let active = db::list_active_actions(conn)?;
    let overdue = active.iter().filter(|a| a.is_overdue(now)).count() as i64;
    Ok((active.len() as i64, overdue))
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

    fn incident(conn: &Connection, reporter: &Staff) -> Uuid {
        let id = Uuid::new_v4();
        db::insert_incident(conn, &Incident {
            id,
            category: IncidentCategory::Fall,
            grade: IncidentGrade::Moderate,
            status: IncidentStatus::Approved,
            approval_level: 2,
            patient: PatientRef { mrn: "MRN-1".into(), name: "P".into(), ward: None },
            occurred_at: NaiveDateTime::default(),
            reported_at: NaiveDateTime::default(),
            location: "Ward 2".into(),
            body_site: None,
            description: "fall".into(),
            immediate_action: None,
            reported_by: reporter.id,
        }).unwrap();
        id
    }

    fn action_input(incident_id: Uuid, owner: &Staff, due: NaiveDate) -> ActionInput {
        ActionInput {
            incident_id,
            title: "Install bed rails".into(),
            description: "Rails fitted on all beds in ward 2".into(),
            owner_id: owner.id,
            due_date: due,
        }
    }

    fn due_soon() -> NaiveDate {
        Local::now().date_naive() + chrono::Duration::days(14)
    }

    #[test]
    fn lifecycle_happy_path() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let owner = staff(&conn, "N2", StaffRole::Reporter);
        let verifier = staff(&conn, "Q1", StaffRole::Qps);
        let incident_id = incident(&conn, &reporter);

        let action = create_action(&conn, action_input(incident_id, &owner, due_soon())).unwrap();
        assert_eq!(action.status, ActionStatus::Open);

        let action = start_action(&conn, &action.id).unwrap();
        assert_eq!(action.status, ActionStatus::InProgress);

        let action = complete_action(&conn, &action.id, &owner).unwrap();
        assert_eq!(action.status, ActionStatus::Completed);
        assert_eq!(action.completed_by, Some(owner.id));

        let action = verify_action(&conn, &action.id, &verifier, Some("Checked on ward round".into())).unwrap();
        assert_eq!(action.status, ActionStatus::Verified);
        assert_eq!(action.verified_by, Some(verifier.id));
    }

    #[test]
    fn transitions_are_single_step() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let owner = staff(&conn, "N2", StaffRole::Reporter);
        let verifier = staff(&conn, "Q1", StaffRole::Qps);
        let incident_id = incident(&conn, &reporter);

        let action = create_action(&conn, action_input(incident_id, &owner, due_soon())).unwrap();

        // open: cannot complete or verify
        assert!(matches!(
            complete_action(&conn, &action.id, &owner),
            Err(WorkflowError::IllegalTransition(_))
        ));
        assert!(matches!(
            verify_action(&conn, &action.id, &verifier, None),
            Err(WorkflowError::IllegalTransition(_))
        ));

        start_action(&conn, &action.id).unwrap();
        // in_progress: cannot start again or verify
        assert!(start_action(&conn, &action.id).is_err());
        assert!(verify_action(&conn, &action.id, &verifier, None).is_err());
    }

    #[test]
    fn completer_cannot_verify_own_action() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let owner = staff(&conn, "Q2", StaffRole::Qps);
        let incident_id = incident(&conn, &reporter);

        let action = create_action(&conn, action_input(incident_id, &owner, due_soon())).unwrap();
        start_action(&conn, &action.id).unwrap();
        complete_action(&conn, &action.id, &owner).unwrap();

        let err = verify_action(&conn, &action.id, &owner, None).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        // A different verifier is fine
        let other = staff(&conn, "Q3", StaffRole::Qps);
        verify_action(&conn, &action.id, &other, None).unwrap();
    }

    #[test]
    fn reporter_role_cannot_verify() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let owner = staff(&conn, "N2", StaffRole::Reporter);
        let other_reporter = staff(&conn, "N3", StaffRole::Reporter);
        let incident_id = incident(&conn, &reporter);

        let action = create_action(&conn, action_input(incident_id, &owner, due_soon())).unwrap();
        start_action(&conn, &action.id).unwrap();
        complete_action(&conn, &action.id, &owner).unwrap();

        assert!(matches!(
            verify_action(&conn, &action.id, &other_reporter, None),
            Err(WorkflowError::Forbidden(_))
        ));
    }

    #[test]
    fn cancel_only_from_active_states_and_needs_reason() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let owner = staff(&conn, "N2", StaffRole::Reporter);
        let incident_id = incident(&conn, &reporter);

        let action = create_action(&conn, action_input(incident_id, &owner, due_soon())).unwrap();
        assert!(matches!(
            cancel_action(&conn, &action.id, " "),
            Err(WorkflowError::Validation { .. })
        ));

        let cancelled = cancel_action(&conn, &action.id, "Superseded by ward refit").unwrap();
        assert_eq!(cancelled.status, ActionStatus::Cancelled);

        // cancelled is terminal
        assert!(start_action(&conn, &action.id).is_err());
        assert!(cancel_action(&conn, &action.id, "again").is_err());

        // completed actions can no longer be cancelled
        let action2 = create_action(&conn, action_input(incident_id, &owner, due_soon())).unwrap();
        start_action(&conn, &action2.id).unwrap();
        complete_action(&conn, &action2.id, &owner).unwrap();
        assert!(matches!(
            cancel_action(&conn, &action2.id, "too late"),
            Err(WorkflowError::IllegalTransition(_))
        ));
    }

    #[test]
    fn overdue_filter_and_counts() {
        let conn = open_memory_database().unwrap();
        let reporter = staff(&conn, "N1", StaffRole::Reporter);
        let owner = staff(&conn, "N2", StaffRole::Reporter);
        let incident_id = incident(&conn, &reporter);

        let past = Local::now().date_naive() - chrono::Duration::days(10);
        let overdue = create_action(&conn, action_input(incident_id, &owner, past)).unwrap();
        create_action(&conn, action_input(incident_id, &owner, due_soon())).unwrap();

        // A completed action past its due date is not overdue
        let done = create_action(&conn, action_input(incident_id, &owner, past)).unwrap();
        start_action(&conn, &done.id).unwrap();
        complete_action(&conn, &done.id, &owner).unwrap();

        let now = Local::now().naive_local();
        let cards = fetch_action_cards(&conn, &ActionListFilter {
            overdue: Some(true),
            ..Default::default()
        }, now).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, overdue.id);
        assert!(cards[0].is_overdue);

        let (active, overdue_count) = active_and_overdue_counts(&conn, now).unwrap();
        assert_eq!(active, 2);
        assert_eq!(overdue_count, 1);
    }
}
