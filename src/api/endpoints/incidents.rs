//! Incident endpoints — report intake and the approval gate.

use axum::extract::{Path, Query, State};
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::current_staff;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::incidents;
use crate::models::enums::ApprovalDecision;
use crate::models::{Incident, IncidentListFilter};

#[derive(Serialize)]
pub struct IncidentsResponse {
    pub incidents: Vec<incidents::IncidentCard>,
    pub total: usize,
    pub last_updated: String,
}

/// `GET /api/incidents` — filterable register list.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(filter): Query<IncidentListFilter>,
) -> Result<Json<IncidentsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let cards = incidents::fetch_incident_cards(&conn, &filter)?;

    Ok(Json(IncidentsResponse {
        total: cards.len(),
        incidents: cards,
        last_updated: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /api/incidents` — create a report draft.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Json(input): Json<incidents::IncidentInput>,
) -> Result<Json<Incident>, ApiError> {
    let conn = ctx.core.open_db()?;
    let reporter = current_staff(&conn, &staff)?;
    let incident = incidents::create_incident(&conn, &reporter, input)?;
    Ok(Json(incident))
}

/// `GET /api/incidents/:id` — full detail with actions, risks and the
/// approval log.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<incidents::IncidentDetail>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(incidents::fetch_incident_detail(&conn, &id)?))
}

/// `PUT /api/incidents/:id` — edit a draft.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<incidents::IncidentInput>,
) -> Result<Json<Incident>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(incidents::update_incident(&conn, &id, input)?))
}

/// `POST /api/incidents/:id/submit` — into the approval gate.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Incident>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(incidents::submit_incident(&conn, &id)?))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: ApprovalDecision,
    pub note: Option<String>,
}

/// `POST /api/incidents/:id/decision` — approve or reject at the current
/// gate level.
pub async fn decide(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<Incident>, ApiError> {
    let conn = ctx.core.open_db()?;
    let decider = current_staff(&conn, &staff)?;
    let incident = incidents::decide_incident(&conn, &id, &decider, req.decision, req.note)?;
    Ok(Json(incident))
}
