//! Risk register endpoints — scoring, the matrix, and escalation.

use axum::extract::{Path, Query, State};
use axum::Extension;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::endpoints::current_staff;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::models::{Incident, RiskListFilter};
use crate::risks;

#[derive(Serialize)]
pub struct RisksResponse {
    pub risks: Vec<risks::RiskCard>,
    pub total: usize,
    pub last_updated: String,
}

/// `GET /api/risks` — register list; `?level=critical` filters by the
/// derived band.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(filter): Query<RiskListFilter>,
) -> Result<Json<RisksResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let cards = risks::fetch_risk_cards(&conn, &filter)?;

    Ok(Json(RisksResponse {
        total: cards.len(),
        risks: cards,
        last_updated: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /api/risks` — manual register entry.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Json(input): Json<risks::RiskInput>,
) -> Result<Json<risks::RiskCard>, ApiError> {
    let conn = ctx.core.open_db()?;
    let risk = risks::create_risk(&conn, input)?;
    Ok(Json(risks::fetch_risk_card(&conn, &risk.id)?))
}

/// `GET /api/risks/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<risks::RiskCard>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(risks::fetch_risk_card(&conn, &id)?))
}

/// `PUT /api/risks/:id` — rescoring recomputes score and level.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<risks::RiskInput>,
) -> Result<Json<risks::RiskCard>, ApiError> {
    let conn = ctx.core.open_db()?;
    risks::update_risk(&conn, &id, input)?;
    Ok(Json(risks::fetch_risk_card(&conn, &id)?))
}

/// `GET /api/risks/matrix` — the 5×5 probability/severity grid.
pub async fn matrix(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<risks::RiskMatrix>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(risks::fetch_matrix(&conn)?))
}

#[derive(Serialize)]
pub struct CandidatesResponse {
    pub candidates: Vec<Incident>,
    pub total: usize,
}

/// `GET /api/risks/escalation/candidates` — incidents the next batch
/// would escalate.
pub async fn escalation_candidates(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let candidates = risks::fetch_escalation_candidates(&conn)?;
    Ok(Json(CandidatesResponse {
        total: candidates.len(),
        candidates,
    }))
}

/// `POST /api/risks/escalation/run` — run the batch; the acting staff
/// member becomes owner of the created entries.
pub async fn escalation_run(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
) -> Result<Json<risks::EscalationReport>, ApiError> {
    let conn = ctx.core.open_db()?;
    let owner = current_staff(&conn, &staff)?;
    if !owner.role.can_verify_actions() {
        return Err(ApiError::Forbidden(format!(
            "{} may not run risk escalation",
            owner.role.as_str()
        )));
    }
    Ok(Json(risks::run_escalation(&conn, &owner)?))
}
