//! Corrective action endpoints — the CAPA lifecycle.

use axum::extract::{Path, Query, State};
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions;
use crate::api::endpoints::current_staff;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::models::{ActionListFilter, CorrectiveAction};

#[derive(Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<actions::ActionCard>,
    pub total: usize,
    pub last_updated: String,
}

/// `GET /api/actions` — filterable list; `?overdue=true` keeps only
/// actions past their due date.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Query(filter): Query<ActionListFilter>,
) -> Result<Json<ActionsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let now = chrono::Local::now().naive_local();
    let cards = actions::fetch_action_cards(&conn, &filter, now)?;

    Ok(Json(ActionsResponse {
        total: cards.len(),
        actions: cards,
        last_updated: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /api/actions` — attach a new action to an incident.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Json(input): Json<actions::ActionInput>,
) -> Result<Json<CorrectiveAction>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(actions::create_action(&conn, input)?))
}

/// `POST /api/actions/:id/start`
pub async fn start(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<CorrectiveAction>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(actions::start_action(&conn, &id)?))
}

/// `POST /api/actions/:id/complete` — the acting staff member is the
/// completer of record.
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<CorrectiveAction>, ApiError> {
    let conn = ctx.core.open_db()?;
    let completer = current_staff(&conn, &staff)?;
    Ok(Json(actions::complete_action(&conn, &id, &completer)?))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub note: Option<String>,
}

/// `POST /api/actions/:id/verify` — second-person check of a completed
/// action.
pub async fn verify(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<CorrectiveAction>, ApiError> {
    let conn = ctx.core.open_db()?;
    let verifier = current_staff(&conn, &staff)?;
    Ok(Json(actions::verify_action(&conn, &id, &verifier, req.note)?))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// `POST /api/actions/:id/cancel`
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CorrectiveAction>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(actions::cancel_action(&conn, &id, &req.reason)?))
}
