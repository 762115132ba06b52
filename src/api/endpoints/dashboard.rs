//! Dashboard endpoint.

use axum::extract::State;
use axum::Extension;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::dashboard;

/// `GET /api/dashboard` — aggregate counts for the QI home screen.
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<dashboard::DashboardData>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(dashboard::fetch_dashboard(&conn)?))
}
