//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// `GET /api/health` — liveness check for the frontend.
pub async fn check(
    State(ctx): State<ApiContext>,
) -> Result<Json<HealthResponse>, ApiError> {
    let database = ctx.core.open_db().is_ok();

    Ok(Json(HealthResponse {
        status: "ok",
        database,
        version: crate::config::APP_VERSION,
    }))
}
