//! QI indicator endpoints.

use axum::extract::{Path, State};
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::current_staff;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::indicators;
use crate::models::{Indicator, IndicatorValue};

#[derive(Serialize)]
pub struct IndicatorsResponse {
    pub indicators: Vec<indicators::IndicatorSummary>,
    pub last_updated: String,
}

/// `GET /api/indicators` — all indicators with their latest value.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
) -> Result<Json<IndicatorsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(IndicatorsResponse {
        indicators: indicators::fetch_indicator_summaries(&conn)?,
        last_updated: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /api/indicators`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Json(input): Json<indicators::IndicatorInput>,
) -> Result<Json<Indicator>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(indicators::create_indicator(&conn, input)?))
}

/// `GET /api/indicators/:id` — indicator with full value history.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<indicators::IndicatorDetail>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(indicators::fetch_indicator_detail(&conn, &id)?))
}

#[derive(Deserialize)]
pub struct RecordValueRequest {
    pub period: String,
    pub value: f64,
}

/// `POST /api/indicators/:id/values` — record a period value.
pub async fn record_value(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordValueRequest>,
) -> Result<Json<IndicatorValue>, ApiError> {
    let conn = ctx.core.open_db()?;
    let recorder = current_staff(&conn, &staff)?;
    Ok(Json(indicators::record_value(&conn, &id, &req.period, req.value, &recorder)?))
}

/// `POST /api/indicators/:id/values/:value_id/verify` — freeze a value.
pub async fn verify_value(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path((_id, value_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<IndicatorValue>, ApiError> {
    let conn = ctx.core.open_db()?;
    let verifier = current_staff(&conn, &staff)?;
    Ok(Json(indicators::verify_value(&conn, &value_id, &verifier)?))
}
