//! Staff login and logout.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{generate_token, hash_token, ApiContext, StaffContext};
use crate::db;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub badge: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub staff: StaffSummary,
}

#[derive(Serialize)]
pub struct StaffSummary {
    pub id: Uuid,
    pub badge: String,
    pub name: String,
    pub role: String,
}

/// `POST /api/auth/login` — badge + password → session token.
///
/// Repeated failures lock the badge out; the response for a locked badge
/// is indistinguishable from a wrong password.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if req.badge.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("badge and password are required".into()));
    }

    {
        let lockout = ctx
            .login_lockout
            .lock()
            .map_err(|_| ApiError::Internal("lockout lock".into()))?;
        if lockout.is_locked(&req.badge) {
            return Err(ApiError::Unauthorized);
        }
    }

    let conn = ctx.core.open_db()?;
    let staff = db::get_staff_by_badge(&conn, &req.badge)?
        .filter(|s| s.active)
        .filter(|s| s.verify_password(&req.password));

    let staff = match staff {
        Some(staff) => staff,
        None => {
            if let Ok(mut lockout) = ctx.login_lockout.lock() {
                lockout.record_failure(&req.badge);
            }
            tracing::warn!(badge = %req.badge, "Failed login attempt");
            return Err(ApiError::Unauthorized);
        }
    };

    if let Ok(mut lockout) = ctx.login_lockout.lock() {
        lockout.clear(&req.badge);
    }

    let token = generate_token();
    {
        let mut sessions = ctx
            .core
            .write_sessions()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        sessions.start(&staff, hash_token(&token));
    }

    tracing::info!(badge = %staff.badge, role = staff.role.as_str(), "Staff logged in");
    Ok(Json(LoginResponse {
        token,
        staff: StaffSummary {
            id: staff.id,
            badge: staff.badge,
            name: staff.name,
            role: staff.role.as_str().into(),
        },
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// `POST /api/auth/logout` — revoke the presented session token.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let revoked = {
        let mut sessions = ctx
            .core
            .write_sessions()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        sessions.revoke(&staff.token_hash)
    };
    tracing::info!(badge = %staff.badge, "Staff logged out");
    Ok(Json(LogoutResponse { logged_out: revoked }))
}
