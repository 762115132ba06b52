pub mod actions;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod incidents;
pub mod indicators;
pub mod risks;

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::api::types::StaffContext;
use crate::db;
use crate::models::Staff;

/// Load the acting staff record for an authenticated request.
/// A deactivated account invalidates the session even if its token is live.
pub(crate) fn current_staff(conn: &Connection, ctx: &StaffContext) -> Result<Staff, ApiError> {
    db::get_staff(conn, &ctx.staff_id)?
        .filter(|s| s.active)
        .ok_or(ApiError::Unauthorized)
}
