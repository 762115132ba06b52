//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, validates against the
//! session registry, and injects `StaffContext` into request extensions
//! for downstream handlers. A 401 tells the frontend to clear its local
//! session and return to login.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{hash_token, ApiContext, StaffContext};

/// Require a valid staff session token.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    // 1. Extract bearer token
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?
        .to_string();
    let token_hash = hash_token(&token);

    // 2. Validate against the session registry
    let session = {
        let mut sessions = ctx
            .core
            .write_sessions()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        sessions.validate(&token_hash).ok_or(ApiError::Unauthorized)?
    }; // RwLockWriteGuard dropped here, before any .await

    // 3. Inject staff context for downstream handlers
    req.extensions_mut().insert(StaffContext {
        staff_id: session.staff_id,
        badge: session.badge,
        name: session.name,
        role: session.role,
        token_hash,
    });

    // 4. Process request
    let mut response = next.run(req).await;

    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}
