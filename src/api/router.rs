//! API router.
//!
//! Returns a composable `Router` with all routes nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Rate limiter → 2. Auth validator → 3. Audit logger

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// All routes live under `/api/`; everything except `/api/health` and
/// `/api/auth/login` requires bearer token authentication.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    // Protected routes — require auth + full middleware stack
    //
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Rate limit → Auth → Audit (innermost) → Handler
    //
    // Extension must be outermost so all middleware can access ApiContext.
    // Routes with state — .with_state() converts Router<ApiContext> → Router<()>
    // so middleware layers (which use from_fn with state=()) are compatible.
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/dashboard", get(endpoints::dashboard::get))
        .route("/incidents", get(endpoints::incidents::list).post(endpoints::incidents::create))
        .route(
            "/incidents/:id",
            get(endpoints::incidents::detail).put(endpoints::incidents::update),
        )
        .route("/incidents/:id/submit", post(endpoints::incidents::submit))
        .route("/incidents/:id/decision", post(endpoints::incidents::decide))
        .route("/actions", get(endpoints::actions::list).post(endpoints::actions::create))
        .route("/actions/:id/start", post(endpoints::actions::start))
        .route("/actions/:id/complete", post(endpoints::actions::complete))
        .route("/actions/:id/verify", post(endpoints::actions::verify))
        .route("/actions/:id/cancel", post(endpoints::actions::cancel))
        .route("/risks", get(endpoints::risks::list).post(endpoints::risks::create))
        .route("/risks/matrix", get(endpoints::risks::matrix))
        .route(
            "/risks/escalation/candidates",
            get(endpoints::risks::escalation_candidates),
        )
        .route("/risks/escalation/run", post(endpoints::risks::escalation_run))
        .route("/risks/:id", get(endpoints::risks::detail).put(endpoints::risks::update))
        .route("/indicators", get(endpoints::indicators::list).post(endpoints::indicators::create))
        .route("/indicators/:id", get(endpoints::indicators::detail))
        .route("/indicators/:id/values", post(endpoints::indicators::record_value))
        .route(
            "/indicators/:id/values/:value_id/verify",
            post(endpoints::indicators::verify_value),
        )
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (rate-limited and audited, no auth required)
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx));

    // The frontend is served from a different origin on the ward network.
    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(CorsLayer::permissive())
}
