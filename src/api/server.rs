//! API server — binds the router to a TCP listener.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::router;
use crate::core_state::CoreState;

/// Serve the API until the process is stopped.
pub async fn serve(core: Arc<CoreState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router::api_router(core);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API listening on {addr}");
    axum::serve(listener, app).await
}
