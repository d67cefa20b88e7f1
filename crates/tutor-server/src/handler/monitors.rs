//! Health check handler.

use axum::Json;
use axum::routing::get;
use axum::Router;

use crate::handler::response::HealthReply;
use crate::service::ServiceState;

/// Returns the static liveness payload.
///
/// There are no dependency probes here: the upstream proxy is checked
/// lazily per turn, and everything else lives in process memory.
async fn health() -> Json<HealthReply> {
    Json(HealthReply::healthy())
}

/// Returns a [`Router`] with all health monitoring routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health))
}
