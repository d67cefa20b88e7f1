//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod authentication;
mod chat;
mod error;
mod monitors;
pub mod request;
pub mod response;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, ErrorResponse, Result};
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes(state: ServiceState) -> Router {
    Router::new()
        .merge(chat::routes())
        .merge(authentication::routes(&state))
        .merge(monitors::routes())
        .fallback(fallback)
        .with_state(state)
}

#[cfg(test)]
mod test {
    use axum_test::TestServer;
    use tutor_proxy::MockProxy;

    use crate::handler::routes;
    use crate::service::{ServiceConfig, ServiceState};

    /// Returns a new [`TestServer`] over the full router with a mock proxy.
    pub fn create_test_server(config: ServiceConfig) -> anyhow::Result<TestServer> {
        let state = ServiceState::with_proxy(config, MockProxy::default().into_service())?;
        let server = TestServer::new(routes(state))?;
        Ok(server)
    }

    #[tokio::test]
    async fn handlers() -> anyhow::Result<()> {
        let server = create_test_server(ServiceConfig::default())?;
        let response = server.get("/health").await;
        response.assert_status_ok();
        Ok(())
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() -> anyhow::Result<()> {
        let server = create_test_server(ServiceConfig::default())?;
        let response = server.get("/definitely-not-a-route").await;
        response.assert_status_not_found();
        Ok(())
    }

    #[tokio::test]
    async fn direct_login_route_is_absent_by_default() -> anyhow::Result<()> {
        let server = create_test_server(ServiceConfig::default())?;
        let response = server.post("/vscode-direct-auth").await;
        response.assert_status_not_found();
        Ok(())
    }
}
