//! Shared helpers for integration tests.

use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;
use tutor_proxy::MockProxy;
use tutor_server::handler::routes;
use tutor_server::service::{ServiceConfig, ServiceState};

/// Development-mode configuration writing transcripts into a temp dir.
pub fn dev_config(tmp: &TempDir) -> ServiceConfig {
    ServiceConfig {
        dev_login_enabled: true,
        auth_secret: "integration-test-secret".to_owned(),
        transcript_path: tmp.path().join("transcripts.jsonl"),
        ..ServiceConfig::default()
    }
}

/// Builds a test server over the full router with a mock proxy, returning
/// the state so tests can inspect conversations and sessions.
pub fn server_with_state(
    config: ServiceConfig,
    proxy: MockProxy,
) -> anyhow::Result<(TestServer, ServiceState)> {
    let state = ServiceState::with_proxy(config, proxy.into_service())?;
    let server = TestServer::new(routes(state.clone()))?;
    Ok((server, state))
}

/// Parses the `data: <json>` records out of an SSE body.
pub fn parse_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|json| serde_json::from_str(json).expect("stream record should be valid JSON"))
        .collect()
}
