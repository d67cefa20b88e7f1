//! HTTP server startup and lifecycle management.

use std::io;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::server::{TRACING_TARGET_SHUTDOWN, TRACING_TARGET_STARTUP, shutdown_signal};

/// Starts an HTTP server with graceful shutdown.
///
/// Binds to the configured address and serves requests until a shutdown
/// signal is received; in-flight requests get the configured grace
/// period to complete.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server
/// encounters a fatal error during operation.
pub(crate) async fn serve_http(app: Router, server_config: ServerConfig) -> io::Result<()> {
    let addr = server_config.server_addr();
    let listener = TcpListener::bind(addr).await.inspect_err(|e| {
        tracing::error!(
            target: TRACING_TARGET_STARTUP,
            error = %e,
            addr = %addr,
            "Failed to bind server address"
        );
    })?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        addr = %addr,
        "Server is ready and listening for connections"
    );

    if server_config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_STARTUP,
            "Server is bound to all interfaces. Ensure firewall rules are properly configured."
        );
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.shutdown_timeout()))
        .await
        .inspect_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_SHUTDOWN,
                error = %e,
                "Server encountered an error"
            );
        })?;

    tracing::info!(target: TRACING_TARGET_SHUTDOWN, "Server shut down gracefully");
    Ok(())
}
