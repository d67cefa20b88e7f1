#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tutor_server::handler::routes;
use tutor_server::service::ServiceState;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "tutor_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "tutor_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "tutor_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();
    log_startup_info(&cli);

    cli.server
        .validate()
        .context("invalid server configuration")?;

    let state = ServiceState::from_config(cli.service).context("failed to create service state")?;
    let router = create_router(state);

    server::serve(router, cli.server).await?;

    Ok(())
}

/// Creates the router with the middleware layers applied.
///
/// CORS is permissive because the browser clients are served from a
/// separate origin; the reverse proxy in front of production restricts
/// reachable origins.
fn create_router(state: ServiceState) -> Router {
    routes(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Initializes tracing with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Logs startup information.
fn log_startup_info(cli: &Cli) {
    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting tutor server"
    );

    tracing::debug!(
        target: TRACING_TARGET_SERVER_STARTUP,
        pid = process::id(),
        arch = std::env::consts::ARCH,
        os = std::env::consts::OS,
        "build information"
    );

    tracing::info!(
        target: TRACING_TARGET_CONFIG,
        host = %cli.server.host,
        port = cli.server.port,
        model = %cli.service.model,
        require_auth = cli.service.require_auth,
        dev_login = cli.service.dev_login_enabled,
        "server configuration"
    );
}
