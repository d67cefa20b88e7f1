//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig    # Host, port, shutdown
//! └── service: ServiceConfig  # Proxy, auth, conversations, transcripts
//! ```
//!
//! All configuration can be provided via CLI arguments or environment
//! variables. Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! # Configure the proxy endpoint and port
//! tutor --proxy-endpoint "https://proxy.example.edu/api" --port 8080
//!
//! # Or via environment variables
//! TUTOR_PROXY_ENDPOINT="https://proxy.example.edu/api" PORT=8080 tutor
//! ```

mod server;

use clap::Parser;
pub use server::ServerConfig;
use tutor_server::service::ServiceConfig;

/// Complete CLI configuration.
///
/// Combines both configuration groups for the tutor server:
/// - [`ServerConfig`]: network binding and lifecycle
/// - [`ServiceConfig`]: proxy, authentication and chat behavior
#[derive(Debug, Clone, Parser)]
#[command(name = "tutor")]
#[command(about = "Course tutor chat API server")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Chat service configuration (proxy, auth, conversations).
    #[clap(flatten)]
    pub service: ServiceConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_with_defaults() {
        let cli = Cli::parse_from(["tutor"]);
        assert_eq!(cli.server.port, 5000);
        assert!(cli.service.require_auth);
        assert!(!cli.service.dev_login_enabled);
    }

    #[test]
    fn cli_accepts_overrides() {
        let cli = Cli::parse_from([
            "tutor",
            "--port",
            "8080",
            "--dev-login-enabled",
            "--require-auth",
            "false",
        ]);

        assert_eq!(cli.server.port, 8080);
        assert!(cli.service.dev_login_enabled);
        assert!(!cli.service.require_auth);
    }
}
