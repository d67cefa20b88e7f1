//! Internal error types for tutor-proxy.

use thiserror::Error;

/// Result type alias for tutor-proxy operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Internal error type for tutor-proxy operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The proxy answered with a non-success status code.
    #[error("proxy returned status {0}")]
    Status(reqwest::StatusCode),

    /// The proxy answered with a payload we could not decode.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this error was caused by a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Reqwest(e) if e.is_timeout())
    }

    /// Returns `true` if this error was caused by a failed connection.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Reqwest(e) if e.is_connect())
    }
}
