//! Configuration for the proxy client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default timeout for proxy requests.
///
/// The upstream proxy documents a ~59 second ceiling for generation calls;
/// anything slower is treated as a failed turn rather than left hanging.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(59);

/// Configuration for the upstream LLM proxy client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ProxyConfig {
    /// Endpoint the proxy listens on. All request types post to this URL.
    pub endpoint: Url,

    /// API key sent in the `x-api-key` header.
    pub api_key: String,

    /// Timeout applied to every proxy request.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// User-Agent header to send with requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_user_agent() -> String {
    format!("tutor/{}", env!("CARGO_PKG_VERSION"))
}

impl ProxyConfig {
    /// Creates a new configuration for the given endpoint and API key.
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("proxy API key cannot be empty".to_owned()));
        }

        if self.timeout.is_zero() {
            return Err(Error::Config("proxy timeout cannot be zero".to_owned()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://proxy.example.edu/api").unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = ProxyConfig::new(endpoint(), "key");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.user_agent.contains("tutor"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let config = ProxyConfig::new(endpoint(), "  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = ProxyConfig::new(endpoint(), "key").with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
