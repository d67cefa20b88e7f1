//! App [`state`] configuration.
//!
//! [`state`]: crate::service::ServiceState

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tutor_proxy::ProxyConfig;
use url::Url;

use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    use url::Url;

    /// Default upstream proxy endpoint for development.
    pub const PROXY_ENDPOINT: &str = "http://127.0.0.1:8090/";

    /// Default public base URL the login handshake links back to.
    pub const PUBLIC_BASE_URL: &str = "http://127.0.0.1:3000";

    /// Default upstream model identifier.
    pub const MODEL: &str = "4o-mini";

    /// Default sampling temperature.
    pub const TEMPERATURE: f64 = 0.7;

    /// Default generation ceiling in seconds (the upstream proxy's limit).
    pub const GENERATION_TIMEOUT_SECS: u64 = 59;

    /// Default number of retained user/assistant turns per conversation.
    pub const MAX_TURNS: usize = 20;

    pub fn proxy_endpoint() -> Url {
        Url::parse(PROXY_ENDPOINT).expect("default proxy endpoint is valid")
    }

    pub fn public_base_url() -> Url {
        Url::parse(PUBLIC_BASE_URL).expect("default public base URL is valid")
    }

    /// Default proxy API key for development.
    pub fn proxy_api_key() -> String {
        format!("tutor-dev-{}", "A".repeat(32))
    }

    /// Default JWT signing secret for development.
    pub fn auth_secret() -> String {
        "tutor-dev-secret-change-this-in-production".to_owned()
    }

    pub fn model() -> String {
        MODEL.to_owned()
    }

    pub fn temperature() -> f64 {
        TEMPERATURE
    }

    pub fn generation_timeout_secs() -> u64 {
        GENERATION_TIMEOUT_SECS
    }

    pub fn max_turns() -> usize {
        MAX_TURNS
    }

    pub fn require_auth() -> bool {
        true
    }

    pub fn transcript_path() -> std::path::PathBuf {
        "./transcripts.jsonl".into()
    }
}

/// App [`state`] configuration.
///
/// Every option can be provided via CLI arguments or environment
/// variables when the `config` feature is enabled.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(clap::Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Upstream LLM proxy endpoint.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_PROXY_ENDPOINT", default_value = defaults::PROXY_ENDPOINT)
    )]
    #[serde(default = "defaults::proxy_endpoint")]
    pub proxy_endpoint: Url,

    /// API key for the upstream LLM proxy.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_PROXY_API_KEY", default_value_t = defaults::proxy_api_key())
    )]
    #[serde(default = "defaults::proxy_api_key")]
    pub proxy_api_key: String,

    /// Ceiling in seconds for a single generation call.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_GENERATION_TIMEOUT", default_value_t = defaults::GENERATION_TIMEOUT_SECS)
    )]
    #[serde(default = "defaults::generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Upstream model identifier used for every turn.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_MODEL", default_value = defaults::MODEL)
    )]
    #[serde(default = "defaults::model")]
    pub model: String,

    /// Sampling temperature used for every turn.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_TEMPERATURE", default_value_t = defaults::TEMPERATURE)
    )]
    #[serde(default = "defaults::temperature")]
    pub temperature: f64,

    /// Shared secret used to sign and verify auth tokens.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_AUTH_SECRET", default_value_t = defaults::auth_secret())
    )]
    #[serde(default = "defaults::auth_secret")]
    pub auth_secret: String,

    /// Whether chat turns require a verified identity.
    ///
    /// The legacy deployment mode trusts every caller; production must
    /// keep this enabled.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            long,
            env = "TUTOR_REQUIRE_AUTH",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    #[serde(default = "defaults::require_auth")]
    pub require_auth: bool,

    /// Enables the development credential login path.
    ///
    /// Disabled by default; the direct-credential endpoint is not even
    /// routed unless this is set.
    #[cfg_attr(any(test, feature = "config"), arg(long, env = "TUTOR_DEV_LOGIN"))]
    #[serde(default)]
    pub dev_login_enabled: bool,

    /// Path to the system instruction file; a built-in instruction is
    /// used when unset.
    #[cfg_attr(any(test, feature = "config"), arg(long, env = "TUTOR_SYSTEM_PROMPT"))]
    #[serde(default)]
    pub system_prompt_path: Option<PathBuf>,

    /// Maximum number of retained user/assistant turns per conversation.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_MAX_TURNS", default_value_t = defaults::MAX_TURNS)
    )]
    #[serde(default = "defaults::max_turns")]
    pub max_turns: usize,

    /// Usernames enrolled in the course, comma separated.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_AUTHORIZED_USERS", value_delimiter = ',')
    )]
    #[serde(default)]
    pub authorized_users: Vec<String>,

    /// Path of the append-only transcript log.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_TRANSCRIPT_LOG", default_value = "./transcripts.jsonl")
    )]
    #[serde(default = "defaults::transcript_path")]
    pub transcript_path: PathBuf,

    /// Public base URL used when building login links for the handshake.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TUTOR_PUBLIC_URL", default_value = defaults::PUBLIC_BASE_URL)
    )]
    #[serde(default = "defaults::public_base_url")]
    pub public_base_url: Url,
}

impl ServiceConfig {
    /// Validates all configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is outside its valid range.
    pub fn validate(&self) -> Result<()> {
        if self.auth_secret.trim().is_empty() {
            return Err(Error::config("auth secret cannot be empty"));
        }

        if self.generation_timeout_secs == 0 || self.generation_timeout_secs > 300 {
            return Err(Error::config(
                "generation timeout must be between 1 and 300 seconds",
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::config("temperature must be between 0.0 and 2.0"));
        }

        if self.max_turns == 0 {
            return Err(Error::config("max turns must be greater than 0"));
        }

        Ok(())
    }

    /// Returns the proxy client configuration.
    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig::new(self.proxy_endpoint.clone(), self.proxy_api_key.clone())
            .with_timeout(Duration::from_secs(self.generation_timeout_secs))
    }

    /// Returns the per-turn chat options.
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            require_auth: self.require_auth,
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
        }
    }

    /// Returns the login handshake options.
    pub fn login_options(&self) -> LoginOptions {
        LoginOptions {
            public_base_url: self.public_base_url.clone(),
        }
    }
}

#[cfg(debug_assertions)]
impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            proxy_endpoint: defaults::proxy_endpoint(),
            proxy_api_key: defaults::proxy_api_key(),
            generation_timeout_secs: defaults::GENERATION_TIMEOUT_SECS,
            model: defaults::model(),
            temperature: defaults::TEMPERATURE,
            auth_secret: defaults::auth_secret(),
            require_auth: true,
            dev_login_enabled: false,
            system_prompt_path: None,
            max_turns: defaults::MAX_TURNS,
            authorized_users: Vec::new(),
            transcript_path: defaults::transcript_path(),
            public_base_url: defaults::public_base_url(),
        }
    }
}

/// Per-turn chat options shared with the exchange controller.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Upstream model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Whether turns require a verified identity.
    pub require_auth: bool,
    /// Ceiling for a single generation call.
    pub generation_timeout: Duration,
}

/// Login handshake options shared with the authentication handlers.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Public base URL used when building login links.
    pub public_base_url: Url,
}

impl LoginOptions {
    /// Builds the login URL a handshake session links the user to.
    #[must_use]
    pub fn login_url(&self, session_id: &str) -> String {
        format!(
            "{}/vscode-auth?session_id={}",
            self.public_base_url.as_str().trim_end_matches('/'),
            session_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.require_auth);
        assert!(!config.dev_login_enabled);
    }

    #[test]
    fn empty_secret_is_rejected() {
        let config = ServiceConfig {
            auth_secret: "  ".to_owned(),
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let config = ServiceConfig {
            temperature: 3.5,
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn login_url_embeds_session_id() {
        let options = ServiceConfig::default().login_options();
        let url = options.login_url("abc123");
        assert_eq!(url, "http://127.0.0.1:3000/vscode-auth?session_id=abc123");
    }
}
