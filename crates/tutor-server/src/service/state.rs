//! Application state and dependency injection.

use tutor_proxy::{ProxyClient, ProxyService};

use crate::extract::auth::{AuthKeys, IdentityVerifier};
use crate::service::{
    ChatOptions, ConversationStore, CourseRoster, LoginOptions, LoginSessionStore, Result,
    ServiceConfig, SystemPrompt, TranscriptLogger,
};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    proxy: ProxyService,
    conversations: ConversationStore,
    login_sessions: LoginSessionStore,
    transcripts: TranscriptLogger,

    auth_keys: AuthKeys,
    identity: IdentityVerifier,
    roster: CourseRoster,
    chat_options: ChatOptions,
    login_options: LoginOptions,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Builds the real proxy client; use [`Self::with_proxy`] to inject a
    /// different provider (tests use a mock).
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        let client = ProxyClient::new(config.proxy_config())
            .map_err(|e| crate::Error::external("proxy", e.to_string()))?;
        Self::with_proxy(config, ProxyService::from_provider(client))
    }

    /// Initializes application state with the given proxy service.
    pub fn with_proxy(config: ServiceConfig, proxy: ProxyService) -> Result<Self> {
        config.validate()?;

        let prompt = SystemPrompt::load(
            config.system_prompt_path.as_deref(),
            config.dev_login_enabled,
        )?;

        let service_state = Self {
            proxy,
            conversations: ConversationStore::new(prompt, config.max_turns),
            login_sessions: LoginSessionStore::new(),
            transcripts: TranscriptLogger::jsonl(config.transcript_path.clone()),

            auth_keys: AuthKeys::from_secret(&config.auth_secret),
            identity: IdentityVerifier::from_dev_flag(config.dev_login_enabled),
            roster: CourseRoster::new(&config.authorized_users, config.dev_login_enabled),
            chat_options: config.chat_options(),
            login_options: config.login_options(),
        };

        Ok(service_state)
    }

    /// Returns `true` when the development credential path is reachable.
    #[must_use]
    pub fn dev_login_enabled(&self) -> bool {
        self.identity.dev_login_enabled()
    }

    /// Returns the conversation store.
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Returns the login handshake store.
    pub fn login_sessions(&self) -> &LoginSessionStore {
        &self.login_sessions
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+ $(,)?) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(proxy: ProxyService);
impl_di!(conversations: ConversationStore);
impl_di!(login_sessions: LoginSessionStore);
impl_di!(transcripts: TranscriptLogger);

impl_di!(auth_keys: AuthKeys);
impl_di!(identity: IdentityVerifier);
impl_di!(roster: CourseRoster);
impl_di!(chat_options: ChatOptions);
impl_di!(login_options: LoginOptions);
