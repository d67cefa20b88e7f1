//! Login handshake session store.
//!
//! The editor extension cannot drive the reverse-proxy login itself, so it
//! opens a handshake: the server hands out a short-lived session id, the
//! user authenticates in a browser, the browser callback completes the
//! session with an issued token, and the extension polls until it can
//! collect the result.
//!
//! The browser callback and the polling client mutate the same entry from
//! independent flows, so every transition is compare-and-set: a session
//! leaves `Pending` exactly once, and terminal states are immutable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Tracing target for login handshake operations.
const TRACING_TARGET: &str = "tutor_server::service::login";

/// Fixed lifetime of a pending login handshake.
pub const LOGIN_SESSION_TTL: Duration = Duration::from_secs(5 * 60);

/// State of one login handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// Waiting for the browser callback.
    Pending,
    /// Completed with an issued token.
    Completed {
        /// The issued bearer token.
        token: String,
        /// The authenticated username.
        username: String,
    },
    /// The identity verification step failed.
    Failed,
}

impl LoginState {
    /// Returns `true` once the session can no longer transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Outcome of a compare-and-set transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The transition was applied.
    Applied,
    /// The session does not exist or has expired.
    NotFound,
    /// The session already reached a terminal state; first writer wins.
    AlreadyTerminal,
}

#[derive(Debug)]
struct LoginSession {
    state: LoginState,
    expires_at: Instant,
}

impl LoginSession {
    fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

/// In-memory store of pending login handshakes.
///
/// Entries expire after [`LOGIN_SESSION_TTL`]; expired entries are purged
/// opportunistically on every store access, so an expired session is
/// indistinguishable from one that never existed.
///
/// This type is cheap to clone and can be shared across threads.
#[derive(Debug, Clone)]
pub struct LoginSessionStore {
    inner: Arc<Mutex<HashMap<String, LoginSession>>>,
    ttl: Duration,
}

impl Default for LoginSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginSessionStore {
    /// Creates a new store with the default session TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(LOGIN_SESSION_TTL)
    }

    /// Creates a new store with a custom session TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Starts a new pending handshake and returns its session id.
    pub fn create(&self) -> String {
        let session_id = Uuid::new_v4().simple().to_string();
        let session = LoginSession {
            state: LoginState::Pending,
            expires_at: Instant::now() + self.ttl,
        };

        let mut sessions = self.inner.lock().expect("login store lock poisoned");
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(session_id.clone(), session);

        tracing::debug!(
            target: TRACING_TARGET,
            session_id = %session_id,
            pending = sessions.len(),
            "Created login handshake session"
        );

        session_id
    }

    /// Completes a pending handshake with an issued token.
    ///
    /// First writer wins: the current state is checked under the store
    /// lock before mutating, so a second completion attempt observes
    /// [`Transition::AlreadyTerminal`].
    pub fn complete(
        &self,
        session_id: &str,
        token: impl Into<String>,
        username: impl Into<String>,
    ) -> Transition {
        self.transition(session_id, LoginState::Completed {
            token: token.into(),
            username: username.into(),
        })
    }

    /// Marks a pending handshake as failed.
    pub fn fail(&self, session_id: &str) -> Transition {
        self.transition(session_id, LoginState::Failed)
    }

    /// Returns the current state of a handshake.
    ///
    /// Returns `None` once the entry has expired or never existed; the
    /// two cases are indistinguishable by design.
    pub fn status(&self, session_id: &str) -> Option<LoginState> {
        let mut sessions = self.inner.lock().expect("login store lock poisoned");
        sessions.retain(|_, s| !s.is_expired());
        sessions.get(session_id).map(|s| s.state.clone())
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut sessions = self.inner.lock().expect("login store lock poisoned");
        sessions.retain(|_, s| !s.is_expired());
        sessions.len()
    }

    /// Returns `true` if there are no live sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn transition(&self, session_id: &str, next: LoginState) -> Transition {
        let mut sessions = self.inner.lock().expect("login store lock poisoned");
        sessions.retain(|_, s| !s.is_expired());

        let Some(session) = sessions.get_mut(session_id) else {
            return Transition::NotFound;
        };

        if session.state.is_terminal() {
            tracing::warn!(
                target: TRACING_TARGET,
                session_id = %session_id,
                "Rejected transition on terminal login session"
            );
            return Transition::AlreadyTerminal;
        }

        session.state = next;
        Transition::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_session_is_pending() {
        let store = LoginSessionStore::new();
        let id = store.create();

        assert_eq!(store.status(&id), Some(LoginState::Pending));
    }

    #[test]
    fn completion_succeeds_exactly_once() {
        let store = LoginSessionStore::new();
        let id = store.create();

        assert_eq!(store.complete(&id, "token-a", "alice"), Transition::Applied);
        assert_eq!(
            store.complete(&id, "token-b", "mallory"),
            Transition::AlreadyTerminal
        );

        // The first writer's result is the one that sticks.
        match store.status(&id) {
            Some(LoginState::Completed { token, username }) => {
                assert_eq!(token, "token-a");
                assert_eq!(username, "alice");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn failure_is_terminal_too() {
        let store = LoginSessionStore::new();
        let id = store.create();

        assert_eq!(store.fail(&id), Transition::Applied);
        assert_eq!(store.complete(&id, "t", "u"), Transition::AlreadyTerminal);
        assert_eq!(store.status(&id), Some(LoginState::Failed));
    }

    #[test]
    fn unknown_session_is_not_found() {
        let store = LoginSessionStore::new();
        assert_eq!(store.complete("missing", "t", "u"), Transition::NotFound);
        assert_eq!(store.status("missing"), None);
    }

    #[test]
    fn expired_sessions_are_indistinguishable_from_unknown() {
        let store = LoginSessionStore::with_ttl(Duration::ZERO);
        let id = store.create();

        assert_eq!(store.status(&id), None);
        assert_eq!(store.complete(&id, "t", "u"), Transition::NotFound);
        assert!(store.is_empty());
    }
}
