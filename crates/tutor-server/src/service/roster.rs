//! Course enrollment roster.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

/// Tracing target for roster checks.
const TRACING_TARGET: &str = "tutor_server::service::roster";

/// Username shape admitted in development mode.
const DEV_USERNAME_PATTERN: &str = "^[a-zA-Z][a-zA-Z0-9]{2,15}$";

/// Roster of usernames allowed to use the tutor.
///
/// Authentication proves who the caller is; the roster decides whether
/// that person is enrolled. In development mode any plausible-looking
/// username is admitted so the flows can be exercised without a real
/// enrollment list.
///
/// This type is cheap to clone and can be shared across threads.
#[derive(Debug, Clone)]
pub struct CourseRoster {
    inner: Arc<RosterInner>,
}

#[derive(Debug)]
struct RosterInner {
    allowed: HashSet<String>,
    dev_pattern: Option<Regex>,
}

impl CourseRoster {
    /// Creates a roster from the configured usernames.
    #[must_use]
    pub fn new(authorized_users: &[String], dev_mode: bool) -> Self {
        let allowed: HashSet<String> = authorized_users
            .iter()
            .map(|user| user.trim().to_lowercase())
            .filter(|user| !user.is_empty())
            .collect();

        let dev_pattern = dev_mode.then(|| {
            Regex::new(DEV_USERNAME_PATTERN).expect("dev username pattern is valid")
        });

        tracing::debug!(
            target: TRACING_TARGET,
            roster_size = allowed.len(),
            dev_mode,
            "Course roster initialized"
        );

        Self {
            inner: Arc::new(RosterInner {
                allowed,
                dev_pattern,
            }),
        }
    }

    /// Checks whether a username is enrolled.
    #[must_use]
    pub fn is_authorized(&self, username: &str) -> bool {
        let username = username.trim().to_lowercase();

        if self.inner.allowed.contains(&username) {
            return true;
        }

        if let Some(pattern) = &self.inner.dev_pattern
            && pattern.is_match(&username)
        {
            tracing::debug!(
                target: TRACING_TARGET,
                username = %username,
                "Development mode: admitting user"
            );
            return true;
        }

        tracing::warn!(
            target: TRACING_TARGET,
            username = %username,
            "User not on the course roster"
        );
        false
    }
}
