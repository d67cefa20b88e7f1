//! Identity verification for web and development login flows.
//!
//! Production deployments sit behind a reverse proxy that performs the
//! actual credential check and injects the verified username into a
//! trusted request header. The development variant accepts a direct
//! username/password pair but applies only a syntactic check; it exists so
//! the editor extension can be exercised without the proxy and must be
//! explicitly enabled at process start.

use axum::http::HeaderMap;
use thiserror::Error;

use crate::TRACING_TARGET_AUTHENTICATION;

/// Header the reverse-proxy authentication layer injects after login.
pub const TRUSTED_USER_HEADER: &str = "x-remote-user";

/// Minimum accepted username length for the development check.
const MIN_USERNAME_LEN: usize = 3;

/// Reasons identity verification can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// No trusted upstream identity header was present.
    #[error("no-upstream-identity")]
    NoUpstreamIdentity,

    /// Credential login attempted while the development path is disabled.
    #[error("dev-login-disabled")]
    DevLoginDisabled,

    /// The supplied credentials failed the syntactic check.
    #[error("invalid-credentials")]
    InvalidCredentials,
}

/// Who-is-this-user checks, selected once at process start.
///
/// The variant is fixed by configuration when the state is built; call
/// sites never branch on an ambient mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityVerifier {
    /// Trust the reverse-proxy-injected [`TRUSTED_USER_HEADER`].
    TrustedHeader,

    /// Additionally accept direct username/password pairs after a
    /// syntactic check only. This is a deliberately weakened path for
    /// development setups.
    DevCredentials,
}

impl IdentityVerifier {
    /// Selects the verifier variant for the given configuration switch.
    #[must_use]
    pub fn from_dev_flag(dev_login_enabled: bool) -> Self {
        if dev_login_enabled {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                "Development credential login is ENABLED; do not use in production"
            );
            Self::DevCredentials
        } else {
            Self::TrustedHeader
        }
    }

    /// Returns `true` when the development credential path is reachable.
    #[must_use]
    pub fn dev_login_enabled(&self) -> bool {
        matches!(self, Self::DevCredentials)
    }

    /// Extracts the upstream-verified username from request headers.
    ///
    /// Presence of the trusted header is proof of identity; the value is
    /// normalized to a trimmed, lower-cased username.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NoUpstreamIdentity`] when the header is
    /// absent or empty.
    pub fn verify_header(&self, headers: &HeaderMap) -> Result<String, IdentityError> {
        let username = headers
            .get(TRUSTED_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(IdentityError::NoUpstreamIdentity)?;

        let username = username.to_lowercase();
        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            username = %username,
            "Verified upstream-injected identity"
        );

        Ok(username)
    }

    /// Verifies a direct username/password pair.
    ///
    /// This is **not** a real credential check: any syntactically valid
    /// pair is accepted. Unreachable unless the development variant was
    /// selected at startup.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::DevLoginDisabled`] on the production
    /// variant and [`IdentityError::InvalidCredentials`] when the pair
    /// fails the syntactic check.
    pub fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, IdentityError> {
        if !self.dev_login_enabled() {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                "Credential login attempted while development login is disabled"
            );
            return Err(IdentityError::DevLoginDisabled);
        }

        let username = username.trim().to_lowercase();
        if username.len() < MIN_USERNAME_LEN || password.trim().is_empty() {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                username = %username,
                "Development credentials failed the syntactic check"
            );
            return Err(IdentityError::InvalidCredentials);
        }

        tracing::info!(
            target: TRACING_TARGET_AUTHENTICATION,
            username = %username,
            "Development credential login accepted"
        );

        Ok(username)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers_with_user(user: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TRUSTED_USER_HEADER, HeaderValue::from_str(user).unwrap());
        headers
    }

    #[test]
    fn trusted_header_is_accepted() {
        let verifier = IdentityVerifier::TrustedHeader;
        let username = verifier.verify_header(&headers_with_user("Student01")).unwrap();
        assert_eq!(username, "student01");
    }

    #[test]
    fn missing_header_fails() {
        let verifier = IdentityVerifier::TrustedHeader;
        let result = verifier.verify_header(&HeaderMap::new());
        assert_eq!(result, Err(IdentityError::NoUpstreamIdentity));
    }

    #[test]
    fn empty_header_fails() {
        let verifier = IdentityVerifier::TrustedHeader;
        let result = verifier.verify_header(&headers_with_user("  "));
        assert_eq!(result, Err(IdentityError::NoUpstreamIdentity));
    }

    #[test]
    fn credentials_unreachable_without_dev_flag() {
        let verifier = IdentityVerifier::from_dev_flag(false);
        let result = verifier.verify_credentials("student01", "hunter2");
        assert_eq!(result, Err(IdentityError::DevLoginDisabled));
    }

    #[test]
    fn dev_credentials_apply_syntactic_check_only() {
        let verifier = IdentityVerifier::from_dev_flag(true);

        assert_eq!(
            verifier.verify_credentials("Student01", "anything"),
            Ok("student01".to_owned())
        );
        assert_eq!(
            verifier.verify_credentials("ab", "anything"),
            Err(IdentityError::InvalidCredentials)
        );
        assert_eq!(
            verifier.verify_credentials("student01", "   "),
            Err(IdentityError::InvalidCredentials)
        );
    }
}
