//! JWT claims for the editor-extension bearer credential.

use jiff::{Span, Timestamp};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::AuthKeys;
use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind, Result};

/// JWT claims for authentication tokens.
///
/// The token is the only credential the editor extension holds; there is no
/// revocation list, so expiry is the sole invalidation mechanism besides the
/// client discarding its copy.
///
/// | Claim | Field | Description |
/// |-------|-------|-------------|
/// | `iss` | `issued_by` | Token issuer identifier |
/// | `aud` | `audience` | Token audience identifier |
/// | `sub` | `username` | Authenticated username |
/// | `iat` | `issued_at` | Token creation timestamp |
/// | `exp` | `expires_at` | Token expiration timestamp |
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthClaims {
    // Standard (or registered) claims.
    /// Issuer (who created the token).
    #[serde(rename = "iss")]
    issued_by: String,
    /// Audience (who the token is intended for).
    #[serde(rename = "aud")]
    audience: String,

    /// Subject (the authenticated username, lower-cased).
    #[serde(rename = "sub")]
    pub username: String,

    /// Issued at (as unix seconds).
    #[serde(rename = "iat")]
    #[serde(with = "jiff::fmt::serde::timestamp::second::required")]
    pub issued_at: Timestamp,
    /// Expiration time (as unix seconds).
    #[serde(rename = "exp")]
    #[serde(with = "jiff::fmt::serde::timestamp::second::required")]
    pub expires_at: Timestamp,
}

impl AuthClaims {
    /// Default JWT audience identifier for authentication tokens.
    const JWT_AUDIENCE: &str = "tutor:server";
    /// Default JWT issuer identifier for authentication tokens.
    const JWT_ISSUER: &str = "tutor";
    /// Token lifetime: a fixed offset from issuance.
    const TOKEN_LIFETIME_HOURS: i64 = 24;

    /// Creates claims for a freshly verified username.
    ///
    /// Stamps `iat` with the current time and `exp` a fixed 24 hours later.
    pub fn new(username: impl AsRef<str>) -> Self {
        let issued_at = Timestamp::now();
        let expires_at = issued_at + Span::new().hours(Self::TOKEN_LIFETIME_HOURS);

        Self {
            issued_by: Self::JWT_ISSUER.to_owned(),
            audience: Self::JWT_AUDIENCE.to_owned(),
            username: username.as_ref().trim().to_lowercase(),
            issued_at,
            expires_at,
        }
    }

    /// Checks if the token has expired based on current UTC time.
    #[inline]
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Timestamp::now()
    }

    /// Encodes the claims into a signed JWT token string.
    ///
    /// # Errors
    ///
    /// Returns an internal error if JWT encoding fails.
    pub fn encode(&self, keys: &AuthKeys) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), self, keys.encoding_key()).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_AUTHENTICATION,
                error = %e,
                username = %self.username,
                "Failed to encode JWT token"
            );

            ErrorKind::InternalServerError
                .with_message("Authentication token generation failed")
                .with_resource("authentication")
        })
    }

    /// Parses and validates a JWT token string.
    ///
    /// Validation covers the HMAC signature, issuer, audience, required
    /// claims and expiry; expired and malformed tokens map to distinct
    /// error kinds.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for expired tokens and `MalformedAuthToken`
    /// for anything that fails to parse or verify.
    pub fn decode(token: &str, keys: &AuthKeys) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = true;
        validation.set_audience(&[Self::JWT_AUDIENCE]);
        validation.set_issuer(&[Self::JWT_ISSUER]);
        validation.set_required_spec_claims(&["iss", "aud", "sub", "iat", "exp"]);

        let token_data = decode::<Self>(token, keys.decoding_key(), &validation)?;
        let claims = token_data.claims;

        // Double-check expiration independently of the library validation
        if claims.is_expired() {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                username = %claims.username,
                expired_at = %claims.expires_at,
                "JWT token validation failed: token expired"
            );

            return Err(ErrorKind::Unauthorized
                .with_message("Authentication token has expired")
                .with_resource("authentication"));
        }

        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            username = %claims.username,
            expires_at = %claims.expires_at,
            "JWT token validation completed successfully"
        );

        Ok(claims)
    }
}

impl From<JwtError> for Error<'static> {
    fn from(error: JwtError) -> Self {
        match error.kind() {
            JwtErrorKind::ExpiredSignature => ErrorKind::Unauthorized
                .with_message("Authentication token has expired")
                .with_context("Please sign in again to continue"),
            JwtErrorKind::InvalidSignature => ErrorKind::Unauthorized
                .with_message("Authentication token verification failed")
                .with_context("Token signature could not be verified"),
            JwtErrorKind::InvalidAudience | JwtErrorKind::InvalidIssuer => ErrorKind::Unauthorized
                .with_message("Authentication token is not valid for this service"),
            JwtErrorKind::MissingRequiredClaim(claim) => ErrorKind::MalformedAuthToken
                .with_message("Authentication token is incomplete")
                .with_context(format!("Token is missing required field: {}", claim)),
            _ => ErrorKind::MalformedAuthToken
                .with_message("Authentication token is invalid")
                .with_context("The provided token could not be parsed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> AuthKeys {
        AuthKeys::from_secret("test-secret")
    }

    #[test]
    fn issue_then_verify_round_trip() {
        let keys = keys();
        let token = AuthClaims::new("Student01").encode(&keys).unwrap();

        let claims = AuthClaims::decode(&token, &keys).unwrap();
        assert_eq!(claims.username, "student01");
        assert!(!claims.is_expired());
    }

    #[test]
    fn username_is_normalized() {
        let claims = AuthClaims::new("  MiXeD  ");
        assert_eq!(claims.username, "mixed");
    }

    #[test]
    fn expiry_is_a_fixed_offset() {
        let claims = AuthClaims::new("student01");
        let lifetime = claims.expires_at.duration_since(claims.issued_at);
        assert_eq!(lifetime.as_secs(), 24 * 60 * 60);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = AuthClaims::new("student01").encode(&keys()).unwrap();
        let other_keys = AuthKeys::from_secret("another-secret");

        let result = AuthClaims::decode(&token, &other_keys);
        assert!(result.is_err());
    }

    #[test]
    fn garbage_token_is_rejected_as_malformed() {
        let result = AuthClaims::decode("not-a-token", &keys());
        let error = result.unwrap_err();
        assert_eq!(error.kind(), crate::handler::ErrorKind::MalformedAuthToken);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let mut claims = AuthClaims::new("student01");
        claims.issued_at = Timestamp::now() - Span::new().hours(48);
        claims.expires_at = Timestamp::now() - Span::new().hours(24);

        let token = claims.encode(&keys).unwrap();
        let result = AuthClaims::decode(&token, &keys);
        assert!(result.is_err());
    }
}
