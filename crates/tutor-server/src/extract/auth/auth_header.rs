//! JWT authentication header extraction.
//!
//! This module provides the [`AuthHeader`] extractor that validates the
//! Authorization Bearer token on incoming requests. Verified claims are
//! cached in the request extensions so later extractors in the same
//! request do not re-parse the token.
//!
//! The optional form (`Option<AuthHeader>`) resolves to `None` only when
//! the Authorization header is absent. A header that is present but
//! invalid always fails the request: explicitly presented credentials are
//! never silently ignored.

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejectionReason;

use super::{AuthClaims, AuthKeys};
use crate::handler::{Error, ErrorKind, Result};

/// JWT authentication header extractor.
///
/// Extraction validates the Bearer token for signature integrity, issuer,
/// audience and expiration; the wrapped [`AuthClaims`] are trustworthy
/// once extraction succeeds.
#[must_use]
#[derive(Debug, Clone)]
pub struct AuthHeader(pub AuthClaims);

impl AuthHeader {
    /// Returns a reference to the JWT claims.
    #[inline]
    pub const fn as_auth_claims(&self) -> &AuthClaims {
        &self.0
    }

    /// Consumes this header and returns the JWT claims.
    #[inline]
    pub fn into_auth_claims(self) -> AuthClaims {
        self.0
    }

    /// Returns the authenticated username.
    #[inline]
    #[must_use]
    pub fn username(&self) -> &str {
        &self.0.username
    }
}

impl<S> FromRequestParts<S> for AuthHeader
where
    S: Sync + Send,
    AuthKeys: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Return cached claims if available to avoid re-parsing
        if let Some(auth_header) = parts.extensions.get::<Self>() {
            return Ok(auth_header.clone());
        }

        type AuthBearerHeader = TypedHeader<Authorization<Bearer>>;
        let auth_keys = AuthKeys::from_ref(state);

        match <AuthBearerHeader as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(bearer_header) => {
                let claims = AuthClaims::decode(bearer_header.token(), &auth_keys)?;
                let auth_header = Self(claims);
                // Cache for subsequent extractors in the same request
                parts.extensions.insert(auth_header.clone());
                Ok(auth_header)
            }
            Err(rejection) => {
                let error = match rejection.reason() {
                    TypedHeaderRejectionReason::Missing => ErrorKind::MissingAuthToken
                        .with_message("Authentication required")
                        .with_context("Missing Authorization header with Bearer token")
                        .with_resource("authentication"),
                    TypedHeaderRejectionReason::Error(_) => ErrorKind::MalformedAuthToken
                        .with_message("Invalid token format")
                        .with_context("Authorization header must contain a valid Bearer token")
                        .with_resource("authentication"),
                    _ => ErrorKind::InternalServerError
                        .with_message("Authentication processing failed")
                        .with_resource("authentication"),
                };
                Err(error)
            }
        }
    }
}

impl<S> OptionalFromRequestParts<S> for AuthHeader
where
    S: Sync + Send,
    AuthKeys: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        // Absent header means anonymous; a present header must verify.
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }

        <Self as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}
