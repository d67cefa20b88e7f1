//! Authentication module.
//!
//! This module provides the authentication surface of the tutor API:
//! JWT token issuance and verification for the editor extension, and the
//! identity verifier that covers both the reverse-proxy-injected web
//! identity and the deliberately weak development credential path.
//!
//! # Key Types
//!
//! - [`AuthHeader`] - JWT bearer token extractor
//! - [`AuthClaims`] - JWT claims structure (the bearer credential)
//! - [`AuthKeys`] - HMAC key material for signing and verification
//! - [`IdentityVerifier`] - who-is-this-user checks, selected at startup

mod auth_header;
mod identity;
mod jwt_claims;
mod keys;

pub use self::auth_header::AuthHeader;
pub use self::identity::{IdentityError, IdentityVerifier, TRUSTED_USER_HEADER};
pub use self::jwt_claims::AuthClaims;
pub use self::keys::AuthKeys;
