//! Custom Axum extractors.
//!
//! # Extractor Categories
//!
//! ## Authentication
//!
//! - [`AuthHeader`] - JWT bearer token extraction and validation
//! - [`AuthClaims`] - JWT claims with tutor-specific fields
//! - [`AuthKeys`] - signing/verification key material
//! - [`IdentityVerifier`] - upstream-identity and dev-credential checks

pub mod auth;

pub use crate::TRACING_TARGET_AUTHENTICATION;
pub use crate::extract::auth::{
    AuthClaims, AuthHeader, AuthKeys, IdentityError, IdentityVerifier,
};
