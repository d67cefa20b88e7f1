//! Authentication secret key management for JWT session handling.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};

/// Secret keys used for JWT authentication.
///
/// Both keys are derived from the single shared secret the deployment
/// configures; tokens are signed and verified with HMAC-SHA256.
///
/// This type is cheap to clone and can be shared across threads.
#[derive(Clone)]
pub struct AuthKeys {
    inner: Arc<AuthKeysInner>,
}

/// Internal container for the actual key data.
struct AuthKeysInner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthKeys {
    /// Creates key material from the configured shared secret.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        let inner = AuthKeysInner {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the key used to sign tokens.
    #[must_use]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.inner.encoding_key
    }

    /// Returns the key used to verify token signatures.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.inner.decoding_key
    }
}

impl fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material is intentionally not printable.
        f.debug_struct("AuthKeys").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_leak_secret() {
        let keys = AuthKeys::from_secret("super-secret-value");
        let debug = format!("{keys:?}");
        assert!(!debug.contains("super-secret-value"));
    }
}
