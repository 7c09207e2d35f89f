//! Credential secret material
//!
//! A secret is 32 bytes from the OS RNG rendered as URL-safe base64 text.
//! That text is the HMAC key used for signing; the gateway stores its
//! standard-base64 encoding. Secrets are never logged and `Debug` redacts
//! them.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{ProvisionError, Result};

/// Number of random bytes drawn for every new secret
pub const SECRET_ENTROPY_BYTES: usize = 32;

/// HMAC signing key for one credential
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSecret(Vec<u8>);

impl std::fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CredentialSecret").field(&"[redacted]").finish()
    }
}

impl CredentialSecret {
    /// Generate a new random secret
    pub fn generate() -> Self {
        let mut entropy = [0u8; SECRET_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut entropy);
        Self(URL_SAFE_NO_PAD.encode(entropy).into_bytes())
    }

    /// Wrap existing key bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode the standard-base64 form held by the gateway
    ///
    /// `credential_key` only labels the error.
    pub fn from_stored(stored: &str, credential_key: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(stored.trim())
            .map_err(|_| ProvisionError::SecretDecode(credential_key.to_string()))?;
        if bytes.is_empty() {
            return Err(ProvisionError::SecretDecode(credential_key.to_string()));
        }
        Ok(Self(bytes))
    }

    /// Standard-base64 form sent to the gateway
    pub fn to_stored(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Raw key bytes for HMAC
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
