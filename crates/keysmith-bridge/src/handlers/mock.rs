//! Development verifier: the bearer credential is the principal name.
//!
//! `FAIL:<reason>` is rejected with `reason`, so tests can drive the
//! unauthorized path without minting tokens.

use async_trait::async_trait;

use crate::bridge::IdentityVerifier;
use crate::error::{BridgeError, Result};
use crate::types::{VerifiedPrincipal, VerifierKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct MockVerifier;

impl MockVerifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityVerifier for MockVerifier {
    fn kind(&self) -> VerifierKind {
        VerifierKind::Mock
    }

    fn description(&self) -> &str {
        "credential-as-username verifier"
    }

    async fn verify(&self, credential: &str) -> Result<VerifiedPrincipal> {
        if let Some(reason) = credential.strip_prefix("FAIL:") {
            return Err(BridgeError::VerificationFailed(reason.to_string()));
        }

        match credential.trim() {
            "" => Err(BridgeError::InvalidFormat("empty username".into())),
            username => Ok(VerifiedPrincipal::new(username)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_username_passes_through() {
        let principal = MockVerifier.verify(" alice ").await.unwrap();
        assert_eq!(principal, VerifiedPrincipal::new("alice"));
    }

    #[tokio::test]
    async fn test_fail_prefix_rejects() {
        assert!(matches!(
            MockVerifier.verify("FAIL:revoked").await,
            Err(BridgeError::VerificationFailed(ref reason)) if reason == "revoked"
        ));
    }

    #[tokio::test]
    async fn test_blank_rejected() {
        assert!(matches!(
            MockVerifier.verify("  ").await,
            Err(BridgeError::InvalidFormat(_))
        ));
    }
}
