//! Identity Bridge - turns bearer credentials into verified principals

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{BridgeError, Result};
use crate::types::{VerifiedPrincipal, VerifierKind};

/// Trait for identity verifiers
///
/// A verifier checks one kind of bearer credential and extracts the
/// principal name.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Get the kind of credential this verifier processes
    fn kind(&self) -> VerifierKind;

    /// Verify a credential and extract the principal
    ///
    /// # Arguments
    /// * `credential` - The raw credential string (no `Bearer ` prefix)
    ///
    /// # Returns
    /// * `Ok(VerifiedPrincipal)` - Verified principal
    /// * `Err(BridgeError)` - If verification fails
    async fn verify(&self, credential: &str) -> Result<VerifiedPrincipal>;

    /// Get a description of this verifier (for logging)
    fn description(&self) -> &str {
        "identity verifier"
    }
}

/// Identity Bridge - front door for request authentication
///
/// Extracts the bearer credential from an `Authorization` header value
/// and hands it to the configured verifier.
#[derive(Clone)]
pub struct IdentityBridge {
    verifier: Arc<dyn IdentityVerifier>,
}

impl IdentityBridge {
    /// Create a bridge around a verifier
    pub fn new<V: IdentityVerifier + 'static>(verifier: V) -> Self {
        info!(
            kind = %verifier.kind(),
            description = verifier.description(),
            "Registered identity verifier"
        );
        Self {
            verifier: Arc::new(verifier),
        }
    }

    /// Kind of the configured verifier
    pub fn kind(&self) -> VerifierKind {
        self.verifier.kind()
    }

    /// Verify a raw credential
    pub async fn verify(&self, credential: &str) -> Result<VerifiedPrincipal> {
        let result = self.verifier.verify(credential).await;

        match &result {
            Ok(principal) => {
                info!(
                    kind = %self.verifier.kind(),
                    principal = %principal.name,
                    issuer = principal.issuer.as_deref().unwrap_or("-"),
                    "Principal verified"
                );
            }
            Err(e) => {
                warn!(
                    kind = %self.verifier.kind(),
                    error = %e,
                    "Principal verification failed"
                );
            }
        }

        result
    }

    /// Verify the credential carried by an `Authorization` header value
    pub async fn verify_authorization(&self, header: Option<&str>) -> Result<VerifiedPrincipal> {
        let credential = header
            .and_then(bearer_credential)
            .ok_or(BridgeError::MissingCredential)?;
        self.verify(credential).await
    }
}

/// Strip the `Bearer` scheme (case-insensitive) from a header value
pub fn bearer_credential(header: &str) -> Option<&str> {
    let (scheme, credential) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let credential = credential.trim();
    (!credential.is_empty()).then_some(credential)
}
