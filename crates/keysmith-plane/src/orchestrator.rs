//! Provisioning Orchestrator
//!
//! Composes [`ConsumerRegistry`] and [`CredentialIssuer`] into the
//! user-facing operations. Holds no state of its own between calls; all
//! coordination state lives in the gateway.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use keysmith_core::{
    default_token_name, AutoProvisionedToken, Consumer, ConsumerSecondaryId, ConsumerTokenGrant,
    CredentialIssuer, DeletedToken, DisplayOutcome, GeneratedToken, IssuedToken, ProvisionError,
    Result, TokenView, UserTokenListing, AUTO_TOKEN_PREFIX, DEFAULT_TOKEN_PREFIX,
};

use crate::metrics::{IssuePath, Metrics};
use crate::registry::{ConsumerRegistry, CredentialEntry, ProvisionedCredential};

/// Result of the consumer + credential + token sequence
struct Provisioned {
    consumer_created: bool,
    credential: ProvisionedCredential,
    token: IssuedToken,
}

/// User-facing provisioning operations
#[derive(Debug, Clone)]
pub struct ProvisioningOrchestrator {
    registry: ConsumerRegistry,
    issuer: CredentialIssuer,
    metrics: Arc<Metrics>,
}

impl ProvisioningOrchestrator {
    pub fn new(registry: ConsumerRegistry, issuer: CredentialIssuer, metrics: Arc<Metrics>) -> Self {
        Self {
            registry,
            issuer,
            metrics,
        }
    }

    pub fn issuer(&self) -> &CredentialIssuer {
        &self.issuer
    }

    /// Consumer keyed by username, with a credential whose key is the username
    pub async fn create_consumer_with_token(&self, username: &str) -> Result<ConsumerTokenGrant> {
        let provisioned = self.provision(username, username).await?;
        self.metrics.record_token_issued(IssuePath::Consumer);

        Ok(ConsumerTokenGrant {
            username: username.to_string(),
            secondary_id: self.derive_secondary_id(username),
            token: provisioned.token.jwt,
            expires_at: provisioned.token.expires_at,
        })
    }

    /// New token for `username`, named `desired_name` or a timestamped default
    ///
    /// The returned name is the key actually stored, which differs from the
    /// request if the name was already taken.
    pub async fn generate_auto_token(
        &self,
        username: &str,
        desired_name: Option<&str>,
    ) -> Result<GeneratedToken> {
        let name = match desired_name.filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => default_token_name(username, DEFAULT_TOKEN_PREFIX, Utc::now()),
        };

        let provisioned = self.provision(username, &name).await?;
        self.metrics.record_token_issued(IssuePath::Auto);

        Ok(GeneratedToken {
            token: provisioned.token.jwt,
            expires_at: provisioned.token.expires_at,
            token_name: provisioned.credential.key,
            token_id: provisioned.credential.credential.id,
        })
    }

    /// Consumer (if needed) plus an `_auto_` token, reporting whether the
    /// consumer was created by this call
    pub async fn auto_generate_consumer_and_token(
        &self,
        username: &str,
    ) -> Result<AutoProvisionedToken> {
        let name = default_token_name(username, AUTO_TOKEN_PREFIX, Utc::now());
        let provisioned = self.provision(username, &name).await?;
        self.metrics.record_token_issued(IssuePath::AutoGenerate);

        Ok(AutoProvisionedToken {
            username: username.to_string(),
            secondary_id: self.derive_secondary_id(username),
            token: provisioned.token.jwt,
            expires_at: provisioned.token.expires_at,
            token_name: provisioned.credential.key,
            token_id: provisioned.credential.credential.id,
            consumer_created: provisioned.consumer_created,
        })
    }

    /// Display views of every usable credential
    ///
    /// Entries that are malformed or cannot be enhanced are logged and left
    /// out of both `tokens` and `total_tokens`. A principal without a
    /// consumer has no tokens.
    pub async fn list_user_tokens(&self, username: &str) -> Result<UserTokenListing> {
        let entries = match self.registry.list_credentials(username).await {
            Ok(entries) => entries,
            Err(ProvisionError::ConsumerNotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let tokens = entries
            .into_iter()
            .fold(Vec::new(), |mut tokens: Vec<TokenView>, entry| {
                match entry {
                    CredentialEntry::Valid(credential) => {
                        match self.issuer.to_display_view(&credential, username) {
                            DisplayOutcome::Enhanced(view) => tokens.push(view),
                            DisplayOutcome::NotEnhanceable { .. } => {}
                        }
                    }
                    CredentialEntry::Malformed { reason, .. } => {
                        warn!(username = %username, reason = %reason, "Skipping malformed credential entry");
                    }
                }
                tokens
            });

        Ok(UserTokenListing {
            username: username.to_string(),
            total_tokens: tokens.len(),
            tokens,
        })
    }

    /// Delete by credential id; false if it did not exist
    pub async fn delete_token_by_id(&self, username: &str, credential_id: &str) -> Result<bool> {
        self.registry.delete_credential(username, credential_id).await
    }

    /// Delete the credential stored under `token_name`
    pub async fn delete_token_by_name(&self, username: &str, token_name: &str) -> Result<DeletedToken> {
        let not_found = || ProvisionError::CredentialNotFound {
            username: username.to_string(),
            credential: token_name.to_string(),
        };

        let credential = self
            .registry
            .find_credential_by_key(username, token_name)
            .await?
            .ok_or_else(not_found)?;

        if !self.registry.delete_credential(username, &credential.id).await? {
            // Found a moment ago; someone else deleted it in between
            warn!(username = %username, token_name = %token_name, "Credential vanished before delete");
            return Err(not_found());
        }

        info!(username = %username, token_name = %token_name, "Token deleted");
        Ok(DeletedToken {
            message: format!("Token '{}' deleted successfully", token_name),
            deleted_token_name: token_name.to_string(),
            deleted_token_id: credential.id,
        })
    }

    /// All gateway consumers
    pub async fn list_consumers(&self) -> Result<Vec<Consumer>> {
        self.registry.list_consumers().await
    }

    /// Deterministic secondary id for a principal; no I/O
    pub fn derive_secondary_id(&self, username: &str) -> ConsumerSecondaryId {
        ConsumerSecondaryId::derive(username)
    }

    /// Ensure the consumer, store a credential, sign a token
    ///
    /// A failure after this call created the consumer is wrapped in
    /// `ProvisioningIncomplete` so the caller knows the consumer now exists.
    async fn provision(&self, username: &str, key: &str) -> Result<Provisioned> {
        let (consumer, consumer_created) = self.registry.get_or_create_consumer(username).await?;
        if consumer_created {
            self.metrics.record_consumer_created();
        }

        let issued = async {
            let credential = self.registry.create_credential(username, key).await?;
            let token = self
                .issuer
                .issue(username, &credential.key, &credential.secret)?;
            Ok::<_, ProvisionError>((credential, token))
        }
        .await;

        match issued {
            Ok((credential, token)) => {
                info!(
                    username = %username,
                    consumer_id = %consumer.id,
                    key = %credential.key,
                    consumer_created,
                    "Token provisioned"
                );
                Ok(Provisioned {
                    consumer_created,
                    credential,
                    token,
                })
            }
            Err(source) if consumer_created => Err(ProvisionError::ProvisioningIncomplete {
                username: username.to_string(),
                consumer_created: true,
                source: Box::new(source),
            }),
            Err(source) => Err(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Fault, GatewayError, MemoryGateway};
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use keysmith_core::{CredentialSecret, TokenClaims};

    fn orchestrator() -> (Arc<MemoryGateway>, ProvisioningOrchestrator) {
        let gateway = Arc::new(MemoryGateway::new());
        let orchestrator = ProvisioningOrchestrator::new(
            ConsumerRegistry::new(gateway.clone()),
            CredentialIssuer::default(),
            gateway.metrics().clone(),
        );
        (gateway, orchestrator)
    }

    #[tokio::test]
    async fn test_consumer_token_keyed_by_username() {
        let (gateway, orchestrator) = orchestrator();

        let grant = orchestrator.create_consumer_with_token("alice").await.unwrap();
        assert_eq!(grant.username, "alice");
        assert_eq!(grant.secondary_id, ConsumerSecondaryId::derive("alice"));
        assert_eq!(gateway.credential_keys("alice"), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_default_token_name() {
        let (_, orchestrator) = orchestrator();

        let generated = orchestrator.generate_auto_token("bob", None).await.unwrap();
        assert!(generated.token_name.starts_with("bob_token_"));

        let empty = orchestrator.generate_auto_token("bob", Some("")).await.unwrap();
        assert!(empty.token_name.starts_with("bob_token_"));
    }

    #[tokio::test]
    async fn test_requested_name_stored_verbatim() {
        let (gateway, orchestrator) = orchestrator();

        let generated = orchestrator
            .generate_auto_token("bob", Some(" laptop "))
            .await
            .unwrap();

        assert_eq!(generated.token_name, " laptop ");
        assert_eq!(gateway.credential_keys("bob"), vec![" laptop ".to_string()]);
    }

    #[tokio::test]
    async fn test_token_signed_with_stored_secret() {
        let (_, orchestrator) = orchestrator();

        let generated = orchestrator
            .generate_auto_token("carol", Some("ci"))
            .await
            .unwrap();
        assert_eq!(generated.token_name, "ci");

        let stored = orchestrator
            .registry
            .find_credential_by_key("carol", "ci")
            .await
            .unwrap()
            .unwrap();
        let secret = CredentialSecret::from_stored(stored.secret.as_deref().unwrap(), "ci").unwrap();

        let data = decode::<TokenClaims>(
            &generated.token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.iss, "carol");
        assert_eq!(data.claims.kid, "ci");
        assert_eq!(data.claims.exp, generated.expires_at.timestamp());
    }

    #[tokio::test]
    async fn test_kid_matches_retry_key() {
        let (gateway, orchestrator) = orchestrator();
        orchestrator.generate_auto_token("dave", Some("dave_token")).await.unwrap();

        let second = orchestrator
            .generate_auto_token("dave", Some("dave_token"))
            .await
            .unwrap();
        assert!(second.token_name.starts_with("dave_token_"));

        let keys = gateway.credential_keys("dave");
        assert!(keys.contains(&second.token_name));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        let data = decode::<TokenClaims>(&second.token, &DecodingKey::from_secret(b""), &validation)
            .unwrap();
        assert_eq!(data.claims.kid, second.token_name);
        assert_eq!(data.claims.iss, "dave");
    }

    #[tokio::test]
    async fn test_auto_generate_reports_creation() {
        let (_, orchestrator) = orchestrator();

        let first = orchestrator.auto_generate_consumer_and_token("erin").await.unwrap();
        assert!(first.consumer_created);
        assert!(first.token_name.starts_with("erin_auto_"));

        let second = orchestrator.auto_generate_consumer_and_token("erin").await.unwrap();
        assert!(!second.consumer_created);
    }

    #[tokio::test]
    async fn test_incomplete_when_credential_fails_after_create() {
        let (gateway, orchestrator) = orchestrator();
        gateway.inject_fault(
            "/consumers/{username}/jwt",
            "POST",
            Fault::Error(GatewayError::Timeout("slow".into())),
        );

        let err = orchestrator.create_consumer_with_token("frank").await.unwrap_err();
        match &err {
            ProvisionError::ProvisioningIncomplete {
                consumer_created, ..
            } => assert!(consumer_created),
            other => panic!("expected incomplete, got {:?}", other),
        }
        assert_eq!(err.kind(), "UPSTREAM_TIMEOUT");
        assert_eq!(gateway.consumer_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_with_existing_consumer_not_wrapped() {
        let (gateway, orchestrator) = orchestrator();
        orchestrator.create_consumer_with_token("gina").await.unwrap();
        gateway.inject_fault(
            "/consumers/{username}/jwt",
            "POST",
            Fault::Error(GatewayError::Unreachable("down".into())),
        );

        let err = orchestrator.generate_auto_token("gina", None).await.unwrap_err();
        assert!(matches!(err, ProvisionError::UpstreamUnreachable(_)));
    }

    #[tokio::test]
    async fn test_listing_without_consumer_is_empty() {
        let (_, orchestrator) = orchestrator();

        let listing = orchestrator.list_user_tokens("nobody").await.unwrap();
        assert_eq!(listing.total_tokens, 0);
        assert!(listing.tokens.is_empty());
    }

    #[tokio::test]
    async fn test_listing_skips_bad_entries() {
        let (gateway, orchestrator) = orchestrator();
        orchestrator.generate_auto_token("hank", Some("one")).await.unwrap();
        orchestrator.generate_auto_token("hank", Some("two")).await.unwrap();
        gateway.insert_raw_credential(
            "hank",
            serde_json::json!({ "id": "bad", "key": "broken", "secret": "%%%not-base64%%%" }),
        );
        gateway.insert_raw_credential("hank", serde_json::json!(42));

        let listing = orchestrator.list_user_tokens("hank").await.unwrap();
        assert_eq!(listing.total_tokens, 2);
        let names: Vec<_> = listing.tokens.iter().map(|t| t.token_name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert!(listing.tokens.iter().all(|t| t.token.contains("...")));
    }

    #[tokio::test]
    async fn test_delete_by_name() {
        let (gateway, orchestrator) = orchestrator();
        let generated = orchestrator.generate_auto_token("ivy", Some("laptop")).await.unwrap();

        let deleted = orchestrator.delete_token_by_name("ivy", "laptop").await.unwrap();
        assert_eq!(deleted.deleted_token_name, "laptop");
        assert_eq!(deleted.deleted_token_id, generated.token_id);
        assert!(gateway.credential_keys("ivy").is_empty());

        let again = orchestrator.delete_token_by_name("ivy", "laptop").await;
        assert!(matches!(again, Err(ProvisionError::CredentialNotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_by_name_race_surfaces_not_found() {
        let (gateway, orchestrator) = orchestrator();
        orchestrator.generate_auto_token("jack", Some("laptop")).await.unwrap();
        gateway.inject_fault("/consumers/{username}/jwt/{id}", "DELETE", Fault::NotFound);

        let result = orchestrator.delete_token_by_name("jack", "laptop").await;
        assert!(matches!(result, Err(ProvisionError::CredentialNotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let (_, orchestrator) = orchestrator();
        let generated = orchestrator.generate_auto_token("kim", None).await.unwrap();

        assert!(orchestrator.delete_token_by_id("kim", &generated.token_id).await.unwrap());
        assert!(!orchestrator.delete_token_by_id("kim", &generated.token_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_metrics_count_paths() {
        let (gateway, orchestrator) = orchestrator();
        orchestrator.create_consumer_with_token("lee").await.unwrap();
        orchestrator.generate_auto_token("lee", None).await.unwrap();
        orchestrator.auto_generate_consumer_and_token("mo").await.unwrap();

        let snapshot = gateway.metrics().snapshot();
        assert_eq!(snapshot.consumers_created, 2);
        assert_eq!(snapshot.tokens_issued.consumer, 1);
        assert_eq!(snapshot.tokens_issued.auto, 1);
        assert_eq!(snapshot.tokens_issued.auto_generate, 1);
    }

    #[test]
    fn test_secondary_id_needs_no_gateway() {
        let (_, orchestrator) = orchestrator();
        assert_eq!(
            orchestrator.derive_secondary_id("alice").to_string(),
            "c2ef90b9-02bc-5d53-93cd-92652b6e1b41"
        );
    }
}
