//! Bearer token issuing
//!
//! Tokens are HS256 JWTs signed with a credential's secret. The payload
//! carries `iss` (principal name) and `kid` (credential key) so the gateway
//! can match the token to the credential it was minted from.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::crypto::CredentialSecret;
use crate::error::{ProvisionError, Result};
use crate::types::{IssuedToken, StoredCredential, TokenView};

/// Default token lifetime: one year
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 31_536_000;

/// Tokens at or below this length are shown in full
const DISPLAY_EDGE: usize = 10;

/// Claims signed into every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal name
    pub iss: String,
    /// Credential key the token is bound to
    pub kid: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Outcome of projecting a stored credential for display
#[derive(Debug, Clone)]
pub enum DisplayOutcome {
    /// Credential with a truncated freshly issued token
    Enhanced(TokenView),
    /// The credential could not be enhanced; returned as stored
    NotEnhanceable {
        credential: StoredCredential,
        reason: String,
    },
}

/// Mints bearer tokens from credential secrets
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    ttl: Duration,
}

impl Default for CredentialIssuer {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }
}

impl CredentialIssuer {
    /// Create an issuer with the given token lifetime
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `principal_name` bound to `credential_key`
    pub fn issue(
        &self,
        principal_name: &str,
        credential_key: &str,
        secret: &CredentialSecret,
    ) -> Result<IssuedToken> {
        self.issue_at(principal_name, credential_key, secret, Utc::now())
    }

    /// Sign a token as if issued at `now`
    pub fn issue_at(
        &self,
        principal_name: &str,
        credential_key: &str,
        secret: &CredentialSecret,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| ProvisionError::Signing("expiry out of range".into()))?;
        let claims = TokenClaims {
            iss: principal_name.to_string(),
            kid: credential_key.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let jwt = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;

        debug!(
            principal = %principal_name,
            kid = %credential_key,
            expires_at = %expires_at,
            "Issued token"
        );

        // exp is whole seconds in the token; report the same instant
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| ProvisionError::Signing("expiry out of range".into()))?;

        Ok(IssuedToken { jwt, expires_at })
    }

    /// Project a stored credential into a display-safe view
    ///
    /// Never fails: a credential whose secret is missing or undecodable is
    /// handed back unmodified as `NotEnhanceable`. The full JWT does not
    /// outlive this call.
    pub fn to_display_view(
        &self,
        credential: &StoredCredential,
        principal_name: &str,
    ) -> DisplayOutcome {
        let not_enhanceable = |reason: String| {
            warn!(key = %credential.key, reason = %reason, "Credential cannot be enhanced");
            DisplayOutcome::NotEnhanceable {
                credential: credential.clone(),
                reason,
            }
        };

        let Some(stored) = credential.secret.as_deref() else {
            return not_enhanceable("no secret stored".into());
        };

        let secret = match CredentialSecret::from_stored(stored, &credential.key) {
            Ok(secret) => secret,
            Err(e) => return not_enhanceable(e.to_string()),
        };

        let issued = match self.issue(principal_name, &credential.key, &secret) {
            Ok(issued) => issued,
            Err(e) => return not_enhanceable(e.to_string()),
        };

        DisplayOutcome::Enhanced(TokenView {
            id: credential.id.clone(),
            key: credential.key.clone(),
            token_name: credential.key.clone(),
            algorithm: credential.algorithm.clone(),
            created_at: credential.created_at,
            consumer_id: credential.consumer.as_ref().map(|c| c.id.clone()),
            rsa_public_key: credential.rsa_public_key.clone(),
            token: truncate_for_display(&issued.jwt),
            expires_at: issued.expires_at,
        })
    }
}

/// `first10...last10` for tokens longer than 20 characters
pub fn truncate_for_display(jwt: &str) -> String {
    let chars: Vec<char> = jwt.chars().collect();
    if chars.len() <= DISPLAY_EDGE * 2 {
        return jwt.to_string();
    }
    let head: String = chars[..DISPLAY_EDGE].iter().collect();
    let tail: String = chars[chars.len() - DISPLAY_EDGE..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConsumerRef;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn stored(key: &str, secret: Option<String>) -> StoredCredential {
        StoredCredential {
            id: format!("id-{}", key),
            key: key.to_string(),
            secret,
            algorithm: Some("HS256".into()),
            created_at: Some(1_700_000_000),
            consumer: Some(ConsumerRef { id: "consumer-1".into() }),
            rsa_public_key: None,
        }
    }

    #[test]
    fn test_issue_round_trip() {
        let issuer = CredentialIssuer::default();
        let secret = CredentialSecret::generate();

        let issued = issuer.issue("alice", "alice_token", &secret).unwrap();

        let data = decode::<TokenClaims>(
            &issued.jwt,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(data.claims.iss, "alice");
        assert_eq!(data.claims.kid, "alice_token");
        assert_eq!(data.claims.exp - data.claims.iat, DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(data.claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_issue_wrong_secret_rejected() {
        let issuer = CredentialIssuer::default();
        let issued = issuer
            .issue("alice", "k", &CredentialSecret::generate())
            .unwrap();

        let result = decode::<TokenClaims>(
            &issued.jwt,
            &DecodingKey::from_secret(CredentialSecret::generate().as_bytes()),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_configured_ttl() {
        let issuer = CredentialIssuer::new(Duration::seconds(60));
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let issued = issuer
            .issue_at("alice", "k", &CredentialSecret::generate(), now)
            .unwrap();
        assert_eq!(issued.expires_at, now + Duration::seconds(60));
    }

    #[test]
    fn test_overflowing_ttl_is_an_error() {
        let issuer = CredentialIssuer::new(Duration::seconds(100_000_000_000_000));
        let result = issuer.issue("alice", "k", &CredentialSecret::generate());
        assert!(matches!(result, Err(ProvisionError::Signing(_))));
    }

    #[test]
    fn test_truncate_long_token() {
        let jwt = "abcdefghij0123456789KLMNOPQRST";
        assert_eq!(truncate_for_display(jwt), "abcdefghij...KLMNOPQRST");
    }

    #[test]
    fn test_truncate_short_token_untouched() {
        assert_eq!(truncate_for_display("exactly-twenty-chars"), "exactly-twenty-chars");
        assert_eq!(truncate_for_display("short"), "short");
    }

    #[test]
    fn test_display_view_enhanced() {
        let issuer = CredentialIssuer::default();
        let secret = CredentialSecret::generate();
        let cred = stored("alice_token", Some(secret.to_stored()));

        match issuer.to_display_view(&cred, "alice") {
            DisplayOutcome::Enhanced(view) => {
                assert_eq!(view.id, "id-alice_token");
                assert_eq!(view.token_name, "alice_token");
                assert_eq!(view.consumer_id.as_deref(), Some("consumer-1"));
                assert_eq!(view.token.len(), 23);
                assert_eq!(&view.token[10..13], "...");
            }
            other => panic!("expected enhanced view, got {:?}", other),
        }
    }

    #[test]
    fn test_display_view_bad_secret() {
        let issuer = CredentialIssuer::default();
        let cred = stored("broken", Some("not//valid==base64!".into()));

        match issuer.to_display_view(&cred, "alice") {
            DisplayOutcome::NotEnhanceable { credential, .. } => assert_eq!(credential, cred),
            other => panic!("expected not enhanceable, got {:?}", other),
        }
    }

    #[test]
    fn test_display_view_missing_secret() {
        let issuer = CredentialIssuer::default();
        let cred = stored("no-secret", None);

        assert!(matches!(
            issuer.to_display_view(&cred, "alice"),
            DisplayOutcome::NotEnhanceable { .. }
        ));
    }
}
