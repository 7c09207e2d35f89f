//! Common types shared by the registry, the issuer and the HTTP surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::ConsumerSecondaryId;

/// Gateway-side consumer record
///
/// One consumer exists per verified principal; `username` is the
/// principal name and is unique across the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    /// Gateway-assigned identifier
    pub id: String,

    /// Principal name this consumer projects
    #[serde(default)]
    pub username: Option<String>,

    /// Optional external identifier set by other tooling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,

    /// Creation time (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// Reference to the owning consumer inside a credential record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerRef {
    pub id: String,
}

/// JWT credential as stored by the gateway
///
/// `secret` holds the standard-base64 rendering of the signing key. It is
/// only ever decoded locally to re-derive tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Gateway-assigned identifier
    pub id: String,

    /// Credential name, unique within one consumer
    pub key: String,

    /// Base64 signing secret
    #[serde(default)]
    pub secret: Option<String>,

    /// Signing algorithm (always HS256 for credentials minted here)
    #[serde(default)]
    pub algorithm: Option<String>,

    /// Creation time (unix seconds)
    #[serde(default)]
    pub created_at: Option<i64>,

    /// Owning consumer
    #[serde(default)]
    pub consumer: Option<ConsumerRef>,

    /// Public key for RSA credentials (unused for HS256)
    #[serde(default)]
    pub rsa_public_key: Option<String>,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .field("consumer", &self.consumer)
            .finish()
    }
}

/// A freshly signed bearer token
///
/// Never persisted; it can be regenerated from the stored secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub jwt: String,
    pub expires_at: DateTime<Utc>,
}

/// Display-safe projection of a stored credential
///
/// `token` is a truncated rendering of a freshly issued JWT; the secret is
/// never part of this view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenView {
    pub id: String,
    pub key: String,
    pub token_name: String,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub consumer_id: Option<String>,
    #[serde(default)]
    pub rsa_public_key: Option<String>,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Operation results
// =============================================================================

/// Result of creating a consumer keyed by username together with a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerTokenGrant {
    pub username: String,
    pub secondary_id: ConsumerSecondaryId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of generating a named (or default-named) token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Key actually stored at the gateway; may differ from the requested name
    pub token_name: String,
    pub token_id: String,
}

/// Result of auto-provisioning a consumer and a token in one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoProvisionedToken {
    pub username: String,
    pub secondary_id: ConsumerSecondaryId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub token_name: String,
    pub token_id: String,
    /// True when this call created the consumer, false when it was reused
    pub consumer_created: bool,
}

/// A principal's tokens, each with a truncated freshly issued JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTokenListing {
    pub username: String,
    pub total_tokens: usize,
    pub tokens: Vec<TokenView>,
}

/// Result of deleting a token by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedToken {
    pub message: String,
    pub deleted_token_name: String,
    pub deleted_token_id: String,
}
