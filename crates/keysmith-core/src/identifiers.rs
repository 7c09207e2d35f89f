//! Deterministic identifiers and credential naming rules
//!
//! - Secondary ids are version-5 UUIDs of the principal name under a fixed
//!   namespace, so any process derives the same id for the same name.
//! - Default credential names embed a UTC timestamp.
//! - Conflict retry names append `_HHMMSS_<8 hex>` to the requested name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for secondary ids (the RFC 4122 DNS namespace)
pub const SECONDARY_ID_NAMESPACE: Uuid = Uuid::NAMESPACE_DNS;

/// Name prefix used by `generate_auto_token` when no name is supplied
pub const DEFAULT_TOKEN_PREFIX: &str = "token";

/// Name prefix used by `auto_generate_consumer_and_token`
pub const AUTO_TOKEN_PREFIX: &str = "auto";

/// Stable identifier for a principal, independent of gateway state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerSecondaryId(Uuid);

impl ConsumerSecondaryId {
    /// Derive the secondary id for a principal name
    pub fn derive(principal_name: &str) -> Self {
        Self(Uuid::new_v5(&SECONDARY_ID_NAMESPACE, principal_name.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ConsumerSecondaryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Default credential name: `{username}_{prefix}_{yyyyMMdd_HHmmss}`
pub fn default_token_name(username: &str, prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}_{}", username, prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Name used for the single retry after a credential key conflict
///
/// `{desired}_{HHMMSS}_{8 random hex}`
pub fn conflict_retry_name(desired: &str, now: DateTime<Utc>) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", desired, now.format("%H%M%S"), &simple[..8])
}
