//! Consumer Registry
//!
//! Get-or-create semantics for consumers and create/list/find/delete for
//! their JWT credentials, on top of a [`GatewayClient`].
//!
//! ## Upsert
//!
//! `get_or_create_consumer` is lookup, then create, then (on conflict)
//! lookup again. A conflict means a concurrent caller created the consumer
//! first, so the re-lookup returns theirs with `was_created = false`.
//!
//! ## Credential names
//!
//! A conflicting credential key is retried exactly once under
//! [`conflict_retry_name`]. A second conflict fails with
//! `UpstreamConflictExhausted`.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use keysmith_core::{
    conflict_retry_name, Consumer, CredentialSecret, ProvisionError, Result, StoredCredential,
};

use crate::gateway::{AdminPath, Create, Delete, GatewayClient, GatewayError, Lookup};

/// Signing algorithm registered with every credential
pub const CREDENTIAL_ALGORITHM: &str = "HS256";

/// A credential freshly stored in the gateway
#[derive(Debug, Clone)]
pub struct ProvisionedCredential {
    /// Record as returned by the gateway
    pub credential: StoredCredential,
    /// Signing secret; never logged
    pub secret: CredentialSecret,
    /// Key actually stored, which may differ from the one requested
    pub key: String,
}

/// One entry of a credential listing
#[derive(Debug, Clone)]
pub enum CredentialEntry {
    Valid(StoredCredential),
    /// Entry that does not parse as a credential
    Malformed { raw: Value, reason: String },
}

impl CredentialEntry {
    fn from_raw(raw: Value) -> Self {
        if !raw.is_object() {
            return CredentialEntry::Malformed {
                raw,
                reason: "entry is not an object".into(),
            };
        }
        match serde_json::from_value::<StoredCredential>(raw.clone()) {
            Ok(credential) => CredentialEntry::Valid(credential),
            Err(e) => CredentialEntry::Malformed {
                raw,
                reason: e.to_string(),
            },
        }
    }
}

/// Consumer and credential operations against the gateway
#[derive(Debug, Clone)]
pub struct ConsumerRegistry {
    client: Arc<dyn GatewayClient>,
}

impl ConsumerRegistry {
    pub fn new(client: Arc<dyn GatewayClient>) -> Self {
        Self { client }
    }

    // =========================================================================
    // Consumers
    // =========================================================================

    /// Look up a consumer by username
    pub async fn find_consumer(&self, username: &str) -> Result<Option<Consumer>> {
        match self.client.lookup(&AdminPath::consumer(username)).await? {
            Lookup::Found(raw) => Ok(Some(serde_json::from_value(raw)?)),
            Lookup::NotFound => Ok(None),
        }
    }

    /// Return the consumer for `username`, creating it if absent
    ///
    /// The flag is true only for the caller whose create succeeded.
    pub async fn get_or_create_consumer(&self, username: &str) -> Result<(Consumer, bool)> {
        if let Some(consumer) = self.find_consumer(username).await? {
            return Ok((consumer, false));
        }

        let body = json!({ "username": username });
        match self.client.create(&AdminPath::consumers(), &body).await? {
            Create::Created(raw) => {
                let consumer: Consumer = serde_json::from_value(raw)?;
                info!(username = %username, consumer_id = %consumer.id, "Created consumer");
                Ok((consumer, true))
            }
            Create::Conflict => {
                warn!(username = %username, "Consumer created concurrently, re-reading");
                match self.find_consumer(username).await? {
                    Some(consumer) => Ok((consumer, false)),
                    None => {
                        error!(username = %username, "Consumer missing after create conflict");
                        Err(ProvisionError::Unknown(format!(
                            "consumer '{}' conflicted on create but cannot be found",
                            username
                        )))
                    }
                }
            }
        }
    }

    /// All consumers, following pagination
    pub async fn list_consumers(&self) -> Result<Vec<Consumer>> {
        let raw = self
            .collect_pages(AdminPath::consumers())
            .await?
            .ok_or_else(|| ProvisionError::Unknown("consumer collection not found".into()))?;

        raw.into_iter()
            .map(|c| serde_json::from_value(c).map_err(ProvisionError::from))
            .collect()
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Store a new credential under `desired_key`, retrying once on conflict
    pub async fn create_credential(
        &self,
        username: &str,
        desired_key: &str,
    ) -> Result<ProvisionedCredential> {
        let secret = CredentialSecret::generate();

        if let Some(credential) = self.try_create_credential(username, desired_key, &secret).await? {
            return Ok(provisioned(credential, secret));
        }

        let retry_key = conflict_retry_name(desired_key, Utc::now());
        warn!(
            username = %username,
            desired = %desired_key,
            retry = %retry_key,
            "Credential key taken, retrying with suffixed name"
        );

        match self.try_create_credential(username, &retry_key, &secret).await? {
            Some(credential) => Ok(provisioned(credential, secret)),
            None => {
                error!(
                    username = %username,
                    desired = %desired_key,
                    retry = %retry_key,
                    "Credential key still conflicts after retry"
                );
                Err(ProvisionError::UpstreamConflictExhausted {
                    username: username.to_string(),
                    key: desired_key.to_string(),
                })
            }
        }
    }

    /// One create attempt; `None` on conflict
    async fn try_create_credential(
        &self,
        username: &str,
        key: &str,
        secret: &CredentialSecret,
    ) -> Result<Option<StoredCredential>> {
        let body = json!({
            "key": key,
            "secret": secret.to_stored(),
            "algorithm": CREDENTIAL_ALGORITHM,
        });

        let outcome = self
            .client
            .create(&AdminPath::credentials(username), &body)
            .await
            .map_err(|e| match e {
                GatewayError::UnexpectedStatus { status: 404, .. } => {
                    ProvisionError::ConsumerNotFound(username.to_string())
                }
                other => other.into(),
            })?;

        match outcome {
            Create::Created(raw) => {
                let credential: StoredCredential = serde_json::from_value(raw)?;
                info!(
                    username = %username,
                    key = %credential.key,
                    credential_id = %credential.id,
                    "Created credential"
                );
                Ok(Some(credential))
            }
            Create::Conflict => Ok(None),
        }
    }

    /// Every credential entry of a consumer, valid or not
    pub async fn list_credentials(&self, username: &str) -> Result<Vec<CredentialEntry>> {
        let raw = self
            .collect_pages(AdminPath::credentials(username))
            .await?
            .ok_or_else(|| ProvisionError::ConsumerNotFound(username.to_string()))?;

        Ok(raw.into_iter().map(CredentialEntry::from_raw).collect())
    }

    /// Linear scan for the credential stored under `key`
    pub async fn find_credential_by_key(
        &self,
        username: &str,
        key: &str,
    ) -> Result<Option<StoredCredential>> {
        let found = self
            .list_credentials(username)
            .await?
            .into_iter()
            .find_map(|entry| match entry {
                CredentialEntry::Valid(c) if c.key == key => Some(c),
                _ => None,
            });
        Ok(found)
    }

    /// Delete a credential by id; false if it did not exist
    pub async fn delete_credential(&self, username: &str, credential_id: &str) -> Result<bool> {
        match self
            .client
            .delete(&AdminPath::credential(username, credential_id))
            .await?
        {
            Delete::Deleted => {
                info!(username = %username, credential_id = %credential_id, "Deleted credential");
                Ok(true)
            }
            Delete::NotFound => {
                warn!(username = %username, credential_id = %credential_id, "Credential to delete not found");
                Ok(false)
            }
        }
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Concatenate `data` across pages; `None` if the collection is absent
    async fn collect_pages(&self, path: AdminPath) -> Result<Option<Vec<Value>>> {
        let mut items = Vec::new();
        let mut offset = None;
        let mut seen = HashSet::new();

        loop {
            let page_path = path.clone().with_offset(offset.take());
            let page = match self.client.lookup(&page_path).await? {
                Lookup::Found(page) => page,
                Lookup::NotFound => return Ok(None),
            };

            match page.get("data") {
                Some(Value::Array(data)) => items.extend(data.iter().cloned()),
                Some(Value::Null) | None => {}
                Some(_) => {
                    return Err(ProvisionError::Unknown(format!(
                        "malformed listing from {}",
                        path.endpoint()
                    )))
                }
            }

            match next_offset(&page) {
                Some(next) if !seen.insert(next.clone()) => {
                    error!(endpoint = path.endpoint(), offset = %next, "Pagination cursor repeated");
                    return Err(ProvisionError::Unknown(
                        "pagination cursor did not advance".into(),
                    ));
                }
                Some(next) => offset = Some(next),
                None => return Ok(Some(items)),
            }
        }
    }
}

fn provisioned(credential: StoredCredential, secret: CredentialSecret) -> ProvisionedCredential {
    ProvisionedCredential {
        key: credential.key.clone(),
        credential,
        secret,
    }
}

/// Offset of the next page, if the page says there is one
fn next_offset(page: &Value) -> Option<String> {
    let next = page.get("next")?.as_str()?;

    if let Some(offset) = page.get("offset").and_then(Value::as_str) {
        return Some(offset.to_string());
    }

    let (_, query) = next.split_once("offset=")?;
    let raw = query.split('&').next().unwrap_or(query);
    urlencoding::decode(raw).ok().map(|o| o.into_owned())
}
