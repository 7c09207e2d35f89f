//! Error types for consumer and credential provisioning

use thiserror::Error;

/// Result type alias using ProvisionError
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors that can occur while provisioning consumers and credentials
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The gateway admin API could not be reached
    #[error("Gateway admin API unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The gateway admin API did not answer within the request timeout
    #[error("Gateway admin API timed out: {0}")]
    UpstreamTimeout(String),

    /// Credential key collided on the first attempt and again on the retry
    #[error("Credential name '{key}' for consumer '{username}' still conflicts after retry")]
    UpstreamConflictExhausted { username: String, key: String },

    /// No consumer exists for this username
    #[error("Consumer not found: {0}")]
    ConsumerNotFound(String),

    /// No credential matches the requested name or id
    #[error("Credential '{credential}' not found for consumer '{username}'")]
    CredentialNotFound { username: String, credential: String },

    /// A stored credential secret could not be decoded
    #[error("Secret for credential '{0}' could not be decoded")]
    SecretDecode(String),

    /// Token signing failed
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// A later step failed after earlier steps already changed gateway state
    #[error("Provisioning for '{username}' incomplete (consumer created: {consumer_created}): {source}")]
    ProvisioningIncomplete {
        username: String,
        consumer_created: bool,
        #[source]
        source: Box<ProvisionError>,
    },

    /// Anything the gateway answered that the taxonomy does not cover
    #[error("Unexpected gateway failure: {0}")]
    Unknown(String),
}

impl ProvisionError {
    /// Stable, machine-readable kind for this error
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::UpstreamUnreachable(_) => "UPSTREAM_UNREACHABLE",
            ProvisionError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            ProvisionError::UpstreamConflictExhausted { .. } => "UPSTREAM_CONFLICT_EXHAUSTED",
            ProvisionError::ConsumerNotFound(_) => "CONSUMER_NOT_FOUND",
            ProvisionError::CredentialNotFound { .. } => "CREDENTIAL_NOT_FOUND",
            ProvisionError::SecretDecode(_) => "SECRET_DECODE_ERROR",
            ProvisionError::Signing(_) => "SIGNING_ERROR",
            ProvisionError::ProvisioningIncomplete { source, .. } => source.kind(),
            ProvisionError::Unknown(_) => "UNKNOWN",
        }
    }

    /// The innermost error, looking through `ProvisioningIncomplete`
    pub fn root(&self) -> &ProvisionError {
        match self {
            ProvisionError::ProvisioningIncomplete { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ProvisionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ProvisionError::Signing(err.to_string())
    }
}

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::Unknown(format!("malformed gateway payload: {}", err))
    }
}
