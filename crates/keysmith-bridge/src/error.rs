//! Error types for the identity bridge

use thiserror::Error;

/// Result type for identity bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while verifying a bearer credential
#[derive(Error, Debug)]
pub enum BridgeError {
    /// No credential was presented
    #[error("Missing bearer credential")]
    MissingCredential,

    /// Credential verification failed
    #[error("Credential verification failed: {0}")]
    VerificationFailed(String),

    /// Credential has expired
    #[error("Credential expired: {0}")]
    Expired(String),

    /// Credential not yet valid
    #[error("Credential not yet valid: {0}")]
    NotYetValid(String),

    /// Invalid credential format
    #[error("Invalid credential format: {0}")]
    InvalidFormat(String),

    /// Invalid signature
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Issuer does not match the configured one
    #[error("Unexpected issuer: {0}")]
    InvalidIssuer(String),

    /// Audience does not match the configured one
    #[error("Invalid audience: {0}")]
    InvalidAudience(String),

    /// None of the configured principal claims is present
    #[error("Missing principal claim (tried: {0})")]
    MissingPrincipal(String),

    /// Verification key could not be loaded
    #[error("Invalid verification key: {0}")]
    InvalidKey(String),
}

impl From<jsonwebtoken::errors::Error> for BridgeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => BridgeError::Expired("JWT expired".into()),
            ErrorKind::ImmatureSignature => BridgeError::NotYetValid("JWT not yet valid".into()),
            ErrorKind::InvalidSignature => BridgeError::InvalidSignature(err.to_string()),
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                BridgeError::InvalidFormat(err.to_string())
            }
            ErrorKind::InvalidIssuer => BridgeError::InvalidIssuer(err.to_string()),
            ErrorKind::InvalidAudience => BridgeError::InvalidAudience(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                BridgeError::InvalidKey(err.to_string())
            }
            _ => BridgeError::VerificationFailed(err.to_string()),
        }
    }
}
