//! # Keysmith Core
//!
//! Pure building blocks for provisioning API-gateway consumers and JWT
//! credentials. Nothing in this crate performs I/O.
//!
//! ## Key Concepts
//!
//! - **Consumer**: gateway-side record, one per verified principal
//! - **Credential**: a named secret under a consumer, used to sign tokens
//! - **Secondary id**: UUIDv5 of the principal name, stable across processes
//! - **Issuer**: signs HS256 tokens carrying `iss` (principal) and `kid`
//!   (credential key), and builds redacted display views of credentials

pub mod crypto;
pub mod error;
pub mod identifiers;
pub mod issuer;
pub mod types;

pub use crypto::CredentialSecret;
pub use error::{ProvisionError, Result};
pub use identifiers::{
    conflict_retry_name, default_token_name, ConsumerSecondaryId, AUTO_TOKEN_PREFIX,
    DEFAULT_TOKEN_PREFIX,
};
pub use issuer::{truncate_for_display, CredentialIssuer, DisplayOutcome, TokenClaims};
pub use types::{
    AutoProvisionedToken, Consumer, ConsumerRef, ConsumerTokenGrant, DeletedToken,
    GeneratedToken, IssuedToken, StoredCredential, TokenView, UserTokenListing,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
