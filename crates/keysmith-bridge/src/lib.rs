//! Identity Bridge
//!
//! The Identity Bridge turns the bearer credential on an incoming request
//! into a verified principal whose name the provisioning plane acts on.
//!
//! ## Architecture
//!
//! The bridge wraps exactly one verifier, chosen at startup:
//!
//! - **JWT**: Validates identity-provider tokens against a static key
//!   (HS256 shared secret or RS256 public key PEM)
//! - **Mock**: Treats the credential as the principal name, for local runs
//!   and tests
//!
//! ## Usage
//!
//! ```ignore
//! use keysmith_bridge::{IdentityBridge, handlers::*};
//!
//! let bridge = IdentityBridge::new(JwtVerifier::hs256(
//!     b"shared-secret",
//!     JwtVerifierConfig::default().with_issuer("https://idp.example.com"),
//! ));
//!
//! let principal = bridge.verify_authorization(Some("Bearer eyJ...")).await?;
//! println!("Principal: {}", principal.name);
//! ```

pub mod bridge;
pub mod error;
pub mod handlers;
pub mod types;

pub use bridge::{bearer_credential, IdentityBridge, IdentityVerifier};
pub use error::{BridgeError, Result};
pub use types::{VerifiedPrincipal, VerifierKind};
