//! Verified identity

use serde_json::{Map, Value};

/// Which verifier is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierKind {
    /// Signed identity-provider JWT
    Jwt,
    /// Credential is the principal name (development and tests)
    Mock,
}

impl std::fmt::Display for VerifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifierKind::Jwt => write!(f, "jwt"),
            VerifierKind::Mock => write!(f, "mock"),
        }
    }
}

/// A principal whose bearer credential has been verified
///
/// `name` becomes the consumer username at the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPrincipal {
    pub name: String,
    /// `iss` of the verified token, when it carried one
    pub issuer: Option<String>,
    /// Remaining token claims
    pub claims: Map<String, Value>,
}

impl VerifiedPrincipal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issuer: None,
            claims: Map::new(),
        }
    }
}
