//! JWT Identity Verifier
//!
//! Verifies identity-provider JWTs against a statically configured key
//! (HMAC secret or RSA public key PEM) and extracts the principal name.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::bridge::IdentityVerifier;
use crate::error::{BridgeError, Result};
use crate::types::{VerifiedPrincipal, VerifierKind};

/// Settings for JWT verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtVerifierConfig {
    /// Expected issuer (iss claim), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Expected audience (aud claim), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Claims tried in order for the principal name
    #[serde(default = "default_principal_claims")]
    pub principal_claims: Vec<String>,
}

fn default_principal_claims() -> Vec<String> {
    vec![
        "preferred_username".to_string(),
        "name".to_string(),
        "sub".to_string(),
    ]
}

impl Default for JwtVerifierConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            principal_claims: default_principal_claims(),
        }
    }
}

impl JwtVerifierConfig {
    /// Set the expected issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the expected audience
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Replace the principal claim lookup order
    pub fn with_principal_claims(mut self, claims: Vec<String>) -> Self {
        self.principal_claims = claims;
        self
    }
}

/// JWT claims we care about
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    /// Issuer
    iss: Option<String>,
    /// All other claims
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

/// JWT Identity Verifier
pub struct JwtVerifier {
    algorithm: Algorithm,
    key: DecodingKey,
    config: JwtVerifierConfig,
}

impl JwtVerifier {
    /// Verifier for HS256 tokens signed with a shared secret
    pub fn hs256(secret: &[u8], config: JwtVerifierConfig) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            key: DecodingKey::from_secret(secret),
            config,
        }
    }

    /// Verifier for RS256 tokens, given the provider's public key PEM
    pub fn rs256_pem(pem: &[u8], config: JwtVerifierConfig) -> Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| BridgeError::InvalidKey(e.to_string()))?;
        Ok(Self {
            algorithm: Algorithm::RS256,
            key,
            config,
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);

        if let Some(ref issuer) = self.config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref aud) = self.config.audience {
            validation.set_audience(&[aud]);
        } else {
            validation.validate_aud = false;
        }

        validation
    }

    /// First configured claim holding a non-empty string
    fn principal_name(&self, claims: &IdentityClaims) -> Result<String> {
        self.config
            .principal_claims
            .iter()
            .find_map(|claim| {
                let value = match claim.as_str() {
                    "iss" => claims.iss.clone(),
                    other => claims
                        .extra
                        .get(other)
                        .and_then(|v| v.as_str())
                        .map(String::from),
                };
                value.filter(|v| !v.trim().is_empty())
            })
            .ok_or_else(|| BridgeError::MissingPrincipal(self.config.principal_claims.join(", ")))
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    fn kind(&self) -> VerifierKind {
        VerifierKind::Jwt
    }

    fn description(&self) -> &str {
        "JWT identity verifier"
    }

    async fn verify(&self, credential: &str) -> Result<VerifiedPrincipal> {
        // Step 1: Reject algorithm substitution before touching the key
        let header = decode_header(credential)
            .map_err(|e| BridgeError::InvalidFormat(e.to_string()))?;
        if header.alg != self.algorithm {
            return Err(BridgeError::InvalidSignature(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        // Step 2: Verify signature and standard claims
        let token_data = decode::<IdentityClaims>(credential, &self.key, &self.validation())?;
        let claims = token_data.claims;

        // Step 3: Extract principal
        let name = self.principal_name(&claims)?;
        debug!(principal = %name, "JWT verified");

        Ok(VerifiedPrincipal {
            name,
            issuer: claims.iss,
            claims: claims.extra.into_iter().collect(),
        })
    }
}
