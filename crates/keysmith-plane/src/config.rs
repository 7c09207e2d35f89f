//! Service configuration
//!
//! Read once at startup from `KEYSMITH_*` environment variables. Parsing is
//! a pure function over a lookup closure so it can be tested without
//! touching the process environment.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

use keysmith_bridge::handlers::{JwtVerifier, JwtVerifierConfig, MockVerifier};
use keysmith_bridge::IdentityBridge;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_GATEWAY_ADMIN_URL: &str = "http://localhost:8001";
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("No identity verifier configured: set KEYSMITH_IDENTITY_HS256_SECRET, KEYSMITH_IDENTITY_CERT_PATH or KEYSMITH_MOCK_IDENTITY")]
    MissingIdentity,

    #[error("KEYSMITH_IDENTITY_HS256_SECRET and KEYSMITH_IDENTITY_CERT_PATH are mutually exclusive")]
    AmbiguousIdentity,

    #[error("Failed to load identity key from {path}: {reason}")]
    IdentityKey { path: PathBuf, reason: String },
}

/// How bearer credentials are verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// Credential is the principal name; development only
    Mock,
    /// HS256 tokens signed with a shared secret
    Hs256Secret(String),
    /// RS256 tokens, verified with the PEM at this path
    CertPath(PathBuf),
}

/// Typed service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub gateway_admin_url: String,
    pub gateway_timeout: Duration,
    pub token_ttl: chrono::Duration,
    pub log_level: Level,
    pub identity: IdentitySource,
    pub identity_issuer: Option<String>,
    pub identity_audience: Option<String>,
    /// Serve from an in-process gateway instead of the admin URL
    pub memory_gateway: bool,
}

impl ServiceConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(&get, "KEYSMITH_PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_or(&get, "KEYSMITH_GATEWAY_TIMEOUT_SECS", DEFAULT_GATEWAY_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(invalid("KEYSMITH_GATEWAY_TIMEOUT_SECS", "0", "must be positive"));
        }

        let ttl_secs: i64 = parse_or(&get, "KEYSMITH_TOKEN_TTL_SECS", keysmith_core::issuer::DEFAULT_TOKEN_TTL_SECS)?;
        if ttl_secs <= 0 {
            return Err(invalid("KEYSMITH_TOKEN_TTL_SECS", &ttl_secs.to_string(), "must be positive"));
        }
        let token_ttl = chrono::Duration::try_seconds(ttl_secs)
            .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| {
                invalid("KEYSMITH_TOKEN_TTL_SECS", &ttl_secs.to_string(), "expiry out of range")
            })?;

        let log_level = parse_or(&get, "KEYSMITH_LOG_LEVEL", Level::INFO)?;

        let mock = flag(&get, "KEYSMITH_MOCK_IDENTITY")?;
        let secret = get("KEYSMITH_IDENTITY_HS256_SECRET");
        let cert_path = get("KEYSMITH_IDENTITY_CERT_PATH");
        let identity = match (mock, secret, cert_path) {
            (_, Some(_), Some(_)) => return Err(ConfigError::AmbiguousIdentity),
            (_, Some(secret), None) => IdentitySource::Hs256Secret(secret),
            (_, None, Some(path)) => IdentitySource::CertPath(PathBuf::from(path)),
            (true, None, None) => IdentitySource::Mock,
            (false, None, None) => return Err(ConfigError::MissingIdentity),
        };

        Ok(Self {
            port,
            gateway_admin_url: get("KEYSMITH_GATEWAY_ADMIN_URL")
                .unwrap_or_else(|| DEFAULT_GATEWAY_ADMIN_URL.to_string()),
            gateway_timeout: Duration::from_secs(timeout_secs),
            token_ttl,
            log_level,
            identity,
            identity_issuer: get("KEYSMITH_IDENTITY_ISSUER"),
            identity_audience: get("KEYSMITH_IDENTITY_AUDIENCE"),
            memory_gateway: flag(&get, "KEYSMITH_MEMORY_GATEWAY")?,
        })
    }

    /// Build the identity bridge this configuration describes
    pub fn identity_bridge(&self) -> Result<IdentityBridge, ConfigError> {
        let mut jwt_config = JwtVerifierConfig::default();
        if let Some(ref issuer) = self.identity_issuer {
            jwt_config = jwt_config.with_issuer(issuer.clone());
        }
        if let Some(ref audience) = self.identity_audience {
            jwt_config = jwt_config.with_audience(audience.clone());
        }

        match &self.identity {
            IdentitySource::Mock => Ok(IdentityBridge::new(MockVerifier::new())),
            IdentitySource::Hs256Secret(secret) => Ok(IdentityBridge::new(JwtVerifier::hs256(
                secret.as_bytes(),
                jwt_config,
            ))),
            IdentitySource::CertPath(path) => {
                let key_error = |reason: String| ConfigError::IdentityKey {
                    path: path.clone(),
                    reason,
                };
                let pem = std::fs::read(path).map_err(|e| key_error(e.to_string()))?;
                let verifier =
                    JwtVerifier::rs256_pem(&pem, jwt_config).map_err(|e| key_error(e.to_string()))?;
                Ok(IdentityBridge::new(verifier))
            }
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value.parse().map_err(|e: T::Err| invalid(var, &value, e.to_string())),
        None => Ok(default),
    }
}

fn flag<G>(get: &G, var: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var).map(|v| v.to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(var, &v, "expected a boolean")),
        },
    }
}
