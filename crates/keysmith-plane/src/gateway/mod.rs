//! Gateway admin API client
//!
//! Every admin call is a single request with a bounded timeout. Raw status
//! codes never leave this module: callers see typed outcomes
//! ([`Lookup`], [`Create`], [`Delete`]) or a [`GatewayError`].
//!
//! Two implementations are provided:
//! - [`HttpGatewayClient`] talks to a real admin API over HTTP
//! - [`MemoryGateway`] keeps consumers and credentials in process, for tests
//!   and local development

pub mod http;
pub mod memory;

pub use http::HttpGatewayClient;
pub use memory::{Fault, MemoryGateway};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

use keysmith_core::ProvisionError;

use crate::metrics::CallOutcome;

/// Error type for gateway calls
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Connection failed: {0}")]
    Unreachable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<GatewayError> for ProvisionError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unreachable(msg) => ProvisionError::UpstreamUnreachable(msg),
            GatewayError::Timeout(msg) => ProvisionError::UpstreamTimeout(msg),
            other => ProvisionError::Unknown(other.to_string()),
        }
    }
}

/// Admin API resource addressed by a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPath {
    /// Consumer collection, optionally resuming at a pagination offset
    Consumers { offset: Option<String> },
    /// A single consumer by username
    Consumer(String),
    /// JWT credential collection of a consumer
    Credentials {
        username: String,
        offset: Option<String>,
    },
    /// A single credential by id
    Credential { username: String, id: String },
}

impl AdminPath {
    pub fn consumers() -> Self {
        AdminPath::Consumers { offset: None }
    }

    pub fn consumer(username: impl Into<String>) -> Self {
        AdminPath::Consumer(username.into())
    }

    pub fn credentials(username: impl Into<String>) -> Self {
        AdminPath::Credentials {
            username: username.into(),
            offset: None,
        }
    }

    pub fn credential(username: impl Into<String>, id: impl Into<String>) -> Self {
        AdminPath::Credential {
            username: username.into(),
            id: id.into(),
        }
    }

    /// Same collection, resumed at `offset`; single resources are unchanged
    pub fn with_offset(self, offset: Option<String>) -> Self {
        match self {
            AdminPath::Consumers { .. } => AdminPath::Consumers { offset },
            AdminPath::Credentials { username, .. } => AdminPath::Credentials { username, offset },
            other => other,
        }
    }

    /// Logical endpoint label, free of usernames and ids
    pub fn endpoint(&self) -> &'static str {
        match self {
            AdminPath::Consumers { .. } => "/consumers",
            AdminPath::Consumer(_) => "/consumers/{username}",
            AdminPath::Credentials { .. } => "/consumers/{username}/jwt",
            AdminPath::Credential { .. } => "/consumers/{username}/jwt/{id}",
        }
    }

    /// Concrete request path with percent-encoded segments
    pub fn to_path(&self) -> String {
        let with_offset = |base: String, offset: &Option<String>| match offset {
            Some(offset) => format!("{}?offset={}", base, urlencoding::encode(offset)),
            None => base,
        };

        match self {
            AdminPath::Consumers { offset } => with_offset("/consumers".to_string(), offset),
            AdminPath::Consumer(username) => {
                format!("/consumers/{}", urlencoding::encode(username))
            }
            AdminPath::Credentials { username, offset } => with_offset(
                format!("/consumers/{}/jwt", urlencoding::encode(username)),
                offset,
            ),
            AdminPath::Credential { username, id } => format!(
                "/consumers/{}/jwt/{}",
                urlencoding::encode(username),
                urlencoding::encode(id)
            ),
        }
    }
}

/// Result of a GET
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Value),
    NotFound,
}

/// Result of a POST
#[derive(Debug, Clone, PartialEq)]
pub enum Create {
    Created(Value),
    Conflict,
}

/// Result of a DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delete {
    Deleted,
    NotFound,
}

impl Lookup {
    pub fn call_outcome(&self) -> CallOutcome {
        match self {
            Lookup::Found(_) => CallOutcome::Success,
            Lookup::NotFound => CallOutcome::NotFound,
        }
    }
}

impl Create {
    pub fn call_outcome(&self) -> CallOutcome {
        match self {
            Create::Created(_) => CallOutcome::Success,
            Create::Conflict => CallOutcome::Conflict,
        }
    }
}

impl Delete {
    pub fn call_outcome(&self) -> CallOutcome {
        match self {
            Delete::Deleted => CallOutcome::Success,
            Delete::NotFound => CallOutcome::NotFound,
        }
    }
}

/// Gateway admin API client
///
/// Implementations must be thread-safe and must not retry.
#[async_trait]
pub trait GatewayClient: Send + Sync + Debug {
    /// GET a resource
    async fn lookup(&self, path: &AdminPath) -> Result<Lookup, GatewayError>;

    /// POST a JSON body to a collection
    async fn create(&self, path: &AdminPath, body: &Value) -> Result<Create, GatewayError>;

    /// DELETE a resource
    async fn delete(&self, path: &AdminPath) -> Result<Delete, GatewayError>;
}
