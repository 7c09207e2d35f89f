//! Keysmith Provisioning Plane
//!
//! Issues and manages API-gateway credentials for verified principals:
//! - Creates (or reuses) one gateway consumer per principal
//! - Stores per-credential HS256 secrets with collision-resistant names
//! - Signs bearer tokens bound to those secrets
//! - Lists tokens with truncated display values, deletes by id or name
//!
//! ## API Endpoints
//!
//! ### Open
//! - `GET /health` - Liveness check
//! - `GET /metrics` - Gateway call and provisioning counters
//! - `POST /create-consumer` - Consumer plus username-keyed token
//!
//! ### Bearer-authenticated
//! - `GET /me` - Caller's username and secondary id
//! - `GET /consumers` - All gateway consumers
//! - `POST /generate-token-auto` - New token, optionally named
//! - `POST /auto-generate-consumer` - Consumer (if needed) plus `_auto_` token
//! - `GET /my-tokens` - Caller's tokens
//! - `DELETE /my-tokens/{jwt_id}` - Delete a token by id
//! - `DELETE /my-tokens/by-name/{token_name}` - Delete a token by name
//!
//! Every response carries `x-request-id`: the caller's UUID when it sent a
//! valid one, otherwise a fresh v4.

pub mod api;
pub mod config;
pub mod gateway;
pub mod metrics;
pub mod orchestrator;
pub mod registry;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::{ConfigError, IdentitySource, ServiceConfig};
pub use gateway::{GatewayClient, GatewayError, HttpGatewayClient, MemoryGateway};
pub use metrics::{Metrics, MetricsSnapshot};
pub use orchestrator::ProvisioningOrchestrator;
pub use registry::{ConsumerRegistry, CredentialEntry, ProvisionedCredential};
