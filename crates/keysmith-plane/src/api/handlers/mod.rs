//! API request handlers

pub mod consumers;
pub mod tokens;

use std::sync::Arc;

use keysmith_bridge::IdentityBridge;

use crate::metrics::Metrics;
use crate::orchestrator::ProvisioningOrchestrator;

pub use consumers::{
    create_consumer, list_consumers, me, ConsumerListResponse, CreateConsumerRequest, MeResponse,
};
pub use tokens::{
    auto_generate_consumer, delete_token_by_id, delete_token_by_name, generate_token_auto,
    my_tokens, DeleteTokenResponse, GenerateTokenRequest,
};

/// Application state shared across handlers
pub struct AppState {
    /// Provisioning operations
    pub orchestrator: ProvisioningOrchestrator,
    /// Bearer credential verification
    pub identity: IdentityBridge,
    /// Gateway call and provisioning counters
    pub metrics: Arc<Metrics>,
}
