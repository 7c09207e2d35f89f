//! Keysmith Server Binary
//!
//! Runs the provisioning HTTP server in front of a gateway admin API.

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use keysmith_core::CredentialIssuer;
use keysmith_plane::{
    create_router, AppState, ConsumerRegistry, GatewayClient, HttpGatewayClient, MemoryGateway,
    Metrics, ProvisioningOrchestrator, ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration
    let config = ServiceConfig::from_env()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Gateway client
    let metrics = Arc::new(Metrics::new());
    let gateway: Arc<dyn GatewayClient> = if config.memory_gateway {
        warn!("Using in-memory gateway; nothing is persisted");
        Arc::new(MemoryGateway::new().with_metrics(metrics.clone()))
    } else {
        Arc::new(HttpGatewayClient::new(
            config.gateway_admin_url.clone(),
            config.gateway_timeout,
            metrics.clone(),
        )?)
    };

    // Identity verification
    let identity = config.identity_bridge()?;

    let orchestrator = ProvisioningOrchestrator::new(
        ConsumerRegistry::new(gateway),
        CredentialIssuer::new(config.token_ttl),
        metrics.clone(),
    );

    info!(
        port = config.port,
        gateway = %config.gateway_admin_url,
        memory_gateway = config.memory_gateway,
        identity = %identity.kind(),
        token_ttl_secs = config.token_ttl.num_seconds(),
        "Starting Keysmith server"
    );

    // Create application state
    let state = Arc::new(AppState {
        orchestrator,
        identity,
        metrics,
    });

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "Keysmith listening");

    axum::serve(listener, app).await?;
    Ok(())
}
