use anyhow::{Context, Result};
use hub_connectors::api::{create_router, ApiState};
use hub_connectors::ConnectorRegistry;
use integration_hub::config::HubConfig;
use integration_hub::oauth::{run_state_cleanup, StateManager};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hub_connectors=info,integration_hub=info".into()),
        )
        .init();

    info!("Integration hub connectors starting...");

    let config = HubConfig::from_env().context("Failed to load hub configuration")?;
    info!(
        bind_addr = %config.server.bind_addr,
        callback_base_url = %config.server.callback_base_url,
        fetch_timeout_secs = config.fetch.timeout_secs,
        fetch_retries = config.fetch.retries,
        "Configuration loaded"
    );

    let registry = ConnectorRegistry::from_env(&config);
    if registry.is_empty() {
        warn!("No connectors configured; set HUB_OAUTH_<PROVIDER>_CLIENT_ID and _CLIENT_SECRET");
    } else {
        info!(count = registry.len(), "Connectors registered");
    }

    let state_manager = StateManager::new(config.oauth.state_ttl_secs);
    tokio::spawn(run_state_cleanup(
        state_manager.clone(),
        config.oauth.state_cleanup_interval_secs,
    ));

    let router = create_router(ApiState {
        registry: Arc::new(registry),
        state_manager,
        callback_base_url: config.server.callback_base_url.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Connector API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Connector API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("Integration hub connectors stopped");

    Ok(())
}
