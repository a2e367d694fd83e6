use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use inventory_service::config::{ServiceConfig, StoreBackend};
use inventory_service::state_store::{DaprStateStore, InMemoryStateStore, StateStore};
use inventory_service::{build_router, AppState, STATE_STORE_NAME};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServiceConfig::from_env()?;

    let store: Arc<dyn StateStore> = match config.store_backend {
        StoreBackend::Dapr => {
            info!(endpoint = %config.dapr_http_endpoint, store = STATE_STORE_NAME, "Using Dapr state store");
            Arc::new(
                DaprStateStore::new(&config.dapr_http_endpoint, STATE_STORE_NAME)
                    .context("failed to build Dapr state store client")?,
            )
        }
        StoreBackend::Memory => {
            warn!("Using in-memory state store; stock is lost on restart");
            Arc::new(InMemoryStateStore::new())
        }
    };

    let state = AppState::new(store, config.store_timeout, config.write_mode);
    info!(write_mode = ?config.write_mode, store_timeout_ms = config.store_timeout.as_millis() as u64, "Stock reconciler configured");

    #[cfg(feature = "kafka")]
    inventory_service::kafka_consumer::spawn_order_consumer(&config.kafka_bootstrap, state.reconciler.clone())?;

    let app = build_router(state);

    let ip: std::net::IpAddr = config.host.parse().context("HOST must be an IP address")?;
    let addr = SocketAddr::from((ip, config.port));
    info!(%addr, "starting inventory-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
