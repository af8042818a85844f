//! avrlink - AV receiver status bridge
//!
//! Keeps a connection to the receiver's control port open, mirrors decoded
//! status into a key-value store and applies write requests from it.

use avrlink_bridge::{Bridge, Config, MemoryStore, RestStore, StatusStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if AVRLINK_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(config) => {
            if let Ok(path) = std::env::var("AVRLINK_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            config
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e.into());
    }

    tracing::info!("Starting avrlink bridge");
    tracing::info!(
        "  Receiver: {}:{}",
        config.receiver.host,
        config.receiver.port
    );
    tracing::info!(
        "  Poll interval: {}ms, reconnect delay: {}ms",
        config.receiver.poll_interval_ms,
        config.receiver.reconnect_delay_ms
    );

    let store: Arc<dyn StatusStore> = match &config.store.url {
        Some(url) => {
            tracing::info!("  Store: {} (path '{}')", url, config.store.path);
            Arc::new(RestStore::new(url.clone(), config.store.path.clone()))
        }
        None => {
            tracing::info!("  Store: in-memory");
            Arc::new(MemoryStore::new())
        }
    };

    let bridge = Bridge::new(config, store);
    bridge
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Received Ctrl+C");
        })
        .await?;

    tracing::info!("Bridge stopped");
    Ok(())
}
