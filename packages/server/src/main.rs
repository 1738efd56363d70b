//! `eth2api-node`: an in-memory Beacon Node API server.
//!
//! # Quick start
//!
//! ```sh
//! # Fresh chain on the default port:
//! eth2api-node
//!
//! # Custom bind address, starting in syncing mode:
//! ETH2API_BIND=0.0.0.0:5052 ETH2API_SYNCING=true eth2api-node
//! ```
//!
//! # Environment variables
//!
//! See [`NodeConfig::from_env`] for the full list.

use std::sync::Arc;

use eth2api_server::{build_router, BeaconBackend, MemoryBackend, NodeConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eth2api_server=info,tower_http=debug".into()),
        )
        .init();

    let config = NodeConfig::from_env()?;

    let mem = Arc::new(MemoryBackend::new(config.genesis_time));
    mem.set_syncing(config.syncing).await;
    tracing::info!(
        genesis_root = %mem.genesis_root(),
        syncing = config.syncing,
        "backend: in-memory (data will not survive restart)"
    );

    let app = build_router(Arc::new(BeaconBackend::from_memory(mem)), &config);

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", config.bind_addr))?;

    axum::serve(listener, app).await?;
    Ok(())
}
