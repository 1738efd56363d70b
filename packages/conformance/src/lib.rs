//! Shared helpers for the eth2api conformance test suite.
//!
//! Provides [`spawn_node`], which binds a `TcpListener` on an ephemeral port,
//! serves an in-process node backed by [`MemoryBackend`], and returns both
//! the local URL and the backend so tests can seed chain data without going
//! through the HTTP layer.

use std::sync::Arc;

use eth2api::types::Timestamp;
use eth2api_client::HttpClient;
use eth2api_server::{build_router, BeaconBackend, MemoryBackend, NodeConfig};

/// Genesis time every spawned node reports.
pub const GENESIS_TIME: Timestamp = Timestamp(1606824023);

/// Start an ephemeral in-process node and return `(base_url, backend)`.
///
/// The node runs in a background `tokio` task bound to an OS-assigned port
/// on `127.0.0.1`, e.g. `http://127.0.0.1:51234`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the node fails to start.
pub async fn spawn_node() -> (String, Arc<MemoryBackend>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{addr}");

    let mem = Arc::new(MemoryBackend::new(GENESIS_TIME));
    let config = NodeConfig {
        bind_addr: addr,
        genesis_time: GENESIS_TIME,
        syncing: false,
        node_version: "conformance/0.1.0".into(),
    };
    let backend = Arc::new(BeaconBackend::from_memory(Arc::clone(&mem)));
    let router = build_router(backend, &config);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance node error");
    });

    (base_url, mem)
}

/// [`spawn_node`], plus a JSON client pointed at it.
pub async fn spawn_client() -> (HttpClient, Arc<MemoryBackend>) {
    let (base_url, mem) = spawn_node().await;
    (HttpClient::new(base_url), mem)
}
