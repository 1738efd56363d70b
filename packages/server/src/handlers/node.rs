//! `/eth/v1/node` endpoints.

use std::sync::Arc;

use eth2api::types::NodeVersionResponse;
use eth2api::{Codec, Envelope, IncomingRequest, PreparedResponse, ReqMethod, Route};

use super::Reply;
use crate::backend::BeaconBackend;

/// `GET /eth/v1/node/health`: 200 when ready, 206 while syncing. No body.
pub async fn health<C: Codec>(backend: Arc<BeaconBackend>, _req: IncomingRequest<C>) -> Reply<C> {
    let status = backend.chain.sync_status().await;
    Ok(PreparedResponse::with_code(if status.is_syncing { 206 } else { 200 }))
}

/// `GET /eth/v1/node/version`, answering with a fixed version string.
pub fn version<C: Codec>(version: String) -> Route<C> {
    Route::new(ReqMethod::Get, "/eth/v1/node/version", move |_req: IncomingRequest<C>| {
        let version = version.clone();
        async move { PreparedResponse::ok(Envelope::wrap(NodeVersionResponse { version })) }
    })
}

/// `GET /eth/v1/node/syncing`
pub async fn syncing<C: Codec>(backend: Arc<BeaconBackend>, _req: IncomingRequest<C>) -> Reply<C> {
    let status = backend.chain.sync_status().await;
    Ok(PreparedResponse::ok(Envelope::wrap(status)))
}
