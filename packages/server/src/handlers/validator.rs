//! `/eth/v1/validator` endpoints. Both answer 503 while the node is syncing.

use std::sync::Arc;

use eth2api::types::{BlsSignature, Epoch, Root, Slot};
use eth2api::{Codec, Envelope, IncomingRequest, PreparedResponse};

use super::{path_param, query_param, Reply};
use crate::backend::{BackendError, BeaconBackend};

async fn ensure_synced<C: Codec>(backend: &BeaconBackend) -> Result<(), PreparedResponse<C>> {
    if backend.chain.sync_status().await.is_syncing {
        return Err(PreparedResponse::syncing("beacon node is syncing"));
    }
    Ok(())
}

/// `GET /eth/v1/validator/blocks/:slot?randao_reveal=&graffiti=`
pub async fn produce_block<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let slot: Slot = path_param(&req, "slot")?;
    let randao_reveal: BlsSignature = query_param(&req, "randao_reveal")?
        .ok_or_else(|| PreparedResponse::bad_input("missing randao_reveal query param"))?;
    let graffiti: Root = query_param(&req, "graffiti")?.unwrap_or_default();

    ensure_synced(&backend).await?;

    let block = backend
        .producer
        .produce_block(slot, randao_reveal, graffiti)
        .await
        .map_err(BackendError::into_response)?;
    Ok(PreparedResponse::ok(Envelope::wrap(block)))
}

/// `GET /eth/v1/validator/duties/proposer/:epoch`
///
/// Answers `{"dependent_root", "data"}` rather than a plain envelope.
pub async fn proposer_duties<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let epoch: Epoch = path_param(&req, "epoch")?;

    ensure_synced(&backend).await?;

    let duties = backend
        .producer
        .proposer_duties(epoch)
        .await
        .map_err(BackendError::into_response)?;
    Ok(PreparedResponse::ok(duties))
}
