//! `/eth/v1/beacon` and `/eth/v2/beacon` block, header, and state endpoints.

use std::sync::Arc;

use eth2api::types::{
    BeaconBlockHeaderAndInfo, RootResponse, SignedBeaconBlock, VersionedSignedBeaconBlock,
};
use eth2api::{BlockId, Codec, Envelope, IncomingRequest, PreparedResponse, StateId};

use super::{decode_body, path_param, query_param, Reply};
use crate::backend::{BackendError, BeaconBackend, ChainEntry};

async fn lookup_block<C: Codec>(
    backend: &BeaconBackend,
    req: &IncomingRequest<C>,
) -> Result<ChainEntry, PreparedResponse<C>> {
    let id: BlockId = path_param(req, "block_id")?;
    backend
        .block_lookup(id)
        .await
        .ok_or_else(|| PreparedResponse::not_found("Block not found"))
}

async fn lookup_state<C: Codec>(
    backend: &BeaconBackend,
    req: &IncomingRequest<C>,
) -> Result<ChainEntry, PreparedResponse<C>> {
    let id: StateId = path_param(req, "state_id")?;
    backend
        .state_lookup(id)
        .await
        .ok_or_else(|| PreparedResponse::not_found("State not found"))
}

async fn load_block<C: Codec>(
    backend: &BeaconBackend,
    entry: &ChainEntry,
) -> Result<SignedBeaconBlock, PreparedResponse<C>> {
    match backend.blocks.get(entry.block_root).await {
        Ok(Some(block)) => Ok(block),
        Ok(None) => Err(PreparedResponse::not_found("Block not found")),
        Err(err) => Err(PreparedResponse::internal_error(format!("failed to load block: {err}"))),
    }
}

async fn header_info<C: Codec>(
    backend: &BeaconBackend,
    entry: &ChainEntry,
) -> Result<BeaconBlockHeaderAndInfo, PreparedResponse<C>> {
    let block = load_block(backend, entry).await?;
    let canonical = backend
        .chain
        .by_canonical_slot(entry.slot)
        .await
        .is_some_and(|c| c.block_root == entry.block_root);
    Ok(BeaconBlockHeaderAndInfo {
        root: entry.block_root,
        canonical,
        header: block.signed_header(entry.body_root),
    })
}

/// `GET /eth/v1/beacon/genesis`
pub async fn genesis<C: Codec>(backend: Arc<BeaconBackend>, _req: IncomingRequest<C>) -> Reply<C> {
    let genesis = backend.chain.genesis().await;
    Ok(PreparedResponse::ok(Envelope::wrap(genesis)))
}

/// `GET /eth/v1/beacon/blocks/:block_id/root`
pub async fn block_root<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let entry = lookup_block(&backend, &req).await?;
    Ok(PreparedResponse::ok(Envelope::wrap(RootResponse {
        root: entry.block_root,
    })))
}

/// `GET /eth/v1/beacon/blocks/:block_id`
pub async fn block<C: Codec>(backend: Arc<BeaconBackend>, req: IncomingRequest<C>) -> Reply<C> {
    let entry = lookup_block(&backend, &req).await?;
    let block = load_block(&backend, &entry).await?;
    Ok(PreparedResponse::ok(Envelope::wrap(block)))
}

/// `GET /eth/v2/beacon/blocks/:block_id`
///
/// The body is `{"version", "data"}`, and the fork is repeated in the
/// `Eth-Consensus-Version` header.
pub async fn block_v2<C: Codec>(backend: Arc<BeaconBackend>, req: IncomingRequest<C>) -> Reply<C> {
    let entry = lookup_block(&backend, &req).await?;
    let block = VersionedSignedBeaconBlock::from(load_block(&backend, &entry).await?);
    let version = block.version();
    Ok(PreparedResponse::ok(block).with_header("Eth-Consensus-Version", version.as_str()))
}

/// `GET /eth/v1/beacon/blocks/:block_id/attestations`
pub async fn block_attestations<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let entry = lookup_block(&backend, &req).await?;
    let block = load_block(&backend, &entry).await?;
    Ok(PreparedResponse::ok(Envelope::wrap(block.attestations().to_vec())))
}

/// `POST /eth/v1/beacon/blocks`
///
/// The block is imported locally even when it cannot be broadcast.
pub async fn publish_block<C: Codec>(
    backend: Arc<BeaconBackend>,
    mut req: IncomingRequest<C>,
) -> Reply<C> {
    let block: SignedBeaconBlock = decode_body(&mut req)?;

    let published = backend.publisher.publish_block(&block).await;

    let root = backend
        .blocks
        .store(&block)
        .await
        .map_err(|e| PreparedResponse::internal_error(format!("failed to store block: {e}")))?;
    let imported = backend.chain.add_block(root, &block).await;

    let syncing = published
        .map_err(|e| PreparedResponse::internal_error(format!("failed to publish block: {e}")))?;
    if syncing {
        return Err(PreparedResponse::syncing(
            "beacon is syncing, added it to the chain, but cannot publish block",
        ));
    }

    match imported {
        Ok(()) => {
            tracing::info!(slot = %block.slot(), %root, "block published");
            Ok(PreparedResponse::ok_msg("processed and published block"))
        }
        Err(BackendError::Invalid(reason)) => {
            tracing::warn!(slot = %block.slot(), "broadcast block failed validation: {reason}");
            Ok(PreparedResponse::accepted(format!(
                "block was broadcast but failed validation: {reason}"
            )))
        }
        Err(err) => Err(PreparedResponse::internal_error(format!(
            "failed to process block: {err}"
        ))),
    }
}

/// `GET /eth/v1/beacon/headers/:block_id`
pub async fn block_header<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let entry = lookup_block(&backend, &req).await?;
    let info = header_info(&backend, &entry).await?;
    Ok(PreparedResponse::ok(Envelope::wrap(info)))
}

/// `GET /eth/v1/beacon/headers?slot=&parent_root=`
pub async fn block_headers<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let slot = query_param(&req, "slot")?;
    let parent_root = query_param(&req, "parent_root")?;

    let entries = backend.chain.search(parent_root, slot).await;
    let mut headers = Vec::with_capacity(entries.len());
    for entry in &entries {
        headers.push(header_info(&backend, entry).await?);
    }
    Ok(PreparedResponse::ok(Envelope::wrap(headers)))
}

/// `GET /eth/v1/beacon/states/:state_id/root`
pub async fn state_root<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let entry = lookup_state(&backend, &req).await?;
    Ok(PreparedResponse::ok(Envelope::wrap(RootResponse {
        root: entry.state_root,
    })))
}

/// `GET /eth/v1/beacon/states/:state_id/finality_checkpoints`
pub async fn finality_checkpoints<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let entry = lookup_state(&backend, &req).await?;
    let checkpoints = backend.chain.finality_checkpoints(&entry).await;
    Ok(PreparedResponse::ok(Envelope::wrap(checkpoints)))
}
