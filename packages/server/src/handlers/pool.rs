//! `/eth/v1/beacon/pool` endpoints.
//!
//! Batch submissions run every element through [`accept_indexed`] and
//! report each rejected element under its position in the request.

use std::sync::Arc;

use eth2api::types::{Attestation, SignedVoluntaryExit, SyncCommitteeMessage};
use eth2api::{Codec, Envelope, IncomingRequest, PreparedResponse};

use super::{decode_body, query_param, Reply};
use crate::backend::{accept_indexed, BackendError, BeaconBackend};

/// `GET /eth/v1/beacon/pool/attestations?slot=&committee_index=`
pub async fn pool_attestations<C: Codec>(
    backend: Arc<BeaconBackend>,
    req: IncomingRequest<C>,
) -> Reply<C> {
    let slot = query_param(&req, "slot")?;
    let committee_index = query_param(&req, "committee_index")?;
    let atts = backend.attestation_pool.search(slot, committee_index).await;
    Ok(PreparedResponse::ok(Envelope::wrap(atts)))
}

/// `POST /eth/v1/beacon/pool/attestations`
pub async fn publish_attestations<C: Codec>(
    backend: Arc<BeaconBackend>,
    mut req: IncomingRequest<C>,
) -> Reply<C> {
    let atts: Vec<Attestation> = decode_body(&mut req)?;

    let backend = &*backend;
    let outcome = accept_indexed(&atts, move |att| async move {
        let target = att.data.target.root;
        if backend.chain.by_block_root(target).await.is_none() {
            return Err(BackendError::Invalid(format!("unknown target root {target}")));
        }
        backend.attestation_pool.add(att.clone()).await?;
        backend.publisher.publish_attestation(att).await
    })
    .await;

    if !outcome.failures.is_empty() {
        tracing::warn!(
            rejected = outcome.failures.len(),
            total = atts.len(),
            "attestation batch partially rejected"
        );
        return Err(PreparedResponse::bad_inputs("cannot store/publish", outcome.failures));
    }
    if outcome.syncing {
        return Err(PreparedResponse::syncing(
            "beacon is syncing, stored attestations but cannot publish them",
        ));
    }
    Ok(PreparedResponse::ok_msg("stored and broadcast all attestations"))
}

/// `GET /eth/v1/beacon/pool/voluntary_exits`
pub async fn pool_voluntary_exits<C: Codec>(
    backend: Arc<BeaconBackend>,
    _req: IncomingRequest<C>,
) -> Reply<C> {
    let exits = backend.voluntary_exit_pool.all().await;
    Ok(PreparedResponse::ok(Envelope::wrap(exits)))
}

/// `POST /eth/v1/beacon/pool/voluntary_exits`
pub async fn publish_voluntary_exit<C: Codec>(
    backend: Arc<BeaconBackend>,
    mut req: IncomingRequest<C>,
) -> Reply<C> {
    let exit: SignedVoluntaryExit = decode_body(&mut req)?;

    backend
        .voluntary_exit_pool
        .add(exit)
        .await
        .map_err(BackendError::into_response)?;

    let syncing = backend
        .publisher
        .publish_voluntary_exit(&exit)
        .await
        .map_err(|e| {
            PreparedResponse::internal_error(format!("failed to publish voluntary exit: {e}"))
        })?;
    if syncing {
        return Err(PreparedResponse::syncing(
            "beacon is syncing, stored voluntary exit but cannot publish it",
        ));
    }
    Ok(PreparedResponse::ok_msg("stored and broadcast voluntary exit"))
}

/// `POST /eth/v1/beacon/pool/sync_committees`
pub async fn publish_sync_committee_messages<C: Codec>(
    backend: Arc<BeaconBackend>,
    mut req: IncomingRequest<C>,
) -> Reply<C> {
    let msgs: Vec<SyncCommitteeMessage> = decode_body(&mut req)?;

    let backend = &*backend;
    let outcome = accept_indexed(&msgs, move |msg| async move {
        backend.sync_committee_pool.add(*msg).await?;
        backend.publisher.publish_sync_committee_message(msg).await
    })
    .await;

    if !outcome.failures.is_empty() {
        return Err(PreparedResponse::bad_inputs("cannot store/publish", outcome.failures));
    }
    if outcome.syncing {
        return Err(PreparedResponse::syncing(
            "beacon is syncing, stored sync committee messages but cannot publish them",
        ));
    }
    Ok(PreparedResponse::ok_msg("stored and broadcast all sync committee messages"))
}
