//! `/eth/v1/beacon` and `/eth/v2/beacon` endpoints.
//!
//! Lookups return `Ok(None)` when the node answers 404.

use eth2api::types::{
    Attestation, BeaconBlockHeaderAndInfo, CommitteeIndex, FinalityCheckpoints, GenesisResponse,
    Root, RootResponse, SignedBeaconBlock, SignedVoluntaryExit, Slot, SyncCommitteeMessage,
    VersionedSignedBeaconBlock,
};
use eth2api::{
    minimal_request, simple_request, ApiError, BlockId, Client, Envelope, Query, QueryValue,
    RequestDescriptor, StateId,
};

use crate::unwrap_data;

/// `GET /eth/v1/beacon/genesis`
pub async fn genesis<C: Client>(cli: &C) -> Result<Option<GenesisResponse>, ApiError> {
    unwrap_data(simple_request(cli, RequestDescriptor::get("/eth/v1/beacon/genesis")).await)
}

/// `GET /eth/v1/beacon/blocks/{block_id}/root`
pub async fn block_root<C: Client>(cli: &C, id: BlockId) -> Result<Option<Root>, ApiError> {
    let path = format!("/eth/v1/beacon/blocks/{id}/root");
    let res: Option<RootResponse> = unwrap_data(simple_request(cli, RequestDescriptor::get(path)).await)?;
    Ok(res.map(|r| r.root))
}

/// `GET /eth/v1/beacon/blocks/{block_id}`
pub async fn block<C: Client>(cli: &C, id: BlockId) -> Result<Option<SignedBeaconBlock>, ApiError> {
    let path = format!("/eth/v1/beacon/blocks/{id}");
    unwrap_data(simple_request(cli, RequestDescriptor::get(path)).await)
}

/// `GET /eth/v2/beacon/blocks/{block_id}`. The reply names its fork and is
/// not envelope-wrapped.
pub async fn block_v2<C: Client>(
    cli: &C,
    id: BlockId,
) -> Result<Option<VersionedSignedBeaconBlock>, ApiError> {
    let path = format!("/eth/v2/beacon/blocks/{id}");
    simple_request(cli, RequestDescriptor::get(path)).await
}

/// `GET /eth/v1/beacon/blocks/{block_id}/attestations`
pub async fn block_attestations<C: Client>(
    cli: &C,
    id: BlockId,
) -> Result<Option<Vec<Attestation>>, ApiError> {
    let path = format!("/eth/v1/beacon/blocks/{id}/attestations");
    unwrap_data(simple_request(cli, RequestDescriptor::get(path)).await)
}

/// `POST /eth/v1/beacon/blocks`
///
/// Returns `Ok(false)` when the node broadcast the block but failed to
/// validate it locally (202).
pub async fn publish_block<C: Client>(cli: &C, block: &SignedBeaconBlock) -> Result<bool, ApiError> {
    let code = cli
        .request(RequestDescriptor::post("/eth/v1/beacon/blocks", block))
        .await
        .discard()?;
    Ok(code != 202)
}

/// `GET /eth/v1/beacon/headers/{block_id}`
pub async fn block_header<C: Client>(
    cli: &C,
    id: BlockId,
) -> Result<Option<BeaconBlockHeaderAndInfo>, ApiError> {
    let path = format!("/eth/v1/beacon/headers/{id}");
    unwrap_data(simple_request(cli, RequestDescriptor::get(path)).await)
}

/// `GET /eth/v1/beacon/headers`, optionally filtered by slot and parent.
/// Without filters the node serves the headers at the head slot.
pub async fn block_headers<C: Client>(
    cli: &C,
    slot: Option<Slot>,
    parent_root: Option<Root>,
) -> Result<Vec<BeaconBlockHeaderAndInfo>, ApiError> {
    let query = Query::new()
        .with_opt("slot", slot.map(|s| QueryValue::text(&s)))
        .with_opt("parent_root", parent_root.map(|r| QueryValue::text(&r)));
    let req = RequestDescriptor::get("/eth/v1/beacon/headers").with_query(query);
    minimal_request(cli, req).await.map(Envelope::into_data)
}

/// `GET /eth/v1/beacon/states/{state_id}/root`
pub async fn state_root<C: Client>(cli: &C, id: StateId) -> Result<Option<Root>, ApiError> {
    let path = format!("/eth/v1/beacon/states/{id}/root");
    let res: Option<RootResponse> = unwrap_data(simple_request(cli, RequestDescriptor::get(path)).await)?;
    Ok(res.map(|r| r.root))
}

/// `GET /eth/v1/beacon/states/{state_id}/finality_checkpoints`
pub async fn finality_checkpoints<C: Client>(
    cli: &C,
    id: StateId,
) -> Result<Option<FinalityCheckpoints>, ApiError> {
    let path = format!("/eth/v1/beacon/states/{id}/finality_checkpoints");
    unwrap_data(simple_request(cli, RequestDescriptor::get(path)).await)
}

/// `GET /eth/v1/beacon/pool/attestations`
pub async fn pool_attestations<C: Client>(
    cli: &C,
    slot: Option<Slot>,
    committee_index: Option<CommitteeIndex>,
) -> Result<Vec<Attestation>, ApiError> {
    let query = Query::new()
        .with_opt("slot", slot.map(|s| QueryValue::text(&s)))
        .with_opt("committee_index", committee_index.map(|c| QueryValue::text(&c)));
    let req = RequestDescriptor::get("/eth/v1/beacon/pool/attestations").with_query(query);
    minimal_request(cli, req).await.map(Envelope::into_data)
}

/// `POST /eth/v1/beacon/pool/attestations`
///
/// A partial rejection comes back as an error whose
/// [`indexed_errors`](ApiError::indexed_errors) name the failed elements.
pub async fn submit_pool_attestations<C: Client>(
    cli: &C,
    attestations: &[Attestation],
) -> Result<(), ApiError> {
    cli.request(RequestDescriptor::post(
        "/eth/v1/beacon/pool/attestations",
        attestations,
    ))
    .await
    .discard()
    .map(|_| ())
}

/// `GET /eth/v1/beacon/pool/voluntary_exits`
pub async fn pool_voluntary_exits<C: Client>(cli: &C) -> Result<Vec<SignedVoluntaryExit>, ApiError> {
    let req = RequestDescriptor::get("/eth/v1/beacon/pool/voluntary_exits");
    minimal_request(cli, req).await.map(Envelope::into_data)
}

/// `POST /eth/v1/beacon/pool/voluntary_exits`
pub async fn submit_voluntary_exit<C: Client>(
    cli: &C,
    exit: &SignedVoluntaryExit,
) -> Result<(), ApiError> {
    cli.request(RequestDescriptor::post(
        "/eth/v1/beacon/pool/voluntary_exits",
        exit,
    ))
    .await
    .discard()
    .map(|_| ())
}

/// `POST /eth/v1/beacon/pool/sync_committees`
pub async fn submit_sync_committee_messages<C: Client>(
    cli: &C,
    messages: &[SyncCommitteeMessage],
) -> Result<(), ApiError> {
    cli.request(RequestDescriptor::post(
        "/eth/v1/beacon/pool/sync_committees",
        messages,
    ))
    .await
    .discard()
    .map(|_| ())
}
