//! End-to-end conformance tests: client bindings against a live node.
//!
//! Each test spawns an ephemeral in-process node (real TCP, real HTTP) via
//! [`eth2api_conformance::spawn_node`] and drives it through the
//! reqwest-backed [`HttpClient`]. Chain data is seeded straight into the
//! [`MemoryBackend`](eth2api_server::MemoryBackend).
//!
//! # Coverage
//!
//! | Test | Area |
//! |------|------|
//! | `genesis_round_trip` | beacon genesis, quoted integers |
//! | `unknown_block_is_absent` | 404 as `None` |
//! | `invalid_block_id_is_invalid_request` | 400 from path parsing |
//! | `block_lookups_by_every_id_form` | block id forms |
//! | `v2_block_carries_version` | versioned blocks, consensus header |
//! | `publish_block_reports_validity` | 200 vs 202 |
//! | `headers_filtered_by_query` | query encoding |
//! | `state_and_finality` | state ids |
//! | `attestation_batch_partial_failure` | indexed errors |
//! | `voluntary_exit_flow` | single submissions |
//! | `sync_committee_batch` | indexed errors |
//! | `node_health_and_version` | 200/206, envelope |
//! | `produce_block_while_syncing` | 503 propagation |
//! | `proposer_duties_dependent_root` | un-enveloped response |
//! | `unreachable_node_is_client_usage` | transport failure |
//! | `unrouted_requests_are_invalid_requests` | router-level 404/405 bodies |

use eth2api::types::{
    altair, phase0, Attestation, BlsSignature, CommitteeIndex, Epoch, ForkName, Root,
    SignedBeaconBlock, SignedVoluntaryExit, Slot, SyncCommitteeMessage, ValidatorIndex,
};
use eth2api::{ApiError, BlockId, Client, RequestDescriptor, StateId};
use eth2api_client::{beacon, node::HealthStatus, node, validator, HttpClient};
use eth2api_conformance::{spawn_client, spawn_node, GENESIS_TIME};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn phase0_child(parent: Root, slot: u64) -> SignedBeaconBlock {
    let mut block = phase0::SignedBeaconBlock::default();
    block.message.slot = Slot(slot);
    block.message.parent_root = parent;
    block.message.state_root = Root([0x50 + slot as u8; 32]);
    SignedBeaconBlock::Phase0(block)
}

fn altair_child(parent: Root, slot: u64) -> SignedBeaconBlock {
    let mut block = altair::SignedBeaconBlock::default();
    block.message.slot = Slot(slot);
    block.message.parent_root = parent;
    block.message.body.sync_aggregate.sync_committee_bits = "0x01".into();
    SignedBeaconBlock::Altair(block)
}

fn attestation(slot: u64, index: u64, target: Root) -> Attestation {
    let mut att = Attestation::default();
    att.data.slot = Slot(slot);
    att.data.index = CommitteeIndex(index);
    att.data.target.root = target;
    att
}

// ---------------------------------------------------------------------------
// Beacon
// ---------------------------------------------------------------------------

#[tokio::test]
async fn genesis_round_trip() {
    let (cli, _mem) = spawn_client().await;
    let genesis = beacon::genesis(&cli).await.unwrap().unwrap();
    assert_eq!(genesis.genesis_time, GENESIS_TIME);
}

#[tokio::test]
async fn unknown_block_is_absent() {
    let (cli, _mem) = spawn_client().await;
    let found = beacon::block(&cli, BlockId::Root(Root([0xab; 32]))).await.unwrap();
    assert!(found.is_none());
    let found = beacon::block_root(&cli, BlockId::Slot(Slot(40))).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn invalid_block_id_is_invalid_request() {
    let (cli, _mem) = spawn_client().await;
    let err = cli
        .request(RequestDescriptor::get("/eth/v1/beacon/blocks/0xnothex/root"))
        .await
        .decode::<serde_json::Value>()
        .unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert!(matches!(err, ApiError::InvalidRequest { status: 400, .. }));
    let body = err.error_body().unwrap();
    assert!(body.message().message.contains("block_id"));
}

#[tokio::test]
async fn block_lookups_by_every_id_form() {
    let (cli, mem) = spawn_client().await;
    let genesis = mem.genesis_root();
    let block = phase0_child(genesis, 1);
    let root = mem.insert_block(block.clone()).await.unwrap();

    for id in [BlockId::Head, BlockId::Slot(Slot(1)), BlockId::Root(root)] {
        assert_eq!(beacon::block_root(&cli, id).await.unwrap(), Some(root), "{id}");
    }
    assert_eq!(beacon::block_root(&cli, BlockId::Genesis).await.unwrap(), Some(genesis));
    assert_eq!(beacon::block_root(&cli, BlockId::Finalized).await.unwrap(), Some(genesis));
    assert_eq!(beacon::block(&cli, BlockId::Head).await.unwrap(), Some(block));

    let header = beacon::block_header(&cli, BlockId::Head).await.unwrap().unwrap();
    assert_eq!(header.root, root);
    assert!(header.canonical);
    assert_eq!(header.header.message.parent_root, genesis);
}

#[tokio::test]
async fn v2_block_carries_version() {
    let (base_url, mem) = spawn_node().await;
    let block = altair_child(mem.genesis_root(), 3);
    mem.insert_block(block.clone()).await.unwrap();

    let cli = HttpClient::new(base_url.clone());
    let versioned = beacon::block_v2(&cli, BlockId::Head).await.unwrap().unwrap();
    assert_eq!(versioned.version(), ForkName::Altair);
    assert_eq!(versioned.into_block(), block);

    let resp = reqwest::get(format!("{base_url}/eth/v2/beacon/blocks/head"))
        .await
        .unwrap();
    assert_eq!(resp.headers()["eth-consensus-version"], "altair");
    assert_eq!(resp.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn publish_block_reports_validity() {
    let (cli, mem) = spawn_client().await;
    let block = phase0_child(mem.genesis_root(), 1);
    assert!(beacon::publish_block(&cli, &block).await.unwrap());
    assert_eq!(beacon::block(&cli, BlockId::Slot(Slot(1))).await.unwrap(), Some(block));

    let orphan = phase0_child(Root([0x99; 32]), 2);
    assert!(!beacon::publish_block(&cli, &orphan).await.unwrap());
    assert_eq!(mem.published().await.blocks.len(), 2);
}

#[tokio::test]
async fn headers_filtered_by_query() {
    let (cli, mem) = spawn_client().await;
    let genesis = mem.genesis_root();
    let a = mem.insert_block(phase0_child(genesis, 1)).await.unwrap();
    let b = mem.insert_block(phase0_child(a, 2)).await.unwrap();

    let by_parent = beacon::block_headers(&cli, None, Some(a)).await.unwrap();
    assert_eq!(by_parent.len(), 1);
    assert_eq!(by_parent[0].root, b);

    let by_slot = beacon::block_headers(&cli, Some(Slot(1)), None).await.unwrap();
    assert_eq!(by_slot.len(), 1);
    assert_eq!(by_slot[0].root, a);

    let at_head = beacon::block_headers(&cli, None, None).await.unwrap();
    assert_eq!(at_head[0].root, b);

    assert!(beacon::block_headers(&cli, Some(Slot(9)), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn state_and_finality() {
    let (cli, mem) = spawn_client().await;
    let block = phase0_child(mem.genesis_root(), 1);
    let root = mem.insert_block(block.clone()).await.unwrap();
    mem.finalize(root).await.unwrap();

    let state_root = beacon::state_root(&cli, StateId::Head).await.unwrap();
    assert_eq!(state_root, Some(block.state_root()));
    assert_eq!(
        beacon::state_root(&cli, StateId::Root(block.state_root())).await.unwrap(),
        Some(block.state_root())
    );

    let checkpoints = beacon::finality_checkpoints(&cli, StateId::Justified)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoints.finalized.root, root);
    assert_eq!(checkpoints.finalized.epoch, Epoch(0));

    assert!(beacon::state_root(&cli, StateId::Slot(Slot(5))).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attestation_batch_partial_failure() {
    let (cli, mem) = spawn_client().await;
    let genesis = mem.genesis_root();
    let batch = vec![
        attestation(1, 0, genesis),
        attestation(1, 1, Root([0x77; 32])),
        attestation(1, 2, genesis),
    ];

    let err = beacon::submit_pool_attestations(&cli, &batch).await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    let failures = err.indexed_errors().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);

    let pooled = beacon::pool_attestations(&cli, None, None).await.unwrap();
    assert_eq!(pooled, vec![batch[0].clone(), batch[2].clone()]);
    assert_eq!(mem.published().await.attestations, pooled);

    let filtered = beacon::pool_attestations(&cli, Some(Slot(1)), Some(CommitteeIndex(2)))
        .await
        .unwrap();
    assert_eq!(filtered, vec![batch[2].clone()]);
}

#[tokio::test]
async fn voluntary_exit_flow() {
    let (cli, _mem) = spawn_client().await;
    assert!(beacon::pool_voluntary_exits(&cli).await.unwrap().is_empty());

    let mut exit = SignedVoluntaryExit::default();
    exit.message.validator_index = ValidatorIndex(12);
    beacon::submit_voluntary_exit(&cli, &exit).await.unwrap();
    assert_eq!(beacon::pool_voluntary_exits(&cli).await.unwrap(), vec![exit]);

    let err = beacon::submit_voluntary_exit(&cli, &exit).await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));
}

#[tokio::test]
async fn sync_committee_batch() {
    let (cli, mem) = spawn_client().await;
    let good = SyncCommitteeMessage {
        beacon_block_root: mem.genesis_root(),
        validator_index: ValidatorIndex(3),
        ..Default::default()
    };
    beacon::submit_sync_committee_messages(&cli, &[good]).await.unwrap();

    let err = beacon::submit_sync_committee_messages(&cli, &[good, SyncCommitteeMessage::default()])
        .await
        .unwrap_err();
    let failures = err.indexed_errors().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    assert_eq!(mem.pooled_sync_committee_messages().await, vec![good, good]);
}

// ---------------------------------------------------------------------------
// Node and validator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn node_health_and_version() {
    let (cli, mem) = spawn_client().await;
    assert_eq!(node::health(&cli).await.unwrap(), HealthStatus::Ready);
    assert_eq!(node::version(&cli).await.unwrap(), "conformance/0.1.0");

    mem.set_syncing(true).await;
    assert_eq!(node::health(&cli).await.unwrap(), HealthStatus::Syncing);
    assert!(node::syncing(&cli).await.unwrap().is_syncing);
}

#[tokio::test]
async fn produce_block_while_syncing() {
    let (cli, mem) = spawn_client().await;
    let randao = BlsSignature([5; 96]);

    let block = validator::produce_block(&cli, Slot(1), randao, None).await.unwrap();
    assert_eq!(block.parent_root, mem.genesis_root());
    assert_eq!(block.body.randao_reveal, randao);

    mem.set_syncing(true).await;
    let err = validator::produce_block(&cli, Slot(1), randao, Some(Root([1; 32])))
        .await
        .unwrap_err();
    assert!(err.is_syncing());
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn proposer_duties_dependent_root() {
    let (cli, mem) = spawn_client().await;
    let root = mem.insert_block(phase0_child(mem.genesis_root(), 31)).await.unwrap();

    let duties = validator::proposer_duties(&cli, Epoch(1)).await.unwrap();
    assert_eq!(duties.dependent_root, root);
    assert_eq!(duties.data.len(), 32);
    assert_eq!(duties.data[0].slot, Slot(32));

    let duties = validator::proposer_duties(&cli, Epoch(0)).await.unwrap();
    assert_eq!(duties.dependent_root, mem.genesis_root());
}

#[tokio::test]
async fn unreachable_node_is_client_usage() {
    let cli = HttpClient::new("http://127.0.0.1:1/");
    let err = beacon::genesis(&cli).await.unwrap_err();
    assert!(matches!(err, ApiError::ClientUsage(_)));
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn unrouted_requests_are_invalid_requests() {
    let (cli, _mem) = spawn_client().await;

    let err = cli
        .request(RequestDescriptor::get("/eth/v1/no/such/endpoint"))
        .await
        .decode::<serde_json::Value>()
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest { status: 404, .. }));
    let body = err.error_body().unwrap();
    assert!(body.message().message.contains("/eth/v1/no/such/endpoint"));

    let err = cli
        .request(RequestDescriptor::get("/eth/v1/beacon/pool/sync_committees"))
        .await
        .discard()
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest { status: 405, .. }));
    assert_eq!(err.error_body().unwrap().message().code, 405);
}
