//! In-memory backend implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and the demo binary.
//!
//! Roots are not hashes: they are derived from an insertion sequence number
//! and the slot, which keeps them unique and readable in test output.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use eth2api::types::{
    phase0, Attestation, BlsPubkey, BlsSignature, Checkpoint, CommitteeIndex,
    DependentProposerDuty, Epoch, FinalityCheckpoints, GenesisResponse, ProposerDuty, Root,
    SignedBeaconBlock, SignedVoluntaryExit, Slot, SyncCommitteeMessage, SyncingStatus, Timestamp,
    ValidatorIndex, Version,
};
use tokio::sync::RwLock;

use super::{
    AttestationPool, BackendError, BlockProducer, BlockStore, Chain, ChainEntry, Publisher,
    SyncCommitteePool, VoluntaryExitPool,
};

pub const SLOTS_PER_EPOCH: u64 = 32;

/// Size of the fake validator set used for proposer selection.
const VALIDATOR_COUNT: u64 = 64;

const BLOCK_TAG: u8 = 0xb1;
const STATE_TAG: u8 = 0x57;
const BODY_TAG: u8 = 0xbd;

fn derive_root(seq: u64, slot: Slot, tag: u8) -> Root {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seq.to_be_bytes());
    bytes[8..16].copy_from_slice(&slot.0.to_be_bytes());
    bytes[31] = tag;
    Root(bytes)
}

fn body_root_of(block_root: Root) -> Root {
    let mut bytes = block_root.0;
    bytes[31] = BODY_TAG;
    Root(bytes)
}

fn epoch_of(slot: Slot) -> Epoch {
    Epoch(slot.0 / SLOTS_PER_EPOCH)
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// Everything that was handed to the [`Publisher`].
#[derive(Debug, Default, Clone)]
pub struct Published {
    pub blocks: Vec<SignedBeaconBlock>,
    pub attestations: Vec<Attestation>,
    pub voluntary_exits: Vec<SignedVoluntaryExit>,
    pub sync_committee_messages: Vec<SyncCommitteeMessage>,
}

struct Inner {
    blocks: HashMap<Root, SignedBeaconBlock>,
    entries: HashMap<Root, ChainEntry>,
    canonical: BTreeMap<Slot, Root>,
    head: Root,
    finalized: Root,
    justified: Root,
    attestations: Vec<Attestation>,
    voluntary_exits: Vec<SignedVoluntaryExit>,
    sync_committee_messages: Vec<SyncCommitteeMessage>,
    published: Published,
    syncing: bool,
    next_seq: u64,
}

impl Inner {
    fn entry(&self, root: Root) -> Option<ChainEntry> {
        self.entries.get(&root).copied()
    }
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of every backend trait.
pub struct MemoryBackend {
    genesis: GenesisResponse,
    genesis_root: Root,
    inner: RwLock<Inner>,
}

impl MemoryBackend {
    /// A chain holding only a genesis block at slot 0, which is also head,
    /// justified, and finalized.
    pub fn new(genesis_time: Timestamp) -> Self {
        let genesis_root = derive_root(0, Slot(0), BLOCK_TAG);
        let mut block = phase0::SignedBeaconBlock::default();
        block.message.state_root = derive_root(0, Slot(0), STATE_TAG);
        let block = SignedBeaconBlock::Phase0(block);

        let entry = ChainEntry {
            slot: Slot(0),
            block_root: genesis_root,
            parent_root: Root::default(),
            state_root: block.state_root(),
            body_root: body_root_of(genesis_root),
            proposer_index: ValidatorIndex(0),
        };

        let inner = Inner {
            blocks: HashMap::from([(genesis_root, block)]),
            entries: HashMap::from([(genesis_root, entry)]),
            canonical: BTreeMap::from([(Slot(0), genesis_root)]),
            head: genesis_root,
            finalized: genesis_root,
            justified: genesis_root,
            attestations: Vec::new(),
            voluntary_exits: Vec::new(),
            sync_committee_messages: Vec::new(),
            published: Published::default(),
            syncing: false,
            next_seq: 1,
        };

        Self {
            genesis: GenesisResponse {
                genesis_time,
                genesis_validators_root: derive_root(0, Slot(0), 0x01),
                genesis_fork_version: Version::default(),
            },
            genesis_root,
            inner: RwLock::new(inner),
        }
    }

    pub fn genesis_root(&self) -> Root {
        self.genesis_root
    }

    pub async fn set_syncing(&self, syncing: bool) {
        self.inner.write().await.syncing = syncing;
    }

    /// Store a block and import it into the chain.
    pub async fn insert_block(&self, block: SignedBeaconBlock) -> Result<Root, BackendError> {
        let root = self.store(&block).await?;
        self.add_block(root, &block).await?;
        Ok(root)
    }

    /// Mark a known block as justified and finalized.
    pub async fn finalize(&self, root: Root) -> Result<(), BackendError> {
        let mut inner = self.inner.write().await;
        if !inner.entries.contains_key(&root) {
            return Err(BackendError::NotFound("Block"));
        }
        inner.justified = root;
        inner.finalized = root;
        Ok(())
    }

    pub async fn published(&self) -> Published {
        self.inner.read().await.published.clone()
    }

    pub async fn pooled_sync_committee_messages(&self) -> Vec<SyncCommitteeMessage> {
        self.inner.read().await.sync_committee_messages.clone()
    }

    async fn publish<F>(&self, record: F) -> Result<bool, BackendError>
    where
        F: FnOnce(&mut Published) + Send,
    {
        let mut inner = self.inner.write().await;
        if inner.syncing {
            return Ok(true);
        }
        record(&mut inner.published);
        Ok(false)
    }
}

#[async_trait]
impl Chain for MemoryBackend {
    async fn genesis(&self) -> GenesisResponse {
        self.genesis
    }

    async fn head(&self) -> Option<ChainEntry> {
        let inner = self.inner.read().await;
        inner.entry(inner.head)
    }

    async fn finalized(&self) -> Option<ChainEntry> {
        let inner = self.inner.read().await;
        inner.entry(inner.finalized)
    }

    async fn justified(&self) -> Option<ChainEntry> {
        let inner = self.inner.read().await;
        inner.entry(inner.justified)
    }

    async fn by_block_root(&self, root: Root) -> Option<ChainEntry> {
        self.inner.read().await.entry(root)
    }

    async fn by_state_root(&self, root: Root) -> Option<ChainEntry> {
        let inner = self.inner.read().await;
        inner
            .entries
            .values()
            .find(|e| e.state_root == root)
            .copied()
    }

    async fn by_canonical_slot(&self, slot: Slot) -> Option<ChainEntry> {
        let inner = self.inner.read().await;
        inner.canonical.get(&slot).and_then(|root| inner.entry(*root))
    }

    async fn search(&self, parent_root: Option<Root>, slot: Option<Slot>) -> Vec<ChainEntry> {
        let inner = self.inner.read().await;
        let slot = match (parent_root, slot) {
            (None, None) => inner.entry(inner.head).map(|e| e.slot),
            _ => slot,
        };
        let mut found: Vec<ChainEntry> = inner
            .entries
            .values()
            .filter(|e| parent_root.map_or(true, |p| e.parent_root == p))
            .filter(|e| slot.map_or(true, |s| e.slot == s))
            .copied()
            .collect();
        found.sort_by_key(|e| (e.slot, e.block_root));
        found
    }

    async fn finality_checkpoints(&self, _entry: &ChainEntry) -> FinalityCheckpoints {
        let inner = self.inner.read().await;
        let checkpoint = |root: Root| Checkpoint {
            epoch: inner.entry(root).map(|e| epoch_of(e.slot)).unwrap_or_default(),
            root,
        };
        FinalityCheckpoints {
            previous_justified: checkpoint(inner.justified),
            current_justified: checkpoint(inner.justified),
            finalized: checkpoint(inner.finalized),
        }
    }

    async fn add_block(&self, root: Root, block: &SignedBeaconBlock) -> Result<(), BackendError> {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&root) {
            return Ok(());
        }
        let parent = inner.entry(block.parent_root()).ok_or_else(|| {
            BackendError::Invalid(format!("unknown parent block {}", block.parent_root()))
        })?;
        if block.slot() <= parent.slot {
            return Err(BackendError::Invalid(format!(
                "block slot {} is not after parent slot {}",
                block.slot(),
                parent.slot
            )));
        }

        let entry = ChainEntry {
            slot: block.slot(),
            block_root: root,
            parent_root: parent.block_root,
            state_root: block.state_root(),
            body_root: body_root_of(root),
            proposer_index: block.proposer_index(),
        };
        inner.entries.insert(root, entry);
        if parent.block_root == inner.head {
            inner.head = root;
            inner.canonical.insert(entry.slot, root);
            tracing::debug!(slot = %entry.slot, %root, "new head");
        }
        Ok(())
    }

    async fn sync_status(&self) -> SyncingStatus {
        let inner = self.inner.read().await;
        SyncingStatus {
            head_slot: inner.entry(inner.head).map(|e| e.slot).unwrap_or_default(),
            sync_distance: Slot(0),
            is_syncing: inner.syncing,
        }
    }
}

#[async_trait]
impl BlockStore for MemoryBackend {
    async fn get(&self, root: Root) -> Result<Option<SignedBeaconBlock>, BackendError> {
        Ok(self.inner.read().await.blocks.get(&root).cloned())
    }

    async fn store(&self, block: &SignedBeaconBlock) -> Result<Root, BackendError> {
        let mut inner = self.inner.write().await;
        let root = derive_root(inner.next_seq, block.slot(), BLOCK_TAG);
        inner.next_seq += 1;
        inner.blocks.insert(root, block.clone());
        Ok(root)
    }
}

#[async_trait]
impl Publisher for MemoryBackend {
    async fn publish_block(&self, block: &SignedBeaconBlock) -> Result<bool, BackendError> {
        let block = block.clone();
        self.publish(move |p| p.blocks.push(block)).await
    }

    async fn publish_attestation(&self, att: &Attestation) -> Result<bool, BackendError> {
        let att = att.clone();
        self.publish(move |p| p.attestations.push(att)).await
    }

    async fn publish_voluntary_exit(
        &self,
        exit: &SignedVoluntaryExit,
    ) -> Result<bool, BackendError> {
        let exit = *exit;
        self.publish(move |p| p.voluntary_exits.push(exit)).await
    }

    async fn publish_sync_committee_message(
        &self,
        msg: &SyncCommitteeMessage,
    ) -> Result<bool, BackendError> {
        let msg = *msg;
        self.publish(move |p| p.sync_committee_messages.push(msg)).await
    }
}

#[async_trait]
impl AttestationPool for MemoryBackend {
    async fn search(
        &self,
        slot: Option<Slot>,
        committee_index: Option<CommitteeIndex>,
    ) -> Vec<Attestation> {
        self.inner
            .read()
            .await
            .attestations
            .iter()
            .filter(|a| slot.map_or(true, |s| a.data.slot == s))
            .filter(|a| committee_index.map_or(true, |c| a.data.index == c))
            .cloned()
            .collect()
    }

    async fn add(&self, att: Attestation) -> Result<(), BackendError> {
        self.inner.write().await.attestations.push(att);
        Ok(())
    }
}

#[async_trait]
impl VoluntaryExitPool for MemoryBackend {
    async fn all(&self) -> Vec<SignedVoluntaryExit> {
        self.inner.read().await.voluntary_exits.clone()
    }

    async fn add(&self, exit: SignedVoluntaryExit) -> Result<(), BackendError> {
        let mut inner = self.inner.write().await;
        let index = exit.message.validator_index;
        if inner
            .voluntary_exits
            .iter()
            .any(|e| e.message.validator_index == index)
        {
            return Err(BackendError::Invalid(format!(
                "validator {index} already has a pending exit"
            )));
        }
        inner.voluntary_exits.push(exit);
        Ok(())
    }
}

#[async_trait]
impl SyncCommitteePool for MemoryBackend {
    async fn add(&self, msg: SyncCommitteeMessage) -> Result<(), BackendError> {
        let mut inner = self.inner.write().await;
        if !inner.entries.contains_key(&msg.beacon_block_root) {
            return Err(BackendError::Invalid(format!(
                "unknown beacon block root {}",
                msg.beacon_block_root
            )));
        }
        inner.sync_committee_messages.push(msg);
        Ok(())
    }
}

#[async_trait]
impl BlockProducer for MemoryBackend {
    async fn produce_block(
        &self,
        slot: Slot,
        randao_reveal: BlsSignature,
        graffiti: Root,
    ) -> Result<phase0::BeaconBlock, BackendError> {
        let inner = self.inner.read().await;
        let head = inner
            .entry(inner.head)
            .ok_or_else(|| BackendError::Internal("chain has no head".into()))?;
        if slot <= head.slot {
            return Err(BackendError::Invalid(format!(
                "cannot produce a block at slot {slot}: head is at slot {}",
                head.slot
            )));
        }

        Ok(phase0::BeaconBlock {
            slot,
            proposer_index: ValidatorIndex(slot.0 % VALIDATOR_COUNT),
            parent_root: head.block_root,
            state_root: derive_root(0, slot, STATE_TAG),
            body: phase0::BeaconBlockBody {
                randao_reveal,
                graffiti,
                attestations: inner
                    .attestations
                    .iter()
                    .filter(|a| a.data.slot < slot)
                    .cloned()
                    .collect(),
                voluntary_exits: inner.voluntary_exits.clone(),
            },
        })
    }

    async fn proposer_duties(&self, epoch: Epoch) -> Result<DependentProposerDuty, BackendError> {
        let start = epoch
            .0
            .checked_mul(SLOTS_PER_EPOCH)
            .ok_or_else(|| BackendError::Invalid(format!("epoch {epoch} is out of range")))?;
        let inner = self.inner.read().await;
        let dependent_root = inner
            .canonical
            .range(..Slot(start))
            .next_back()
            .map(|(_, root)| *root)
            .unwrap_or(self.genesis_root);

        let data = (start..start.saturating_add(SLOTS_PER_EPOCH))
            .map(|slot| {
                let index = slot % VALIDATOR_COUNT;
                let mut pubkey = [0u8; 48];
                pubkey[..8].copy_from_slice(&index.to_be_bytes());
                ProposerDuty {
                    pubkey: BlsPubkey(pubkey),
                    validator_index: ValidatorIndex(index),
                    slot: Slot(slot),
                }
            })
            .collect();

        Ok(DependentProposerDuty {
            dependent_root,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_of(parent: Root, slot: u64) -> SignedBeaconBlock {
        let mut block = phase0::SignedBeaconBlock::default();
        block.message.slot = Slot(slot);
        block.message.parent_root = parent;
        block.message.state_root = derive_root(99, Slot(slot), STATE_TAG);
        SignedBeaconBlock::Phase0(block)
    }

    #[tokio::test]
    async fn child_of_head_becomes_head() {
        let mem = MemoryBackend::new(Timestamp(0));
        let root = mem.insert_block(child_of(mem.genesis_root(), 1)).await.unwrap();
        let head = mem.head().await.unwrap();
        assert_eq!(head.block_root, root);
        assert_eq!(mem.by_canonical_slot(Slot(1)).await, Some(head));
        assert_eq!(head.body_root, body_root_of(root));
    }

    #[tokio::test]
    async fn fork_block_is_not_canonical() {
        let mem = MemoryBackend::new(Timestamp(0));
        let genesis = mem.genesis_root();
        let first = mem.insert_block(child_of(genesis, 1)).await.unwrap();
        let fork = mem.insert_block(child_of(genesis, 2)).await.unwrap();
        assert_eq!(mem.head().await.unwrap().block_root, first);
        assert!(mem.by_canonical_slot(Slot(2)).await.is_none());
        assert!(mem.by_block_root(fork).await.is_some());

        let siblings = Chain::search(&mem, Some(genesis), None).await;
        assert_eq!(siblings.len(), 2);
    }

    #[tokio::test]
    async fn unknown_parent_is_rejected() {
        let mem = MemoryBackend::new(Timestamp(0));
        let err = mem.insert_block(child_of(Root([9; 32]), 1)).await.unwrap_err();
        assert!(matches!(err, BackendError::Invalid(_)));
    }

    #[tokio::test]
    async fn search_defaults_to_head_slot() {
        let mem = MemoryBackend::new(Timestamp(0));
        let root = mem.insert_block(child_of(mem.genesis_root(), 3)).await.unwrap();
        let found = Chain::search(&mem, None, None).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].block_root, root);
    }

    #[tokio::test]
    async fn syncing_node_does_not_broadcast() {
        let mem = MemoryBackend::new(Timestamp(0));
        mem.set_syncing(true).await;
        assert!(mem.publish_attestation(&Attestation::default()).await.unwrap());
        assert!(mem.published().await.attestations.is_empty());

        mem.set_syncing(false).await;
        assert!(!mem.publish_attestation(&Attestation::default()).await.unwrap());
        assert_eq!(mem.published().await.attestations.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_exit_is_rejected() {
        let mem = MemoryBackend::new(Timestamp(0));
        VoluntaryExitPool::add(&mem, SignedVoluntaryExit::default()).await.unwrap();
        let err = VoluntaryExitPool::add(&mem, SignedVoluntaryExit::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pending exit"));
    }

    #[tokio::test]
    async fn produced_block_builds_on_head() {
        let mem = MemoryBackend::new(Timestamp(0));
        let block = mem
            .produce_block(Slot(5), BlsSignature::default(), Root::default())
            .await
            .unwrap();
        assert_eq!(block.parent_root, mem.genesis_root());
        assert_eq!(block.proposer_index, ValidatorIndex(5));
        assert!(mem
            .produce_block(Slot(0), BlsSignature::default(), Root::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn duties_cover_one_epoch() {
        let mem = MemoryBackend::new(Timestamp(0));
        let duties = mem.proposer_duties(Epoch(2)).await.unwrap();
        assert_eq!(duties.data.len(), SLOTS_PER_EPOCH as usize);
        assert_eq!(duties.data[0].slot, Slot(64));
        assert_eq!(duties.dependent_root, mem.genesis_root());
        assert!(mem.proposer_duties(Epoch(u64::MAX)).await.is_err());
    }
}
