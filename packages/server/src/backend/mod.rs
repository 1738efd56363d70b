//! Domain collaborators behind the route handlers.
//!
//! Handlers only talk to these traits. [`BeaconBackend`] bundles one of each
//! and owns the identifier lookups shared by several endpoints.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryBackend`] | Tests, conformance suite, the demo binary |
//!
//! [`MemoryBackend`]: memory::MemoryBackend

pub mod memory;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use eth2api::types::{
    phase0, Attestation, BlsSignature, CommitteeIndex, DependentProposerDuty, Epoch,
    FinalityCheckpoints, GenesisResponse, Root, SignedBeaconBlock, SignedVoluntaryExit, Slot,
    SyncCommitteeMessage, SyncingStatus, ValidatorIndex,
};
use eth2api::{BlockId, IndexedErrorItem, StateId};

pub use crate::error::BackendError;

// ---------------------------------------------------------------------------
// ChainEntry
// ---------------------------------------------------------------------------

/// What the chain knows about one block and its post-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainEntry {
    pub slot: Slot,
    pub block_root: Root,
    pub parent_root: Root,
    pub state_root: Root,
    pub body_root: Root,
    pub proposer_index: ValidatorIndex,
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Chain: Send + Sync + 'static {
    async fn genesis(&self) -> GenesisResponse;

    async fn head(&self) -> Option<ChainEntry>;

    async fn finalized(&self) -> Option<ChainEntry>;

    async fn justified(&self) -> Option<ChainEntry>;

    async fn by_block_root(&self, root: Root) -> Option<ChainEntry>;

    async fn by_state_root(&self, root: Root) -> Option<ChainEntry>;

    /// The canonical block at `slot`. Empty slots return `None`.
    async fn by_canonical_slot(&self, slot: Slot) -> Option<ChainEntry>;

    /// Entries matching the filters. With neither filter set, the entries at
    /// the head slot.
    async fn search(&self, parent_root: Option<Root>, slot: Option<Slot>) -> Vec<ChainEntry>;

    async fn finality_checkpoints(&self, entry: &ChainEntry) -> FinalityCheckpoints;

    /// Import a block whose root is already known.
    async fn add_block(&self, root: Root, block: &SignedBeaconBlock) -> Result<(), BackendError>;

    async fn sync_status(&self) -> SyncingStatus;
}

#[async_trait]
pub trait BlockStore: Send + Sync + 'static {
    async fn get(&self, root: Root) -> Result<Option<SignedBeaconBlock>, BackendError>;

    /// Persist a block and return its root.
    async fn store(&self, block: &SignedBeaconBlock) -> Result<Root, BackendError>;
}

/// Gossip broadcast. Every method returns whether the node is syncing, in
/// which case the item was not sent.
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish_block(&self, block: &SignedBeaconBlock) -> Result<bool, BackendError>;

    async fn publish_attestation(&self, att: &Attestation) -> Result<bool, BackendError>;

    async fn publish_voluntary_exit(&self, exit: &SignedVoluntaryExit)
        -> Result<bool, BackendError>;

    async fn publish_sync_committee_message(
        &self,
        msg: &SyncCommitteeMessage,
    ) -> Result<bool, BackendError>;
}

#[async_trait]
pub trait AttestationPool: Send + Sync + 'static {
    async fn search(
        &self,
        slot: Option<Slot>,
        committee_index: Option<CommitteeIndex>,
    ) -> Vec<Attestation>;

    async fn add(&self, att: Attestation) -> Result<(), BackendError>;
}

#[async_trait]
pub trait VoluntaryExitPool: Send + Sync + 'static {
    async fn all(&self) -> Vec<SignedVoluntaryExit>;

    async fn add(&self, exit: SignedVoluntaryExit) -> Result<(), BackendError>;
}

#[async_trait]
pub trait SyncCommitteePool: Send + Sync + 'static {
    async fn add(&self, msg: SyncCommitteeMessage) -> Result<(), BackendError>;
}

#[async_trait]
pub trait BlockProducer: Send + Sync + 'static {
    async fn produce_block(
        &self,
        slot: Slot,
        randao_reveal: BlsSignature,
        graffiti: Root,
    ) -> Result<phase0::BeaconBlock, BackendError>;

    async fn proposer_duties(&self, epoch: Epoch) -> Result<DependentProposerDuty, BackendError>;
}

// ---------------------------------------------------------------------------
// BeaconBackend
// ---------------------------------------------------------------------------

/// Every collaborator the handlers need.
#[derive(Clone)]
pub struct BeaconBackend {
    pub chain: Arc<dyn Chain>,
    pub blocks: Arc<dyn BlockStore>,
    pub publisher: Arc<dyn Publisher>,
    pub attestation_pool: Arc<dyn AttestationPool>,
    pub voluntary_exit_pool: Arc<dyn VoluntaryExitPool>,
    pub sync_committee_pool: Arc<dyn SyncCommitteePool>,
    pub producer: Arc<dyn BlockProducer>,
}

impl BeaconBackend {
    /// Use one in-memory backend for every role.
    pub fn from_memory(mem: Arc<memory::MemoryBackend>) -> Self {
        Self {
            chain: mem.clone(),
            blocks: mem.clone(),
            publisher: mem.clone(),
            attestation_pool: mem.clone(),
            voluntary_exit_pool: mem.clone(),
            sync_committee_pool: mem.clone(),
            producer: mem,
        }
    }

    pub async fn block_lookup(&self, id: BlockId) -> Option<ChainEntry> {
        match id {
            BlockId::Root(root) => self.chain.by_block_root(root).await,
            BlockId::Slot(slot) => self.chain.by_canonical_slot(slot).await,
            BlockId::Head => self.chain.head().await,
            BlockId::Genesis => self.chain.by_canonical_slot(Slot(0)).await,
            BlockId::Finalized => self.chain.finalized().await,
        }
    }

    pub async fn state_lookup(&self, id: StateId) -> Option<ChainEntry> {
        match id {
            StateId::Root(root) => self.chain.by_state_root(root).await,
            StateId::Slot(slot) => self.chain.by_canonical_slot(slot).await,
            StateId::Head => self.chain.head().await,
            StateId::Genesis => self.chain.by_canonical_slot(Slot(0)).await,
            StateId::Finalized => self.chain.finalized().await,
            StateId::Justified => self.chain.justified().await,
        }
    }
}

/// Result of running a batch through [`accept_indexed`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub failures: Vec<IndexedErrorItem>,
    /// At least one accepted item was not broadcast because the node is syncing.
    pub syncing: bool,
}

/// Run `accept` on every item, recording each failure under the item's
/// position in `items`. A failure does not stop the batch.
pub async fn accept_indexed<'a, T, F, Fut>(items: &'a [T], mut accept: F) -> BatchOutcome
where
    F: FnMut(&'a T) -> Fut,
    Fut: Future<Output = Result<bool, BackendError>>,
{
    let mut outcome = BatchOutcome::default();
    for (index, item) in items.iter().enumerate() {
        match accept(item).await {
            Ok(syncing) => outcome.syncing |= syncing,
            Err(err) => outcome.failures.push(IndexedErrorItem {
                index,
                message: err.to_string(),
            }),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_keep_their_position() {
        let items = [1u64, 2, 3, 4];
        let outcome = accept_indexed(&items, |n| async move {
            match *n {
                2 | 4 => Err(BackendError::Invalid(format!("rejected {n}"))),
                3 => Ok(true),
                _ => Ok(false),
            }
        })
        .await;
        let indices: Vec<usize> = outcome.failures.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(outcome.failures[0].message, "rejected 2");
        assert!(outcome.syncing);
    }

    #[tokio::test]
    async fn empty_batch_is_clean() {
        let outcome = accept_indexed(&[] as &[u8], |_| async { Ok(false) }).await;
        assert_eq!(outcome, BatchOutcome::default());
    }

    #[tokio::test]
    async fn lookups_resolve_keywords() {
        let mem = Arc::new(memory::MemoryBackend::new(Default::default()));
        let backend = BeaconBackend::from_memory(mem.clone());
        let genesis = backend.block_lookup(BlockId::Genesis).await.unwrap();
        assert_eq!(genesis.slot, Slot(0));
        assert_eq!(backend.block_lookup(BlockId::Head).await, Some(genesis));
        assert_eq!(
            backend.state_lookup(StateId::Root(genesis.state_root)).await,
            Some(genesis)
        );
        assert_eq!(backend.state_lookup(StateId::Justified).await, Some(genesis));
        assert!(backend.block_lookup(BlockId::Slot(Slot(99))).await.is_none());
    }
}
