//! Payload types carried by the API.

pub mod beacon;
pub mod blocks;
pub mod node;
pub mod primitives;
pub mod validator;

pub use beacon::{
    Attestation, AttestationData, BeaconBlockHeader, BeaconBlockHeaderAndInfo, Checkpoint,
    FinalityCheckpoints, Fork, GenesisResponse, RootResponse, SignedBeaconBlockHeader,
    SignedVoluntaryExit, SyncAggregate, SyncCommitteeMessage, VoluntaryExit,
};
pub use blocks::{altair, phase0, ForkName, SignedBeaconBlock, VersionedSignedBeaconBlock};
pub use node::{NodeVersionResponse, SyncingStatus};
pub use primitives::{
    BlsPubkey, BlsSignature, CommitteeIndex, Epoch, Gwei, HexError, Root, Slot, Timestamp,
    ValidatorIndex, Version,
};
pub use validator::{DependentProposerDuty, ProposerDuty};
