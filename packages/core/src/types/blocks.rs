//! Beacon blocks across forks.
//!
//! [`SignedBeaconBlock`] is the fork-agnostic union used where the wire form
//! does not name the fork. [`VersionedSignedBeaconBlock`] is the v2 shape,
//! `{"version": "...", "data": {...}}`, where the `version` field selects
//! the decoder for `data`.

use serde::{Deserialize, Serialize};

use super::beacon::{
    Attestation, BeaconBlockHeader, SignedBeaconBlockHeader, SignedVoluntaryExit, SyncAggregate,
};
use super::primitives::{BlsSignature, Root, Slot, ValidatorIndex};

pub mod phase0 {
    use super::*;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
    pub struct BeaconBlockBody {
        pub randao_reveal: BlsSignature,
        pub graffiti: Root,
        pub attestations: Vec<Attestation>,
        pub voluntary_exits: Vec<SignedVoluntaryExit>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
    pub struct BeaconBlock {
        pub slot: Slot,
        pub proposer_index: ValidatorIndex,
        pub parent_root: Root,
        pub state_root: Root,
        pub body: BeaconBlockBody,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
    pub struct SignedBeaconBlock {
        pub message: BeaconBlock,
        pub signature: BlsSignature,
    }
}

pub mod altair {
    use super::*;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
    pub struct BeaconBlockBody {
        pub randao_reveal: BlsSignature,
        pub graffiti: Root,
        pub attestations: Vec<Attestation>,
        pub voluntary_exits: Vec<SignedVoluntaryExit>,
        pub sync_aggregate: SyncAggregate,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
    pub struct BeaconBlock {
        pub slot: Slot,
        pub proposer_index: ValidatorIndex,
        pub parent_root: Root,
        pub state_root: Root,
        pub body: BeaconBlockBody,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
    pub struct SignedBeaconBlock {
        pub message: BeaconBlock,
        pub signature: BlsSignature,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ForkName {
    Phase0,
    Altair,
}

impl ForkName {
    /// The lowercase name, as used in `version` fields and the
    /// `Eth-Consensus-Version` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            ForkName::Phase0 => "phase0",
            ForkName::Altair => "altair",
        }
    }
}

impl std::fmt::Display for ForkName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed block of any supported fork.
///
/// Altair is tried first: a phase0 body lacks `sync_aggregate`, so it can
/// never be mistaken for one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SignedBeaconBlock {
    Altair(altair::SignedBeaconBlock),
    Phase0(phase0::SignedBeaconBlock),
}

impl SignedBeaconBlock {
    pub fn fork(&self) -> ForkName {
        match self {
            SignedBeaconBlock::Altair(_) => ForkName::Altair,
            SignedBeaconBlock::Phase0(_) => ForkName::Phase0,
        }
    }

    pub fn slot(&self) -> Slot {
        match self {
            SignedBeaconBlock::Altair(b) => b.message.slot,
            SignedBeaconBlock::Phase0(b) => b.message.slot,
        }
    }

    pub fn proposer_index(&self) -> ValidatorIndex {
        match self {
            SignedBeaconBlock::Altair(b) => b.message.proposer_index,
            SignedBeaconBlock::Phase0(b) => b.message.proposer_index,
        }
    }

    pub fn parent_root(&self) -> Root {
        match self {
            SignedBeaconBlock::Altair(b) => b.message.parent_root,
            SignedBeaconBlock::Phase0(b) => b.message.parent_root,
        }
    }

    pub fn state_root(&self) -> Root {
        match self {
            SignedBeaconBlock::Altair(b) => b.message.state_root,
            SignedBeaconBlock::Phase0(b) => b.message.state_root,
        }
    }

    pub fn signature(&self) -> BlsSignature {
        match self {
            SignedBeaconBlock::Altair(b) => b.signature,
            SignedBeaconBlock::Phase0(b) => b.signature,
        }
    }

    pub fn attestations(&self) -> &[Attestation] {
        match self {
            SignedBeaconBlock::Altair(b) => &b.message.body.attestations,
            SignedBeaconBlock::Phase0(b) => &b.message.body.attestations,
        }
    }

    /// The signed header of this block, given its body root.
    pub fn signed_header(&self, body_root: Root) -> SignedBeaconBlockHeader {
        SignedBeaconBlockHeader {
            message: BeaconBlockHeader {
                slot: self.slot(),
                proposer_index: self.proposer_index(),
                parent_root: self.parent_root(),
                state_root: self.state_root(),
                body_root,
            },
            signature: self.signature(),
        }
    }
}

impl From<phase0::SignedBeaconBlock> for SignedBeaconBlock {
    fn from(block: phase0::SignedBeaconBlock) -> Self {
        SignedBeaconBlock::Phase0(block)
    }
}

impl From<altair::SignedBeaconBlock> for SignedBeaconBlock {
    fn from(block: altair::SignedBeaconBlock) -> Self {
        SignedBeaconBlock::Altair(block)
    }
}

/// A signed block tagged with its fork name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "version", content = "data", rename_all = "lowercase")]
pub enum VersionedSignedBeaconBlock {
    Phase0(phase0::SignedBeaconBlock),
    Altair(altair::SignedBeaconBlock),
}

impl VersionedSignedBeaconBlock {
    pub fn version(&self) -> ForkName {
        match self {
            VersionedSignedBeaconBlock::Phase0(_) => ForkName::Phase0,
            VersionedSignedBeaconBlock::Altair(_) => ForkName::Altair,
        }
    }

    pub fn into_block(self) -> SignedBeaconBlock {
        match self {
            VersionedSignedBeaconBlock::Phase0(b) => SignedBeaconBlock::Phase0(b),
            VersionedSignedBeaconBlock::Altair(b) => SignedBeaconBlock::Altair(b),
        }
    }
}

impl From<SignedBeaconBlock> for VersionedSignedBeaconBlock {
    fn from(block: SignedBeaconBlock) -> Self {
        match block {
            SignedBeaconBlock::Phase0(b) => VersionedSignedBeaconBlock::Phase0(b),
            SignedBeaconBlock::Altair(b) => VersionedSignedBeaconBlock::Altair(b),
        }
    }
}
