use serde::{Deserialize, Serialize};

use super::primitives::{BlsPubkey, Root, Slot, ValidatorIndex};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposerDuty {
    pub pubkey: BlsPubkey,
    pub validator_index: ValidatorIndex,
    pub slot: Slot,
}

/// Duties plus the block root they were computed from. Served as-is, not
/// wrapped in an envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependentProposerDuty {
    pub dependent_root: Root,
    pub data: Vec<ProposerDuty>,
}
