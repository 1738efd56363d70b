use serde::{Deserialize, Serialize};

use super::primitives::Slot;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncingStatus {
    /// Head slot the node is trying to reach.
    pub head_slot: Slot,
    /// How many slots the node is behind.
    pub sync_distance: Slot,
    pub is_syncing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeVersionResponse {
    pub version: String,
}
