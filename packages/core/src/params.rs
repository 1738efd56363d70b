//! Path identifiers for blocks, states, and validators.
//!
//! Each identifier has one canonical text form (its [`Display`]). Parsing
//! tries a `0x` root first, then the named keywords, then a decimal slot or
//! index.
//!
//! [`Display`]: std::fmt::Display

use std::fmt;
use std::str::FromStr;

use crate::types::{BlsPubkey, Root, Slot, ValidatorIndex};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("invalid {kind} {input:?}: {reason}")]
    InvalidHex {
        kind: &'static str,
        input: String,
        reason: String,
    },

    #[error("unrecognized {kind} {input:?}")]
    Unrecognized { kind: &'static str, input: String },
}

fn parse_root(kind: &'static str, input: &str) -> Result<Root, ParamError> {
    input.parse().map_err(|e: crate::types::HexError| ParamError::InvalidHex {
        kind,
        input: input.to_string(),
        reason: e.to_string(),
    })
}

fn parse_u64(kind: &'static str, input: &str) -> Result<u64, ParamError> {
    input.parse().map_err(|_| ParamError::Unrecognized {
        kind,
        input: input.to_string(),
    })
}

// ---------------------------------------------------------------------------
// BlockId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockId {
    Root(Root),
    Slot(Slot),
    Head,
    Genesis,
    Finalized,
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Root(root) => fmt::Display::fmt(root, f),
            BlockId::Slot(slot) => fmt::Display::fmt(slot, f),
            BlockId::Head => f.write_str("head"),
            BlockId::Genesis => f.write_str("genesis"),
            BlockId::Finalized => f.write_str("finalized"),
        }
    }
}

impl FromStr for BlockId {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "block id";
        if s.starts_with("0x") {
            return parse_root(KIND, s).map(BlockId::Root);
        }
        match s {
            "head" => Ok(BlockId::Head),
            "genesis" => Ok(BlockId::Genesis),
            "finalized" => Ok(BlockId::Finalized),
            _ => parse_u64(KIND, s).map(|v| BlockId::Slot(Slot(v))),
        }
    }
}

// ---------------------------------------------------------------------------
// StateId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    Root(Root),
    Slot(Slot),
    Head,
    Genesis,
    Finalized,
    Justified,
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateId::Root(root) => fmt::Display::fmt(root, f),
            StateId::Slot(slot) => fmt::Display::fmt(slot, f),
            StateId::Head => f.write_str("head"),
            StateId::Genesis => f.write_str("genesis"),
            StateId::Finalized => f.write_str("finalized"),
            StateId::Justified => f.write_str("justified"),
        }
    }
}

impl FromStr for StateId {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "state id";
        if s.starts_with("0x") {
            return parse_root(KIND, s).map(StateId::Root);
        }
        match s {
            "head" => Ok(StateId::Head),
            "genesis" => Ok(StateId::Genesis),
            "finalized" => Ok(StateId::Finalized),
            "justified" => Ok(StateId::Justified),
            _ => parse_u64(KIND, s).map(|v| StateId::Slot(Slot(v))),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidatorId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorId {
    Pubkey(BlsPubkey),
    Index(ValidatorIndex),
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorId::Pubkey(key) => fmt::Display::fmt(key, f),
            ValidatorId::Index(index) => fmt::Display::fmt(index, f),
        }
    }
}

impl FromStr for ValidatorId {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "validator id";
        if s.starts_with("0x") {
            return s
                .parse()
                .map(ValidatorId::Pubkey)
                .map_err(|e: crate::types::HexError| ParamError::InvalidHex {
                    kind: KIND,
                    input: s.to_string(),
                    reason: e.to_string(),
                });
        }
        parse_u64(KIND, s).map(|v| ValidatorId::Index(ValidatorIndex(v)))
    }
}
