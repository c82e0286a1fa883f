//! Borrow event models and range policies.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// An absolute borrow balance reported by the ledger at a block.
///
/// `balance` is the borrower's full outstanding balance after the event, not
/// a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowEvent {
    pub borrower: String,
    pub balance: BigUint,
    pub block_number: u64,
}

impl BorrowEvent {
    pub fn new(borrower: impl Into<String>, balance: BigUint, block_number: u64) -> Self {
        Self {
            borrower: borrower.into(),
            balance,
            block_number,
        }
    }
}

/// Whether a resumed scan re-reads the block its cursor points at.
///
/// The cursor is the block of the last consumed event. `Inclusive` starts the
/// next scan at that block and re-applies its events (harmless, since writes
/// are idempotent); `Exclusive` starts one block later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    #[default]
    Inclusive,
    Exclusive,
}

impl BoundaryPolicy {
    /// First block to request for an asset.
    ///
    /// With no cursor yet the scan starts at the asset's configured start
    /// block.
    pub fn start_block(&self, cursor: Option<u64>, start_block: u64) -> u64 {
        match (cursor, self) {
            (None, _) => start_block,
            (Some(cursor), BoundaryPolicy::Inclusive) => cursor,
            (Some(cursor), BoundaryPolicy::Exclusive) => cursor.saturating_add(1),
        }
    }
}

impl FromStr for BoundaryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inclusive" => Ok(BoundaryPolicy::Inclusive),
            "exclusive" => Ok(BoundaryPolicy::Exclusive),
            other => Err(Error::InvalidConfigValue(format!(
                "unknown boundary policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPolicy::Inclusive => write!(f, "inclusive"),
            BoundaryPolicy::Exclusive => write!(f, "exclusive"),
        }
    }
}
