//! Lifecycle states, phases, and the integer status reported per phase.

use std::collections::BTreeSet;
use std::fmt;

use crate::errors::Result;
use crate::persistence::FlushSummary;

/// Status reported by a phase that completed.
pub const STATUS_OK: i32 = 0;
/// Status reported by a phase that failed.
pub const STATUS_FAILED: i32 = 1;

pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(_) => STATUS_FAILED,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Awake,
    Working,
    Asleep,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Awake => "awake",
            LifecycleState::Working => "working",
            LifecycleState::Asleep => "asleep",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Wake,
    Work,
    Sleep,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Wake, Phase::Work, Phase::Sleep];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Wake => "wake",
            Phase::Work => "work",
            Phase::Sleep => "sleep",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one asset within a Work phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReport {
    pub symbol: String,
    pub from_block: u64,
    pub cursor_before: Option<u64>,
    pub cursor_after: Option<u64>,
    pub events_applied: usize,
    pub flush: FlushSummary,
}

/// Outcome of a Work phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkReport {
    pub assets: Vec<AssetReport>,
    /// Addresses written during the phase, across all assets.
    pub dirty_accounts: BTreeSet<String>,
}

impl WorkReport {
    pub fn events_applied(&self) -> usize {
        self.assets.iter().map(|a| a.events_applied).sum()
    }

    pub fn asset(&self, symbol: &str) -> Option<&AssetReport> {
        self.assets.iter().find(|a| a.symbol == symbol)
    }
}
