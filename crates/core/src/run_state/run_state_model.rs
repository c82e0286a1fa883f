//! Run-state domain models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-asset watermarks: asset symbol -> last block durably reflected.
pub type CursorMap = BTreeMap<String, u64>;

/// Resumable state of one bot type across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub id: String,
    pub bot_type: String,
    pub last_wake_at: Option<DateTime<Utc>>,
    pub last_sleep_at: Option<DateTime<Utc>>,
    pub cursors: CursorMap,
}

impl RunState {
    /// Fresh state for a bot type that has never run, woken now.
    pub fn new(bot_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            bot_type: bot_type.into(),
            last_wake_at: Some(Utc::now()),
            last_sleep_at: None,
            cursors: CursorMap::new(),
        }
    }

    pub fn cursor(&self, symbol: &str) -> Option<u64> {
        self.cursors.get(symbol).copied()
    }
}

/// Partial update of a stored run state; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStateUpdate {
    pub last_wake_at: Option<DateTime<Utc>>,
    pub last_sleep_at: Option<DateTime<Utc>>,
    pub cursors: Option<CursorMap>,
}

impl RunStateUpdate {
    pub fn wake(at: DateTime<Utc>) -> Self {
        Self {
            last_wake_at: Some(at),
            ..Self::default()
        }
    }

    pub fn sleep(at: DateTime<Utc>, cursors: CursorMap) -> Self {
        Self {
            last_sleep_at: Some(at),
            cursors: Some(cursors),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_wake_at.is_none() && self.last_sleep_at.is_none() && self.cursors.is_none()
    }

    /// Mirrors the stored update onto an in-memory copy.
    pub fn apply_to(&self, state: &mut RunState) {
        if let Some(at) = self.last_wake_at {
            state.last_wake_at = Some(at);
        }
        if let Some(at) = self.last_sleep_at {
            state.last_sleep_at = Some(at);
        }
        if let Some(cursors) = &self.cursors {
            state.cursors = cursors.clone();
        }
    }
}
