//! Run-state repository traits.

use async_trait::async_trait;

use super::run_state_model::{RunState, RunStateUpdate};
use crate::errors::Result;

/// Trait for run-state repository operations.
#[async_trait]
pub trait RunStateRepositoryTrait: Send + Sync {
    /// Finds the run state recorded for a bot type.
    fn find_by_bot_type(&self, bot_type: &str) -> Result<Option<RunState>>;

    /// Inserts a new run state.
    async fn insert(&self, state: RunState) -> Result<RunState>;

    /// Writes the set fields of `changes` to the run state with `id`.
    async fn update(&self, id: &str, changes: RunStateUpdate) -> Result<()>;
}
