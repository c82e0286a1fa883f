use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};

use super::run_state_model::{CursorMap, RunState, RunStateUpdate};
use super::run_state_traits::RunStateRepositoryTrait;
use crate::errors::Result;
use crate::retry::RetryPolicy;

/// Recovers and persists a bot type's run state under the retry policy.
pub struct CursorStore {
    repository: Arc<dyn RunStateRepositoryTrait>,
    retry: RetryPolicy,
}

impl CursorStore {
    pub fn new(repository: Arc<dyn RunStateRepositoryTrait>, retry: RetryPolicy) -> Self {
        Self { repository, retry }
    }

    /// Loads the run state for `bot_type`, creating it on first run.
    ///
    /// An existing state gets its wake timestamp refreshed.
    pub async fn load_or_create(&self, bot_type: &str) -> Result<RunState> {
        let repository = &self.repository;

        let existing = self
            .retry
            .run("find run state", || async move {
                repository.find_by_bot_type(bot_type)
            })
            .await?;

        match existing {
            None => {
                let state = RunState::new(bot_type);
                info!("No run state for '{}', creating {}", bot_type, state.id);
                self.retry
                    .run("insert run state", || repository.insert(state.clone()))
                    .await
            }
            Some(mut state) => {
                let update = RunStateUpdate::wake(Utc::now());
                self.retry
                    .run("refresh wake timestamp", || {
                        repository.update(&state.id, update.clone())
                    })
                    .await?;
                update.apply_to(&mut state);
                debug!(
                    "Resumed run state {} with {} cursors",
                    state.id,
                    state.cursors.len()
                );
                Ok(state)
            }
        }
    }

    /// Writes the sleep timestamp and final cursors in a single update.
    pub async fn persist_final(&self, state: &mut RunState, cursors: CursorMap) -> Result<()> {
        let repository = &self.repository;
        let update = RunStateUpdate::sleep(Utc::now(), cursors);
        let id = state.id.clone();

        self.retry
            .run("persist final cursors", || {
                repository.update(&id, update.clone())
            })
            .await?;

        update.apply_to(state);
        info!("Persisted {} cursors for run state {}", state.cursors.len(), state.id);
        Ok(())
    }
}
