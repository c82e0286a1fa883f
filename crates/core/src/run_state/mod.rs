//! Run state - per bot type cursors and timestamps, and the store that
//! recovers and persists them.

mod cursor_store;
mod run_state_model;
mod run_state_traits;

pub use cursor_store::CursorStore;
pub use run_state_model::{CursorMap, RunState, RunStateUpdate};
pub use run_state_traits::RunStateRepositoryTrait;
