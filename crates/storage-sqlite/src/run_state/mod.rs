//! SQLite storage implementation for run state.

mod model;
mod repository;

pub use model::{RunStateChangesDB, RunStateDB};
pub use repository::RunStateRepository;
