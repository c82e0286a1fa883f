//! Persistence - flushing ledger changes to the account store.

mod persistence_model;
mod persistence_sink;

pub use persistence_model::{FlushSummary, PrunePolicy};
pub use persistence_sink::PersistenceSink;
