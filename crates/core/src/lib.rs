//! Borrowscan Core - the ledger reconciliation engine.
//!
//! This crate folds per-asset borrow events into an in-memory ledger of
//! active accounts and drives the Wake -> Work -> Sleep lifecycle. It is
//! storage-agnostic and defines the traits implemented by the
//! `storage-sqlite` and `event-source` crates.

pub mod accounts;
pub mod engine;
pub mod errors;
pub mod events;
pub mod persistence;
pub mod retry;
pub mod run_state;

#[cfg(test)]
mod test_utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
