//! Accounts module - domain models, the in-memory ledger, and repository traits.

mod accounts_ledger;
mod accounts_model;
mod accounts_traits;

// Re-export the public interface
pub use accounts_ledger::AccountLedger;
pub use accounts_model::{Account, BalanceOutcome};
pub use accounts_traits::AccountRepositoryTrait;
