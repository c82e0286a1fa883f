//! Account repository traits.
//!
//! These traits define the contract for account persistence without any
//! database-specific types, allowing for different storage implementations.

use async_trait::async_trait;

use super::accounts_model::Account;
use crate::errors::Result;

/// Trait defining the contract for Account repository operations.
///
/// Writes are keyed by address and replace the full record, so repeating a
/// write with the same value has no further observable effect.
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    /// Loads every persisted account, including inactive records.
    fn list_all(&self) -> Result<Vec<Account>>;

    /// Creates or replaces the account stored under `account.address`.
    async fn upsert(&self, account: Account) -> Result<Account>;

    /// Deletes an account by address.
    ///
    /// Returns the number of deleted records.
    async fn delete(&self, address: &str) -> Result<usize>;
}
