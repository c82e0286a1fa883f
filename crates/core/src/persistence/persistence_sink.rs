use std::sync::Arc;

use log::{debug, warn};

use super::persistence_model::{FlushSummary, PrunePolicy};
use crate::accounts::{Account, AccountLedger, AccountRepositoryTrait};
use crate::errors::Result;
use crate::events::Reduction;
use crate::retry::RetryPolicy;

/// Writes ledger changes to the account store.
///
/// Every write is a full-record replace keyed by address, so replaying a
/// flush after a crash converges to the same stored state.
pub struct PersistenceSink {
    repository: Arc<dyn AccountRepositoryTrait>,
    retry: RetryPolicy,
    prune_policy: PrunePolicy,
}

impl PersistenceSink {
    pub fn new(
        repository: Arc<dyn AccountRepositoryTrait>,
        retry: RetryPolicy,
        prune_policy: PrunePolicy,
    ) -> Self {
        Self {
            repository,
            retry,
            prune_policy,
        }
    }

    /// Loads every persisted account.
    pub async fn load_snapshot(&self) -> Result<Vec<Account>> {
        let repository = &self.repository;
        self.retry
            .run("load accounts", || async move { repository.list_all() })
            .await
    }

    /// Creates or replaces one account.
    pub async fn upsert(&self, account: &Account) -> Result<()> {
        let repository = &self.repository;
        let operation = format!("upsert account {}", account.address);
        self.retry
            .run(&operation, || repository.upsert(account.clone()))
            .await?;
        Ok(())
    }

    /// Applies the prune policy to an account that left the active set.
    ///
    /// Returns whether a write was issued.
    pub async fn retire(&self, account: &Account) -> Result<bool> {
        let repository = &self.repository;
        match self.prune_policy {
            PrunePolicy::Retain => Ok(false),
            PrunePolicy::Tombstone => {
                self.upsert(account).await?;
                Ok(true)
            }
            PrunePolicy::Delete => {
                let address = account.address.as_str();
                let operation = format!("delete account {}", address);
                let deleted = self
                    .retry
                    .run(&operation, || repository.delete(address))
                    .await?;
                if deleted == 0 {
                    debug!("Account {} was not persisted, nothing to delete", address);
                }
                Ok(true)
            }
        }
    }

    /// Writes one asset's reduction: dirty accounts first, then pruned ones.
    pub async fn flush(&self, ledger: &AccountLedger, reduction: &Reduction) -> Result<FlushSummary> {
        let mut summary = FlushSummary::default();

        for address in &reduction.dirty {
            match ledger.get(address) {
                Some(account) => {
                    self.upsert(account).await?;
                    summary.upserted += 1;
                }
                None => warn!("Dirty account {} is no longer in the ledger", address),
            }
        }

        for account in reduction.pruned.values() {
            if self.retire(account).await? {
                match self.prune_policy {
                    PrunePolicy::Tombstone => summary.tombstoned += 1,
                    PrunePolicy::Delete => summary.deleted += 1,
                    PrunePolicy::Retain => {}
                }
            }
        }

        Ok(summary)
    }
}
