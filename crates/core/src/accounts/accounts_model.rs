//! Account domain models.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::Zero;

/// A tracked borrower and the balance it owes per asset symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Account {
    pub address: String,
    pub balances: BTreeMap<String, BigUint>,
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            balances: BTreeMap::new(),
        }
    }

    /// Creates an account holding a single asset balance.
    pub fn with_balance(
        address: impl Into<String>,
        symbol: impl Into<String>,
        balance: BigUint,
    ) -> Self {
        let mut account = Self::new(address);
        account.balances.insert(symbol.into(), balance);
        account
    }

    pub fn balance(&self, symbol: &str) -> Option<&BigUint> {
        self.balances.get(symbol)
    }

    /// An account is active while at least one balance is strictly positive.
    pub fn is_active(&self) -> bool {
        self.balances.values().any(|balance| !balance.is_zero())
    }
}

/// Result of folding one absolute balance into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceOutcome {
    /// First positive balance for an unseen address.
    Created,
    /// Positive balance written over an existing entry.
    Updated,
    /// Balance recorded as zero; the account stays active through another asset.
    Zeroed,
    /// Every balance reached zero and the account left the active set.
    /// Carries the removed record as it stood after the write.
    Pruned(Account),
    /// Zero balance reported for an address the ledger does not track.
    Ignored,
}

impl BalanceOutcome {
    /// Whether the account must be written back to storage.
    pub fn is_dirty(&self) -> bool {
        matches!(
            self,
            BalanceOutcome::Created | BalanceOutcome::Updated | BalanceOutcome::Zeroed
        )
    }
}
