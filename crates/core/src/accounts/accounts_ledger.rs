//! In-memory ledger of active accounts.

use std::collections::HashMap;

use log::debug;
use num_bigint::BigUint;
use num_traits::Zero;

use super::accounts_model::{Account, BalanceOutcome};

/// Authoritative map of active accounts, keyed by address.
///
/// Only accounts with at least one strictly positive balance are kept.
#[derive(Debug, Default, Clone)]
pub struct AccountLedger {
    accounts: HashMap<String, Account>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the ledger contents with a persisted snapshot.
    ///
    /// Inactive records (tombstones) are skipped. Returns the number of
    /// accounts loaded.
    pub fn load(&mut self, accounts: impl IntoIterator<Item = Account>) -> usize {
        self.accounts.clear();
        let mut skipped = 0usize;
        for account in accounts {
            if account.is_active() {
                self.accounts.insert(account.address.clone(), account);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!("Skipped {} inactive accounts while loading ledger", skipped);
        }
        self.accounts.len()
    }

    /// Folds an absolute balance for one asset into the ledger.
    pub fn apply_balance(&mut self, address: &str, symbol: &str, balance: BigUint) -> BalanceOutcome {
        if !balance.is_zero() {
            return match self.accounts.get_mut(address) {
                Some(account) => {
                    account.balances.insert(symbol.to_string(), balance);
                    BalanceOutcome::Updated
                }
                None => {
                    self.accounts.insert(
                        address.to_string(),
                        Account::with_balance(address, symbol, balance),
                    );
                    BalanceOutcome::Created
                }
            };
        }

        let Some(account) = self.accounts.get_mut(address) else {
            return BalanceOutcome::Ignored;
        };
        account.balances.insert(symbol.to_string(), balance);
        if account.is_active() {
            return BalanceOutcome::Zeroed;
        }

        match self.accounts.remove(address) {
            Some(removed) => BalanceOutcome::Pruned(removed),
            None => BalanceOutcome::Ignored,
        }
    }

    pub fn get(&self, address: &str) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}
