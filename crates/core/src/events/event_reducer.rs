//! Folds an asset's event stream into the account ledger.

use std::collections::{BTreeMap, BTreeSet};

use futures::StreamExt;
use log::{debug, warn};

use super::events_model::BorrowEvent;
use super::events_traits::EventStream;
use crate::accounts::{Account, AccountLedger, BalanceOutcome};
use crate::errors::Result;

/// What one asset's reduction changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Addresses that must be written back to storage.
    pub dirty: BTreeSet<String>,
    /// Accounts that left the active set, as they stood when removed.
    pub pruned: BTreeMap<String, Account>,
    /// Block of the last event consumed, if any event was consumed.
    pub watermark: Option<u64>,
    pub events_applied: usize,
}

/// Applies one asset's events to the ledger, in arrival order.
pub struct EventReducer<'a> {
    ledger: &'a mut AccountLedger,
    symbol: &'a str,
    reduction: Reduction,
}

impl<'a> EventReducer<'a> {
    pub fn new(ledger: &'a mut AccountLedger, symbol: &'a str) -> Self {
        Self {
            ledger,
            symbol,
            reduction: Reduction::default(),
        }
    }

    /// Applies a single event.
    pub fn apply(&mut self, event: BorrowEvent) {
        if let Some(previous) = self.reduction.watermark {
            if event.block_number < previous {
                warn!(
                    "{}: event at block {} arrived after block {}",
                    self.symbol, event.block_number, previous
                );
            }
        }

        let outcome = self
            .ledger
            .apply_balance(&event.borrower, self.symbol, event.balance);
        match outcome {
            BalanceOutcome::Created | BalanceOutcome::Updated | BalanceOutcome::Zeroed => {
                self.reduction.pruned.remove(&event.borrower);
                self.reduction.dirty.insert(event.borrower);
            }
            BalanceOutcome::Pruned(account) => {
                self.reduction.dirty.remove(&event.borrower);
                self.reduction.pruned.insert(event.borrower, account);
            }
            BalanceOutcome::Ignored => {}
        }

        // Last consumed, not highest seen.
        self.reduction.watermark = Some(event.block_number);
        self.reduction.events_applied += 1;
    }

    /// Block of the last event applied so far.
    pub fn watermark(&self) -> Option<u64> {
        self.reduction.watermark
    }

    pub fn finish(self) -> Reduction {
        self.reduction
    }

    /// Applies events until `events` ends or yields an error.
    ///
    /// Events applied before the error stay applied, so a caller can resume
    /// the reduction with a fresh stream.
    pub async fn drain(&mut self, mut events: EventStream) -> Result<()> {
        while let Some(event) = events.next().await {
            self.apply(event?);
        }
        Ok(())
    }

    /// Drains `events`, applying each one exactly once.
    pub async fn reduce(mut self, events: EventStream) -> Result<Reduction> {
        self.drain(events).await?;
        debug!(
            "{}: applied {} events ({} dirty, {} pruned, watermark {:?})",
            self.symbol,
            self.reduction.events_applied,
            self.reduction.dirty.len(),
            self.reduction.pruned.len(),
            self.reduction.watermark
        );
        Ok(self.finish())
    }
}
