//! In-memory collaborators for engine tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use num_bigint::BigUint;

use crate::accounts::{Account, AccountRepositoryTrait};
use crate::errors::{DatabaseError, Error, EventSourceError, Result};
use crate::events::{BorrowEvent, EventSource, EventStream};
use crate::retry::RetryPolicy;
use crate::run_state::{RunState, RunStateRepositoryTrait, RunStateUpdate};

pub fn units(value: u64) -> BigUint {
    BigUint::from(value)
}

pub fn event(borrower: &str, balance: u64, block: u64) -> BorrowEvent {
    BorrowEvent::new(borrower, units(balance), block)
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        multiplier: 2.0,
        max_delay: Duration::from_millis(2),
    }
}

fn busy() -> Error {
    Error::Database(DatabaseError::Busy("database is locked".to_string()))
}

/// Takes one unit from a failure budget, returning whether to fail.
fn take_failure(budget: &Mutex<u32>) -> bool {
    let mut remaining = budget.lock().unwrap();
    if *remaining > 0 {
        *remaining -= 1;
        true
    } else {
        false
    }
}

// =========================================================================
// Run state
// =========================================================================

#[derive(Clone, Default)]
pub struct MockRunStateRepository {
    pub states: Arc<Mutex<Vec<RunState>>>,
    pub updates: Arc<Mutex<Vec<(String, RunStateUpdate)>>>,
    pub failing_writes: Arc<Mutex<u32>>,
}

impl MockRunStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: RunState) -> Self {
        let repo = Self::default();
        repo.states.lock().unwrap().push(state);
        repo
    }

    /// The next `count` writes fail with a transient error.
    pub fn fail_writes(&self, count: u32) {
        *self.failing_writes.lock().unwrap() = count;
    }

    pub fn stored(&self, bot_type: &str) -> Option<RunState> {
        self.states
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.bot_type == bot_type)
            .cloned()
    }
}

#[async_trait]
impl RunStateRepositoryTrait for MockRunStateRepository {
    fn find_by_bot_type(&self, bot_type: &str) -> Result<Option<RunState>> {
        Ok(self.stored(bot_type))
    }

    async fn insert(&self, state: RunState) -> Result<RunState> {
        if take_failure(&self.failing_writes) {
            return Err(busy());
        }
        self.states.lock().unwrap().push(state.clone());
        Ok(state)
    }

    async fn update(&self, id: &str, changes: RunStateUpdate) -> Result<()> {
        if take_failure(&self.failing_writes) {
            return Err(busy());
        }
        let mut states = self.states.lock().unwrap();
        let state = states
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::Database(DatabaseError::NotFound(id.to_string())))?;
        changes.apply_to(state);
        self.updates.lock().unwrap().push((id.to_string(), changes));
        Ok(())
    }
}

// =========================================================================
// Accounts
// =========================================================================

#[derive(Clone, Default)]
pub struct MockAccountRepository {
    pub accounts: Arc<Mutex<BTreeMap<String, Account>>>,
    pub upserts: Arc<Mutex<Vec<String>>>,
    pub deletes: Arc<Mutex<Vec<String>>>,
    pub failing_writes: Arc<Mutex<u32>>,
    pub corrupt: Arc<Mutex<bool>>,
}

impl MockAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        let repo = Self::default();
        {
            let mut stored = repo.accounts.lock().unwrap();
            for account in accounts {
                stored.insert(account.address.clone(), account);
            }
        }
        repo
    }

    pub fn fail_writes(&self, count: u32) {
        *self.failing_writes.lock().unwrap() = count;
    }

    /// Makes `list_all` report an undecodable record.
    pub fn corrupt(&self) {
        *self.corrupt.lock().unwrap() = true;
    }

    pub fn stored(&self, address: &str) -> Option<Account> {
        self.accounts.lock().unwrap().get(address).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Account> {
        self.accounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountRepositoryTrait for MockAccountRepository {
    fn list_all(&self) -> Result<Vec<Account>> {
        if *self.corrupt.lock().unwrap() {
            return Err(Error::DataIntegrity(
                "account 0xbad: balance 'abc' is not a number".to_string(),
            ));
        }
        Ok(self.accounts.lock().unwrap().values().cloned().collect())
    }

    async fn upsert(&self, account: Account) -> Result<Account> {
        if take_failure(&self.failing_writes) {
            return Err(busy());
        }
        self.upserts.lock().unwrap().push(account.address.clone());
        self.accounts
            .lock()
            .unwrap()
            .insert(account.address.clone(), account.clone());
        Ok(account)
    }

    async fn delete(&self, address: &str) -> Result<usize> {
        if take_failure(&self.failing_writes) {
            return Err(busy());
        }
        self.deletes.lock().unwrap().push(address.to_string());
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .remove(address)
            .map(|_| 1)
            .unwrap_or(0))
    }
}

// =========================================================================
// Events
// =========================================================================

/// Serves a fixed event log per asset, filtered by start block.
#[derive(Clone, Default)]
pub struct MockEventSource {
    pub logs: Arc<Mutex<HashMap<String, Vec<BorrowEvent>>>>,
    pub requests: Arc<Mutex<Vec<(String, u64)>>>,
    pub failing_acquisitions: Arc<Mutex<u32>>,
    pub broken_streams: Arc<Mutex<u32>>,
    pub break_after: Arc<Mutex<usize>>,
    pub stream_error: Arc<Mutex<Option<EventSourceError>>>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(asset: &str, events: Vec<BorrowEvent>) -> Self {
        let source = Self::default();
        source.push(asset, events);
        source
    }

    pub fn push(&self, asset: &str, events: Vec<BorrowEvent>) {
        self.logs
            .lock()
            .unwrap()
            .entry(asset.to_string())
            .or_default()
            .extend(events);
    }

    pub fn fail_acquisitions(&self, count: u32) {
        *self.failing_acquisitions.lock().unwrap() = count;
    }

    /// The next `count` streams yield `after` events, then fail with
    /// `error`.
    pub fn break_streams(&self, count: u32, after: usize, error: EventSourceError) {
        *self.broken_streams.lock().unwrap() = count;
        *self.break_after.lock().unwrap() = after;
        *self.stream_error.lock().unwrap() = Some(error);
    }

    pub fn requests(&self) -> Vec<(String, u64)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn events(&self, asset: &str, from_block: u64) -> Result<EventStream> {
        self.requests
            .lock()
            .unwrap()
            .push((asset.to_string(), from_block));
        if take_failure(&self.failing_acquisitions) {
            return Err(Error::EventSource(EventSourceError::Transport(
                "connection reset by peer".to_string(),
            )));
        }
        let events: Vec<BorrowEvent> = self
            .logs
            .lock()
            .unwrap()
            .get(asset)
            .map(|log| {
                log.iter()
                    .filter(|e| e.block_number >= from_block)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if take_failure(&self.broken_streams) {
            let after = *self.break_after.lock().unwrap();
            let error = self
                .stream_error
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| EventSourceError::Transport("stream reset".to_string()));
            let items = events
                .into_iter()
                .take(after)
                .map(Ok)
                .chain(std::iter::once(Err(Error::EventSource(error))));
            return Ok(futures::stream::iter(items).boxed());
        }
        Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed())
    }
}
