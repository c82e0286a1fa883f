use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info};

use super::engine_config::EngineConfig;
use super::lifecycle::{status_code, AssetReport, LifecycleState, Phase, WorkReport};
use crate::accounts::{AccountLedger, AccountRepositoryTrait};
use crate::errors::{Error, EventSourceError, Result};
use crate::events::{EventReducer, EventSource};
use crate::persistence::PersistenceSink;
use crate::run_state::{CursorMap, CursorStore, RunState, RunStateRepositoryTrait};

/// Asset symbol -> the source serving that asset's events.
pub type EventSources = HashMap<String, Arc<dyn EventSource>>;

/// Drives one Wake -> Work -> Sleep run.
///
/// The orchestrator exclusively owns the ledger, the run state and the
/// in-memory cursors for the duration of the run. Phases must be invoked in
/// order; a phase invoked from the wrong state fails without side effects.
pub struct Orchestrator {
    config: EngineConfig,
    sources: EventSources,
    cursor_store: CursorStore,
    sink: PersistenceSink,
    ledger: AccountLedger,
    run_state: Option<RunState>,
    cursors: CursorMap,
    state: LifecycleState,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        sources: EventSources,
        accounts: Arc<dyn AccountRepositoryTrait>,
        run_states: Arc<dyn RunStateRepositoryTrait>,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(missing) = config
            .assets
            .iter()
            .find(|asset| !sources.contains_key(&asset.symbol))
        {
            return Err(EventSourceError::UnknownAsset(missing.symbol.clone()).into());
        }

        let cursor_store = CursorStore::new(run_states, config.retry.clone());
        let sink = PersistenceSink::new(accounts, config.retry.clone(), config.prune);

        Ok(Self {
            config,
            sources,
            cursor_store,
            sink,
            ledger: AccountLedger::new(),
            run_state: None,
            cursors: CursorMap::new(),
            state: LifecycleState::Uninitialized,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    pub fn cursors(&self) -> &CursorMap {
        &self.cursors
    }

    fn expect_state(&self, phase: Phase, expected: LifecycleState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidPhase {
                phase: phase.to_string(),
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Recovers the run state and loads the full account snapshot.
    pub async fn wake(&mut self) -> Result<()> {
        self.expect_state(Phase::Wake, LifecycleState::Uninitialized)?;

        let run_state = self
            .cursor_store
            .load_or_create(&self.config.bot_type)
            .await?;
        let snapshot = self.sink.load_snapshot().await?;
        let loaded = self.ledger.load(snapshot);

        info!(
            "Woke '{}' (run state {}): {} active accounts, {} cursors",
            self.config.bot_type,
            run_state.id,
            loaded,
            run_state.cursors.len()
        );
        self.cursors = run_state.cursors.clone();
        self.run_state = Some(run_state);
        self.state = LifecycleState::Awake;
        Ok(())
    }

    /// Reduces every configured asset's new events, in configuration order.
    ///
    /// Each asset's changes are flushed before its cursor moves, so a crash
    /// at any point leaves stored cursors at or behind stored accounts.
    pub async fn work(&mut self) -> Result<WorkReport> {
        self.expect_state(Phase::Work, LifecycleState::Awake)?;
        self.state = LifecycleState::Working;

        let mut report = WorkReport::default();
        let assets = self.config.assets.clone();
        for asset in &assets {
            let symbol = asset.symbol.as_str();
            let source = self
                .sources
                .get(symbol)
                .cloned()
                .ok_or_else(|| EventSourceError::UnknownAsset(symbol.to_string()))?;

            let cursor_before = self.cursors.get(symbol).copied();
            let from_block = self
                .config
                .boundary
                .start_block(cursor_before, asset.start_block);
            debug!("{}: scanning from block {}", symbol, from_block);

            // Acquiring and draining share one retry budget. After a transient
            // failure the stream is re-acquired from the last consumed block,
            // whose events re-apply idempotently.
            let mut budget = self.config.retry.budget();
            let mut reducer = EventReducer::new(&mut self.ledger, symbol);
            let mut resume_from = from_block;
            loop {
                let operation = format!("read {} events from block {}", symbol, resume_from);
                let attempt = match source.events(symbol, resume_from).await {
                    Ok(stream) => reducer.drain(stream).await,
                    Err(err) => Err(err),
                };
                match attempt {
                    Ok(()) => {
                        budget.succeeded(&operation);
                        break;
                    }
                    Err(err) => {
                        budget.retry_after(&operation, err).await?;
                        if let Some(last) = reducer.watermark() {
                            resume_from = last.max(from_block);
                        }
                    }
                }
            }
            let reduction = reducer.finish();
            let flush = self.sink.flush(&self.ledger, &reduction).await?;
            report.dirty_accounts.extend(reduction.dirty.iter().cloned());

            if let Some(candidate) = reduction.watermark {
                if cursor_before.map_or(true, |current| candidate > current) {
                    self.cursors.insert(symbol.to_string(), candidate);
                } else {
                    debug!(
                        "{}: watermark {} does not advance cursor {:?}",
                        symbol, candidate, cursor_before
                    );
                }
            }
            let cursor_after = self.cursors.get(symbol).copied();

            info!(
                "{}: {} events, {} upserted, {} tombstoned, {} deleted, cursor {:?} -> {:?}",
                symbol,
                reduction.events_applied,
                flush.upserted,
                flush.tombstoned,
                flush.deleted,
                cursor_before,
                cursor_after
            );
            report.assets.push(AssetReport {
                symbol: symbol.to_string(),
                from_block,
                cursor_before,
                cursor_after,
                events_applied: reduction.events_applied,
                flush,
            });
        }

        info!(
            "Work done: {} events across {} assets, {} accounts written, {} active",
            report.events_applied(),
            report.assets.len(),
            report.dirty_accounts.len(),
            self.ledger.len()
        );
        self.state = LifecycleState::Awake;
        Ok(report)
    }

    /// Persists the final cursors and the sleep timestamp.
    pub async fn sleep(&mut self) -> Result<()> {
        self.expect_state(Phase::Sleep, LifecycleState::Awake)?;

        let run_state = self
            .run_state
            .as_mut()
            .ok_or_else(|| Error::Unexpected("awake without a run state".to_string()))?;
        self.cursor_store
            .persist_final(run_state, self.cursors.clone())
            .await?;

        info!("'{}' is asleep", self.config.bot_type);
        self.state = LifecycleState::Asleep;
        Ok(())
    }

    /// Runs all three phases in order.
    pub async fn run(&mut self) -> Result<WorkReport> {
        self.wake().await?;
        let report = self.work().await?;
        self.sleep().await?;
        Ok(report)
    }

    /// Runs one phase and reports its status as an integer (0 = success).
    ///
    /// A failure is logged with the phase and the failing operation.
    pub async fn run_phase(&mut self, phase: Phase) -> i32 {
        let result = match phase {
            Phase::Wake => self.wake().await,
            Phase::Work => self.work().await.map(|_| ()),
            Phase::Sleep => self.sleep().await,
        };
        if let Err(err) = &result {
            error!("{} phase failed: {}", phase, err);
        }
        status_code(&result)
    }
}
