//! Tests for the orchestrator lifecycle.
//!
//! These tests drive full Wake -> Work -> Sleep runs against in-memory
//! collaborators and check the recovery properties the engine relies on:
//! cursors never move backwards, replays converge, and a failed phase leaves
//! stored cursors untouched.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::accounts::Account;
    use crate::engine::{
        AssetConfig, EngineConfig, EventSources, LifecycleState, Orchestrator, Phase,
        STATUS_FAILED, STATUS_OK,
    };
    use crate::errors::{Error, EventSourceError};
    use crate::events::{BoundaryPolicy, EventSource};
    use crate::persistence::PrunePolicy;
    use crate::run_state::RunState;
    use crate::test_utils::{
        event, fast_retry, units, MockAccountRepository, MockEventSource, MockRunStateRepository,
    };

    const BOT: &str = "borrow-tracker";

    struct Harness {
        accounts: MockAccountRepository,
        run_states: MockRunStateRepository,
        source: MockEventSource,
        config: EngineConfig,
    }

    impl Harness {
        fn new(symbols: &[&str]) -> Self {
            let mut config = EngineConfig::new(
                BOT,
                symbols.iter().map(|s| AssetConfig::new(*s, 0)).collect(),
            );
            config.retry = fast_retry(3);
            Self {
                accounts: MockAccountRepository::new(),
                run_states: MockRunStateRepository::new(),
                source: MockEventSource::new(),
                config,
            }
        }

        fn with_cursor(self, symbol: &str, block: u64) -> Self {
            let mut state = self
                .run_states
                .stored(BOT)
                .unwrap_or_else(|| RunState::new(BOT));
            state.cursors.insert(symbol.to_string(), block);
            let mut states = self.run_states.states.lock().unwrap();
            states.retain(|s| s.bot_type != BOT);
            states.push(state);
            drop(states);
            self
        }

        fn sources(&self) -> EventSources {
            let shared: Arc<dyn EventSource> = Arc::new(self.source.clone());
            self.config
                .assets
                .iter()
                .map(|a| (a.symbol.clone(), shared.clone()))
                .collect()
        }

        fn orchestrator(&self) -> Orchestrator {
            Orchestrator::new(
                self.config.clone(),
                self.sources(),
                Arc::new(self.accounts.clone()),
                Arc::new(self.run_states.clone()),
            )
            .unwrap()
        }

        fn stored_cursor(&self, symbol: &str) -> Option<u64> {
            self.run_states.stored(BOT).and_then(|s| s.cursor(symbol))
        }
    }

    // ==================== Construction ====================

    #[test]
    fn test_missing_event_source_is_rejected() {
        let harness = Harness::new(&["X", "Y"]);
        let mut sources: EventSources = HashMap::new();
        sources.insert("X".to_string(), Arc::new(harness.source.clone()));

        let result = Orchestrator::new(
            harness.config.clone(),
            sources,
            Arc::new(harness.accounts.clone()),
            Arc::new(harness.run_states.clone()),
        );

        assert!(matches!(
            result,
            Err(Error::EventSource(EventSourceError::UnknownAsset(ref s))) if s == "Y"
        ));
    }

    // ==================== Scenarios ====================

    #[tokio::test]
    async fn test_account_zeroed_within_window_is_pruned_and_cursor_advances() {
        let harness = Harness::new(&["X"]).with_cursor("X", 100);
        harness
            .source
            .push("X", vec![event("addrA", 500, 150), event("addrA", 0, 200)]);
        let mut engine = harness.orchestrator();

        let report = engine.run().await.unwrap();

        assert!(!engine.ledger().contains("addrA"));
        assert_eq!(engine.cursors().get("X"), Some(&200));
        assert_eq!(harness.stored_cursor("X"), Some(200));
        assert_eq!(report.asset("X").unwrap().cursor_before, Some(100));
        assert_eq!(harness.source.requests(), vec![("X".to_string(), 100)]);
    }

    #[tokio::test]
    async fn test_first_run_creates_account_and_cursor() {
        let harness = Harness::new(&["Y"]);
        harness.source.push("Y", vec![event("addrB", 1000, 10)]);
        let mut engine = harness.orchestrator();

        let report = engine.run().await.unwrap();

        assert_eq!(engine.ledger().len(), 1);
        assert_eq!(
            harness.accounts.stored("addrB"),
            Some(Account::with_balance("addrB", "Y", units(1000)))
        );
        assert_eq!(report.dirty_accounts.iter().collect::<Vec<_>>(), vec!["addrB"]);
        assert_eq!(harness.stored_cursor("Y"), Some(10));
        assert_eq!(engine.state(), LifecycleState::Asleep);
    }

    #[tokio::test]
    async fn test_zero_on_one_asset_keeps_account_active_and_persists_zero() {
        let mut existing = Account::with_balance("addrA", "X", units(500));
        existing.balances.insert("Z".to_string(), units(200));
        let mut harness = Harness::new(&["X", "Z"]);
        harness.accounts = MockAccountRepository::with_accounts(vec![existing]);
        harness.source.push("X", vec![event("addrA", 0, 160)]);
        let mut engine = harness.orchestrator();

        engine.run().await.unwrap();

        let account = engine.ledger().get("addrA").unwrap();
        assert_eq!(account.balance("X"), Some(&units(0)));
        assert_eq!(account.balance("Z"), Some(&units(200)));
        assert_eq!(
            harness.accounts.stored("addrA").unwrap().balance("X"),
            Some(&units(0))
        );
        // No Z events: the Z cursor stays absent.
        assert_eq!(harness.stored_cursor("Z"), None);
    }

    // ==================== Properties ====================

    #[tokio::test]
    async fn test_cursor_never_moves_backwards() {
        let harness = Harness::new(&["X"]).with_cursor("X", 500);
        // Only the boundary block is re-read under the inclusive policy.
        harness.source.push("X", vec![event("a", 10, 500)]);
        let mut engine = harness.orchestrator();

        let report = engine.run().await.unwrap();

        assert_eq!(harness.stored_cursor("X"), Some(500));
        assert_eq!(report.asset("X").unwrap().cursor_after, Some(500));
    }

    #[tokio::test]
    async fn test_exclusive_boundary_skips_cursor_block() {
        let mut harness = Harness::new(&["X"]).with_cursor("X", 500);
        harness.config.boundary = BoundaryPolicy::Exclusive;
        harness
            .source
            .push("X", vec![event("a", 10, 500), event("b", 20, 501)]);
        let mut engine = harness.orchestrator();

        engine.run().await.unwrap();

        assert_eq!(harness.source.requests(), vec![("X".to_string(), 501)]);
        assert!(!engine.ledger().contains("a"));
        assert!(engine.ledger().contains("b"));
        assert_eq!(harness.stored_cursor("X"), Some(501));
    }

    #[tokio::test]
    async fn test_replay_from_earlier_cursor_converges_to_latest_balances() {
        let harness = Harness::new(&["X"]);
        harness.source.push(
            "X",
            vec![
                event("a", 10, 1),
                event("b", 5, 2),
                event("a", 30, 3),
                event("b", 0, 4),
                event("c", 8, 5),
            ],
        );
        let mut first = harness.orchestrator();
        first.run().await.unwrap();
        let after_first = harness.accounts.snapshot();

        // Crash recovery: cursor reset to an earlier block, full replay.
        let harness = harness.with_cursor("X", 2);
        let mut replay = harness.orchestrator();
        replay.run().await.unwrap();

        assert_eq!(harness.accounts.snapshot(), after_first);
        assert_eq!(
            replay.ledger().get("a").unwrap().balance("X"),
            Some(&units(30))
        );
        assert!(!replay.ledger().contains("b"));
        assert_eq!(harness.stored_cursor("X"), Some(5));
    }

    #[tokio::test]
    async fn test_tombstoned_account_stays_out_after_restart() {
        let harness = Harness::new(&["X"]);
        harness
            .source
            .push("X", vec![event("a", 10, 1), event("a", 0, 2)]);
        harness.orchestrator().run().await.unwrap();

        let mut next = harness.orchestrator();
        next.wake().await.unwrap();

        assert!(!next.ledger().contains("a"));
        assert!(harness.accounts.stored("a").is_some());
    }

    #[tokio::test]
    async fn test_retain_policy_resurrects_stale_record_on_restart() {
        let mut harness = Harness::new(&["X"]);
        harness.config.prune = PrunePolicy::Retain;
        harness.source.push("X", vec![event("a", 10, 1)]);
        harness.orchestrator().run().await.unwrap();

        harness.source.push("X", vec![event("a", 0, 2)]);
        let mut second = harness.orchestrator();
        let report = second.run().await.unwrap();
        assert!(!second.ledger().contains("a"));
        assert_eq!(report.asset("X").unwrap().flush.upserted, 0);

        let mut next = harness.orchestrator();
        next.wake().await.unwrap();

        assert_eq!(next.ledger().get("a").unwrap().balance("X"), Some(&units(10)));
    }

    #[tokio::test]
    async fn test_assets_are_processed_in_configured_order() {
        let harness = Harness::new(&["Y", "X"]);
        harness.source.push("X", vec![event("a", 1, 1)]);
        harness.source.push("Y", vec![event("a", 2, 1)]);
        let mut engine = harness.orchestrator();

        let report = engine.run().await.unwrap();

        let order: Vec<_> = report.assets.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(order, vec!["Y", "X"]);
        let account = engine.ledger().get("a").unwrap();
        assert_eq!(account.balances.len(), 2);
        assert_eq!(report.dirty_accounts.len(), 1);
    }

    // ==================== Failures ====================

    #[tokio::test]
    async fn test_transient_acquisition_failure_is_retried() {
        let harness = Harness::new(&["X"]);
        harness.source.push("X", vec![event("a", 1, 7)]);
        harness.source.fail_acquisitions(2);
        let mut engine = harness.orchestrator();

        engine.run().await.unwrap();

        assert_eq!(harness.source.requests().len(), 3);
        assert_eq!(harness.stored_cursor("X"), Some(7));
    }

    #[tokio::test]
    async fn test_stream_failure_resumes_from_last_consumed_block() {
        let harness = Harness::new(&["X"]);
        harness.source.push(
            "X",
            vec![event("a", 10, 5), event("b", 20, 8), event("a", 0, 9)],
        );
        harness
            .source
            .break_streams(1, 1, EventSourceError::RateLimited("node".to_string()));
        let mut engine = harness.orchestrator();

        engine.run().await.unwrap();

        assert_eq!(
            harness.source.requests(),
            vec![("X".to_string(), 0), ("X".to_string(), 5)]
        );
        assert!(!engine.ledger().contains("a"));
        assert_eq!(
            harness.accounts.stored("b"),
            Some(Account::with_balance("b", "X", units(20)))
        );
        assert_eq!(harness.stored_cursor("X"), Some(9));
    }

    #[tokio::test]
    async fn test_stream_failures_share_the_retry_budget() {
        let harness = Harness::new(&["X"]).with_cursor("X", 3);
        harness.source.push("X", vec![event("a", 1, 4), event("a", 2, 6)]);
        harness
            .source
            .break_streams(10, 1, EventSourceError::Timeout("node".to_string()));
        let mut engine = harness.orchestrator();

        engine.wake().await.unwrap();
        let result = engine.work().await;

        assert!(matches!(
            result,
            Err(Error::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(harness.source.requests().len(), 3);
        assert!(harness.accounts.snapshot().is_empty());
        assert_eq!(harness.stored_cursor("X"), Some(3));
    }

    #[tokio::test]
    async fn test_permanent_stream_error_is_not_retried() {
        let harness = Harness::new(&["X"]);
        harness.source.push("X", vec![event("a", 1, 4)]);
        harness
            .source
            .break_streams(1, 0, EventSourceError::Decode("truncated log".to_string()));
        let mut engine = harness.orchestrator();

        engine.wake().await.unwrap();
        let result = engine.work().await;

        assert!(matches!(
            result,
            Err(Error::EventSource(EventSourceError::Decode(_)))
        ));
        assert_eq!(harness.source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_work_leaves_stored_cursors_untouched() {
        let harness = Harness::new(&["X"]).with_cursor("X", 3);
        harness.source.push("X", vec![event("a", 1, 7)]);
        harness.source.fail_acquisitions(10);
        let mut engine = harness.orchestrator();

        engine.wake().await.unwrap();
        let result = engine.work().await;

        assert!(matches!(result, Err(Error::RetriesExhausted { .. })));
        assert_eq!(engine.state(), LifecycleState::Working);
        assert!(matches!(
            engine.sleep().await,
            Err(Error::InvalidPhase { .. })
        ));
        assert_eq!(harness.stored_cursor("X"), Some(3));
    }

    #[tokio::test]
    async fn test_upsert_exhaustion_does_not_advance_cursor() {
        let harness = Harness::new(&["X"]);
        harness.source.push("X", vec![event("a", 1, 7)]);
        let mut engine = harness.orchestrator();
        engine.wake().await.unwrap();
        harness.accounts.fail_writes(10);

        let result = engine.work().await;

        assert!(result.is_err());
        assert_eq!(engine.cursors().get("X"), None);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_fails_wake() {
        let harness = Harness::new(&["X"]);
        harness.accounts.corrupt();
        let mut engine = harness.orchestrator();

        let result = engine.wake().await;

        assert!(matches!(result, Err(Error::DataIntegrity(_))));
        assert_eq!(engine.state(), LifecycleState::Uninitialized);
    }

    // ==================== Phase ordering ====================

    #[tokio::test]
    async fn test_phases_out_of_order_are_rejected() {
        let harness = Harness::new(&["X"]);
        let mut engine = harness.orchestrator();

        assert!(matches!(engine.work().await, Err(Error::InvalidPhase { .. })));
        assert!(matches!(engine.sleep().await, Err(Error::InvalidPhase { .. })));
        engine.wake().await.unwrap();
        assert!(matches!(engine.wake().await, Err(Error::InvalidPhase { .. })));
        assert!(harness.source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_run_phase_reports_integer_status() {
        let harness = Harness::new(&["X"]);
        harness.source.push("X", vec![event("a", 1, 7)]);
        let mut engine = harness.orchestrator();

        assert_eq!(engine.run_phase(Phase::Work).await, STATUS_FAILED);
        for phase in Phase::ALL {
            assert_eq!(engine.run_phase(phase).await, STATUS_OK);
        }
        assert_eq!(harness.stored_cursor("X"), Some(7));
        assert!(harness.run_states.stored(BOT).unwrap().last_sleep_at.is_some());
    }

    #[tokio::test]
    async fn test_sleep_without_work_keeps_cursors() {
        let harness = Harness::new(&["X"]).with_cursor("X", 42);
        let mut engine = harness.orchestrator();

        engine.wake().await.unwrap();
        engine.sleep().await.unwrap();

        assert_eq!(harness.stored_cursor("X"), Some(42));
        assert!(harness.source.requests().is_empty());
    }
}
