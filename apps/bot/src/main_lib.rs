use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use borrowscan_core::engine::{EventSources, Orchestrator};
use borrowscan_core::events::EventSource;
use borrowscan_event_source::{Market, MarketLogSource, RpcClient};
use borrowscan_storage_sqlite::{db, AccountRepository, RunStateRepository};

use crate::config::{Config, LogFormat};

/// Installs the global subscriber. `log` records from the library crates are
/// forwarded to it. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

pub async fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let (pool, writer) = db::open(&config.db_path).await?;
    tracing::info!("Database path in use: {}", config.db_path);

    let accounts = Arc::new(AccountRepository::new(pool.clone(), writer.clone()));
    let run_states = Arc::new(RunStateRepository::new(pool, writer));

    let client = Arc::new(RpcClient::new(config.rpc_url.clone()));
    let markets = config
        .assets
        .iter()
        .map(|asset| Market::new(asset.symbol.clone(), asset.market.clone()))
        .collect();
    let source: Arc<dyn EventSource> = Arc::new(MarketLogSource::new(
        client,
        markets,
        config.max_block_range,
    ));
    let sources: EventSources = config
        .assets
        .iter()
        .map(|asset| (asset.symbol.clone(), source.clone()))
        .collect();

    let orchestrator = Orchestrator::new(config.engine_config(), sources, accounts, run_states)?;
    Ok(orchestrator)
}
