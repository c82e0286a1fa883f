use std::str::FromStr;
use std::time::Duration;

use borrowscan_core::engine::{AssetConfig, EngineConfig, DEFAULT_BOT_TYPE};
use borrowscan_core::errors::{Error, Result};
use borrowscan_core::events::BoundaryPolicy;
use borrowscan_core::persistence::PrunePolicy;
use borrowscan_core::retry::{
    RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, DEFAULT_MULTIPLIER,
};
use borrowscan_event_source::DEFAULT_MAX_BLOCK_RANGE;

const DEFAULT_DB_PATH: &str = "./db/borrowscan.db";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// A tracked asset and the market contract emitting its events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub symbol: String,
    pub market: String,
    pub start_block: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub rpc_url: String,
    pub bot_type: String,
    pub assets: Vec<AssetEntry>,
    pub max_block_range: u64,
    pub boundary: BoundaryPolicy,
    pub prune: PrunePolicy,
    pub retry: RetryPolicy,
    pub log_format: LogFormat,
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require =
            |key: &str| get(key).ok_or_else(|| Error::MissingConfigKey(key.to_string()));

        let retry = RetryPolicy {
            max_attempts: parse_or(&get, "BORROWSCAN_RETRY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            base_delay: parse_opt(&get, "BORROWSCAN_RETRY_BASE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_BASE_DELAY),
            multiplier: parse_or(&get, "BORROWSCAN_RETRY_MULTIPLIER", DEFAULT_MULTIPLIER)?,
            max_delay: parse_opt(&get, "BORROWSCAN_RETRY_MAX_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_MAX_DELAY),
        };

        let max_block_range =
            parse_or(&get, "BORROWSCAN_MAX_BLOCK_RANGE", DEFAULT_MAX_BLOCK_RANGE)?;
        if max_block_range == 0 {
            return Err(Error::InvalidConfigValue(
                "BORROWSCAN_MAX_BLOCK_RANGE must be positive".to_string(),
            ));
        }

        Ok(Self {
            db_path: get("BORROWSCAN_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            rpc_url: require("BORROWSCAN_RPC_URL")?,
            bot_type: get("BORROWSCAN_BOT_TYPE").unwrap_or_else(|| DEFAULT_BOT_TYPE.to_string()),
            assets: parse_assets(&require("BORROWSCAN_ASSETS")?)?,
            max_block_range,
            boundary: parse_or(&get, "BORROWSCAN_BOUNDARY", BoundaryPolicy::default())?,
            prune: parse_or(&get, "BORROWSCAN_PRUNE", PrunePolicy::default())?,
            retry,
            log_format: parse_or(&get, "BORROWSCAN_LOG_FORMAT", LogFormat::default())?,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        let assets = self
            .assets
            .iter()
            .map(|asset| AssetConfig::new(asset.symbol.clone(), asset.start_block))
            .collect();
        let mut engine = EngineConfig::new(self.bot_type.clone(), assets);
        engine.boundary = self.boundary;
        engine.prune = self.prune;
        engine.retry = self.retry.clone();
        engine
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::InvalidConfigValue(format!("{}='{}': {}", key, raw, e)))
        })
        .transpose()
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

/// Parses `SYMBOL:0xMARKET[:START_BLOCK]` entries separated by commas.
fn parse_assets(raw: &str) -> Result<Vec<AssetEntry>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let (symbol, market, start_block) = match parts.as_slice() {
                [symbol, market] => (*symbol, *market, 0),
                [symbol, market, start] => {
                    let start_block = start.parse().map_err(|_| {
                        Error::InvalidConfigValue(format!("asset '{}': bad start block", entry))
                    })?;
                    (*symbol, *market, start_block)
                }
                _ => {
                    return Err(Error::InvalidConfigValue(format!(
                        "asset '{}' is not SYMBOL:0xMARKET[:START_BLOCK]",
                        entry
                    )))
                }
            };
            let is_address = market.len() == 42
                && market.starts_with("0x")
                && market[2..].chars().all(|c| c.is_ascii_hexdigit());
            if symbol.is_empty() || !is_address {
                return Err(Error::InvalidConfigValue(format!(
                    "asset '{}' needs a symbol and a 0x-prefixed market address",
                    entry
                )));
            }
            Ok(AssetEntry {
                symbol: symbol.to_string(),
                market: market.to_string(),
                start_block,
            })
        })
        .collect()
}
