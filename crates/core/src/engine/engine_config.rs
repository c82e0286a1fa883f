//! Engine-level configuration.

use std::collections::HashSet;

use crate::errors::{Error, Result};
use crate::events::BoundaryPolicy;
use crate::persistence::PrunePolicy;
use crate::retry::RetryPolicy;

pub const DEFAULT_BOT_TYPE: &str = "borrow-tracker";

/// An asset the engine tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetConfig {
    pub symbol: String,
    /// First block scanned when the asset has no cursor yet.
    pub start_block: u64,
}

impl AssetConfig {
    pub fn new(symbol: impl Into<String>, start_block: u64) -> Self {
        Self {
            symbol: symbol.into(),
            start_block,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub bot_type: String,
    /// Assets in processing order.
    pub assets: Vec<AssetConfig>,
    pub boundary: BoundaryPolicy,
    pub prune: PrunePolicy,
    pub retry: RetryPolicy,
}

impl EngineConfig {
    pub fn new(bot_type: impl Into<String>, assets: Vec<AssetConfig>) -> Self {
        Self {
            bot_type: bot_type.into(),
            assets,
            boundary: BoundaryPolicy::default(),
            prune: PrunePolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_type.trim().is_empty() {
            return Err(Error::InvalidConfigValue("bot type is empty".to_string()));
        }
        if self.assets.is_empty() {
            return Err(Error::InvalidConfigValue(
                "no assets configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.symbol.trim().is_empty() {
                return Err(Error::InvalidConfigValue(
                    "asset symbol is empty".to_string(),
                ));
            }
            if !seen.insert(asset.symbol.as_str()) {
                return Err(Error::InvalidConfigValue(format!(
                    "asset {} configured twice",
                    asset.symbol
                )));
            }
        }
        if self.retry.multiplier < 1.0 {
            return Err(Error::InvalidConfigValue(format!(
                "retry multiplier {} is below 1.0",
                self.retry.multiplier
            )));
        }
        Ok(())
    }
}
