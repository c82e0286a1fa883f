//! `EventSource` over a lending market's Borrow/RepayBorrow logs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use borrowscan_core::errors::{Error, EventSourceError, Result};
use borrowscan_core::events::{BorrowEvent, EventSource, EventStream};

use crate::client::{LogFilter, LogReader};
use crate::decoder::{decode_log, RawLog, BORROW_TOPIC, REPAY_BORROW_TOPIC};
use crate::errors::RpcError;

/// Widest block span requested from the node in one `eth_getLogs` call.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 2_000;

/// A market contract serving one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub symbol: String,
    pub address: String,
}

impl Market {
    pub fn new(symbol: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            address: address.into().to_ascii_lowercase(),
        }
    }
}

/// Splits `[from, to]` into inclusive spans of at most `max_range` blocks.
pub fn block_ranges(
    from: u64,
    to: u64,
    max_range: u64,
) -> impl Iterator<Item = (u64, u64)> + Send + 'static {
    let span = max_range.max(1);
    let mut next = Some(from).filter(|start| *start <= to);
    std::iter::from_fn(move || {
        let start = next?;
        let end = start.saturating_add(span - 1).min(to);
        next = if end >= to { None } else { Some(end + 1) };
        Some((start, end))
    })
}

/// Serves each configured market's logs as an [`EventStream`].
///
/// The scan is bounded by the chain head observed when the stream is
/// acquired; blocks produced afterwards belong to the next run.
pub struct MarketLogSource {
    reader: Arc<dyn LogReader>,
    markets: HashMap<String, Market>,
    max_block_range: u64,
}

impl MarketLogSource {
    pub fn new(reader: Arc<dyn LogReader>, markets: Vec<Market>, max_block_range: u64) -> Self {
        let markets = markets
            .into_iter()
            .map(|market| (market.symbol.clone(), market))
            .collect();
        Self {
            reader,
            markets,
            max_block_range,
        }
    }
}

fn log_filter(address: &str, from_block: u64, to_block: u64) -> LogFilter {
    LogFilter {
        address: address.to_string(),
        topics: vec![BORROW_TOPIC.to_string(), REPAY_BORROW_TOPIC.to_string()],
        from_block,
        to_block,
    }
}

/// Orders one page by (block, log index) and decodes its borrow events.
///
/// Logs dropped by a reorg and logs with other signatures are skipped.
pub fn decode_page(logs: Vec<RawLog>) -> std::result::Result<Vec<BorrowEvent>, RpcError> {
    let mut positioned = logs
        .into_iter()
        .filter(|log| !log.removed)
        .map(|log| log.position().map(|position| (position, log)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    positioned.sort_by_key(|(position, _)| *position);

    let mut events = Vec::with_capacity(positioned.len());
    for (_, log) in &positioned {
        if let Some(event) = decode_log(log)? {
            events.push(event);
        }
    }
    Ok(events)
}

/// Fetches the logs of `[from, to]`, halving the span while the node
/// reports an oversized result.
async fn fetch_logs(
    reader: &dyn LogReader,
    address: &str,
    from: u64,
    to: u64,
) -> std::result::Result<Vec<RawLog>, RpcError> {
    let mut pending = vec![(from, to)];
    let mut logs = Vec::new();
    while let Some((start, end)) = pending.pop() {
        match reader.get_logs(&log_filter(address, start, end)).await {
            Ok(mut page) => logs.append(&mut page),
            Err(err) if err.is_result_limit() && start < end => {
                let mid = start + (end - start) / 2;
                warn!(
                    "{}: blocks {}..={} exceed the node's result limit, splitting at {}",
                    address, start, end, mid
                );
                pending.push((mid + 1, end));
                pending.push((start, mid));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(logs)
}

async fn fetch_page(
    reader: &dyn LogReader,
    address: &str,
    from: u64,
    to: u64,
) -> Result<Vec<BorrowEvent>> {
    let logs = fetch_logs(reader, address, from, to).await?;
    let count = logs.len();
    let events = decode_page(logs)?;
    debug!(
        "{}: blocks {}..={} gave {} logs, {} events",
        address,
        from,
        to,
        count,
        events.len()
    );
    Ok(events)
}

#[async_trait]
impl EventSource for MarketLogSource {
    async fn events(&self, asset: &str, from_block: u64) -> Result<EventStream> {
        let market = self
            .markets
            .get(asset)
            .ok_or_else(|| EventSourceError::UnknownAsset(asset.to_string()))?;

        let head = self.reader.block_number().await?;
        if from_block > head {
            debug!("{}: block {} is past head {}", asset, from_block, head);
            return Ok(stream::empty().boxed());
        }
        info!(
            "{}: streaming logs of {} for blocks {}..={}",
            asset, market.address, from_block, head
        );

        let reader = self.reader.clone();
        let address = market.address.clone();
        let pages = stream::iter(block_ranges(from_block, head, self.max_block_range)).then(
            move |(from, to)| {
                let reader = reader.clone();
                let address = address.clone();
                async move { fetch_page(reader.as_ref(), &address, from, to).await }
            },
        );

        Ok(pages
            .map_ok(|events| stream::iter(events.into_iter().map(Ok::<_, Error>)))
            .try_flatten()
            .boxed())
    }
}
