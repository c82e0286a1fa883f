//! Event source trait.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::events_model::BorrowEvent;
use crate::errors::Result;

/// One-shot, finite stream of an asset's borrow events.
///
/// Items arrive in non-decreasing block order. An `Err` item aborts the
/// reduction that is draining the stream.
pub type EventStream = BoxStream<'static, Result<BorrowEvent>>;

/// Source of absolute-balance events for an asset.
///
/// Implementations adapt a concrete ledger binding (contract ABI, node
/// client) to the engine. Acquisition may fail transiently; callers retry.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Opens a fresh stream of events for `asset` starting at `from_block`
    /// (inclusive).
    async fn events(&self, asset: &str, from_block: u64) -> Result<EventStream>;
}
