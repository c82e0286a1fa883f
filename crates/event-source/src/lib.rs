//! Borrowscan Event Source
//!
//! Reads borrow balance changes from Compound-style lending markets over
//! Ethereum JSON-RPC and serves them to the engine as per-asset event streams.
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+     +------------------+
//! |  MarketLogSource | --> |    RpcClient     | --> |   JSON-RPC node  |
//! | (EventSource)    |     | eth_blockNumber  |     +------------------+
//! +------------------+     | eth_getLogs      |
//!          |               +------------------+
//!          v
//! +------------------+
//! |   log decoder    |  Borrow / RepayBorrow -> BorrowEvent
//! +------------------+
//! ```
//!
//! Pages of at most `max_block_range` blocks are fetched lazily as the
//! stream is polled, so a long backlog never sits in memory at once. A page
//! the node refuses as too large is split in half until it fits. A failed
//! page ends the stream with its error; the engine resumes from the last
//! block it consumed.

pub mod client;
pub mod decoder;
pub mod errors;
pub mod source;

pub use client::{LogFilter, LogReader, RpcClient};
pub use decoder::{decode_log, RawLog, BORROW_TOPIC, REPAY_BORROW_TOPIC};
pub use errors::RpcError;
pub use source::{block_ranges, decode_page, Market, MarketLogSource, DEFAULT_MAX_BLOCK_RANGE};
