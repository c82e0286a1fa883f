//! Decoding of market logs into borrow events.
//!
//! Both events carry the borrower's absolute outstanding balance, so the
//! engine never needs to reconstruct balances from deltas.

use num_bigint::BigUint;
use serde::Deserialize;

use borrowscan_core::events::BorrowEvent;

use crate::errors::RpcError;

/// keccak256("Borrow(address,uint256,uint256,uint256)")
pub const BORROW_TOPIC: &str =
    "0x13ed6866d4e1ee6da46f845c46d7e54120883d75c5ea9a2dacc1c4ca8984ab80";

/// keccak256("RepayBorrow(address,address,uint256,uint256,uint256)")
pub const REPAY_BORROW_TOPIC: &str =
    "0x1a2a22cb034d26d1854bdc6666a5b91fe25efbbb5dcad3b0355478d6f5c362a1";

const WORD_HEX_LEN: usize = 64;

/// A log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: Option<String>,
    pub log_index: Option<String>,
    /// Set by the node when a reorg dropped the log.
    #[serde(default)]
    pub removed: bool,
}

impl RawLog {
    /// (block, log index) ordering key.
    pub fn position(&self) -> Result<(u64, u64), RpcError> {
        let block = self
            .block_number
            .as_deref()
            .ok_or_else(|| RpcError::Decode("pending log has no block number".to_string()))?;
        let index = self.log_index.as_deref().unwrap_or("0x0");
        Ok((parse_quantity(block)?, parse_quantity(index)?))
    }
}

fn strip_hex(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Parses a hex quantity such as `0x1b4`.
pub fn parse_quantity(value: &str) -> Result<u64, RpcError> {
    u64::from_str_radix(strip_hex(value), 16)
        .map_err(|e| RpcError::Decode(format!("bad quantity '{}': {}", value, e)))
}

/// Splits ABI-encoded data into 32-byte words (as hex).
fn words(data: &str) -> Result<Vec<&str>, RpcError> {
    let hex = strip_hex(data);
    if hex.len() % WORD_HEX_LEN != 0 || !hex.is_ascii() {
        return Err(RpcError::Decode(format!(
            "log data of {} hex chars is not word aligned",
            hex.len()
        )));
    }
    Ok((0..hex.len() / WORD_HEX_LEN)
        .map(|i| &hex[i * WORD_HEX_LEN..(i + 1) * WORD_HEX_LEN])
        .collect())
}

fn word_to_uint(word: &str) -> Result<BigUint, RpcError> {
    BigUint::parse_bytes(word.as_bytes(), 16)
        .ok_or_else(|| RpcError::Decode(format!("bad uint256 word '{}'", word)))
}

/// An address is the low 20 bytes of its word.
fn word_to_address(word: &str) -> Result<String, RpcError> {
    let (padding, address) = word.split_at(WORD_HEX_LEN - 40);
    if padding.chars().any(|c| c != '0') {
        return Err(RpcError::Decode(format!("bad address word '{}'", word)));
    }
    Ok(format!("0x{}", address.to_ascii_lowercase()))
}

/// Decodes one log. Logs with other signatures and removed logs yield `None`.
pub fn decode_log(log: &RawLog) -> Result<Option<BorrowEvent>, RpcError> {
    if log.removed {
        return Ok(None);
    }
    let Some(topic) = log.topics.first() else {
        return Ok(None);
    };

    let (borrower_word, balance_word) = if topic.eq_ignore_ascii_case(BORROW_TOPIC) {
        (0, 2)
    } else if topic.eq_ignore_ascii_case(REPAY_BORROW_TOPIC) {
        (1, 3)
    } else {
        return Ok(None);
    };

    let data = words(&log.data)?;
    if data.len() <= balance_word {
        return Err(RpcError::Decode(format!(
            "log at {:?} has {} data words, expected at least {}",
            log.block_number,
            data.len(),
            balance_word + 1
        )));
    }

    let (block, _) = log.position()?;
    let borrower = word_to_address(data[borrower_word])?;
    let balance = word_to_uint(data[balance_word])?;
    Ok(Some(BorrowEvent::new(borrower, balance, block)))
}
