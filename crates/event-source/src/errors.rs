//! Error types for the JSON-RPC event source.

use borrowscan_core::errors::{Error, EventSourceError};
use thiserror::Error;

/// Errors raised while talking to the node or decoding its answers.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request to {0} timed out")]
    Timeout(String),

    /// HTTP 429, or a node-level rate limit error.
    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response or a log could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Timeout(
                err.url()
                    .map(|u| u.host_str().unwrap_or_default().to_string())
                    .unwrap_or_default(),
            )
        } else if err.is_decode() {
            RpcError::Decode(err.to_string())
        } else {
            RpcError::Transport(err.to_string())
        }
    }
}

/// Phrases nodes use when a request was throttled.
const RATE_LIMIT_HINTS: [&str; 3] = ["rate limit", "rate exceeded", "too many requests"];

/// Phrases nodes use when an `eth_getLogs` span returned too much data.
const RESULT_LIMIT_HINTS: [&str; 4] = [
    "more than",
    "too many results",
    "block range",
    "response size",
];

fn mentions(message: &str, hints: &[&str]) -> bool {
    let message = message.to_ascii_lowercase();
    hints.iter().any(|hint| message.contains(hint))
}

impl RpcError {
    /// A JSON-RPC error that throttles the caller. Several providers reuse
    /// `-32005` for both throttling and oversized results, so the message
    /// decides.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            RpcError::RateLimited(_) => true,
            RpcError::Rpc { message, .. } => mentions(message, &RATE_LIMIT_HINTS),
            _ => false,
        }
    }

    /// The node refused to answer for the whole block span; a narrower span
    /// may succeed.
    pub fn is_result_limit(&self) -> bool {
        match self {
            RpcError::Rpc { message, .. } => {
                !self.is_rate_limit() && mentions(message, &RESULT_LIMIT_HINTS)
            }
            _ => false,
        }
    }
}

impl From<RpcError> for EventSourceError {
    fn from(err: RpcError) -> Self {
        let throttled = err.is_rate_limit();
        match err {
            RpcError::Rpc { code, .. } if throttled => {
                EventSourceError::RateLimited(format!("rpc code {}", code))
            }
            RpcError::Transport(e) => EventSourceError::Transport(e),
            RpcError::Timeout(host) => EventSourceError::Timeout(host),
            RpcError::RateLimited(host) => EventSourceError::RateLimited(host),
            RpcError::Http { status: 408, body } => EventSourceError::Timeout(body),
            RpcError::Http { status, body } if status >= 500 => {
                EventSourceError::Transport(format!("HTTP {}: {}", status, body))
            }
            RpcError::Http { status, body } => EventSourceError::Rpc {
                code: i64::from(status),
                message: body,
            },
            RpcError::Rpc { code, message } => EventSourceError::Rpc { code, message },
            RpcError::Decode(e) => EventSourceError::Decode(e),
        }
    }
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        Error::EventSource(err.into())
    }
}
