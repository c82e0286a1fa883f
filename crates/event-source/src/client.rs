//! Minimal Ethereum JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::decoder::{parse_quantity, RawLog};
use crate::errors::RpcError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// `eth_getLogs` filter for one contract and one set of topic-0 alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: String,
    pub topics: Vec<String>,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    fn to_params(&self) -> Value {
        json!([{
            "address": self.address,
            // A nested array matches any of the listed signatures.
            "topics": [self.topics],
            "fromBlock": format!("0x{:x}", self.from_block),
            "toBlock": format!("0x{:x}", self.to_block),
        }])
    }
}

/// The two node queries the log source depends on.
#[async_trait]
pub trait LogReader: Send + Sync {
    /// Latest block number known to the node.
    async fn block_number(&self) -> Result<u64, RpcError>;

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, RpcError>;
}

pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Sends one JSON-RPC request and decodes its `result`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("RPC request {} (id {})", method, request.id);

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RpcError::RateLimited(self.url.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("RPC {} failed with HTTP {}", method, status);
            return Err(RpcError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: RpcResponse<T> = response.json().await?;
        if let Some(error) = body.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        body.result
            .ok_or_else(|| RpcError::Decode(format!("{} response has no result", method)))
    }
}

#[async_trait]
impl LogReader for RpcClient {
    async fn block_number(&self) -> Result<u64, RpcError> {
        let raw: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&raw)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, RpcError> {
        self.call("eth_getLogs", filter.to_params()).await
    }
}
