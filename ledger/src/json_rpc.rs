//! Ethereum JSON-RPC ledger client.
//!
//! A batch is sent as one HTTP POST whose body is a JSON-RPC 2.0 batch of
//! `eth_call` requests. The request `id` is the call's position in the batch,
//! which is how responses (possibly reordered by the node) are matched back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::abi::encode_call_data;
use crate::{CallError, CallOutcome, LedgerCall, LedgerClient, LedgerError};

/// Default timeout for a whole batch request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-RPC error code geth and most providers use for reverted calls.
const EXECUTION_REVERTED: i64 = 3;

/// Client for a JSON-RPC endpoint of the chain hosting the Governor.
pub struct JsonRpcLedger {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    rpc_url: String,
    block_tag: String,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (EthCallParams, &'a str),
}

#[derive(Serialize)]
struct EthCallParams {
    to: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl JsonRpcLedger {
    /// Create a client with default timeout settings, reading at `latest`.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self::with_timeout(rpc_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(rpc_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            rpc_url: rpc_url.into(),
            block_tag: "latest".to_string(),
        }
    }

    /// Read at a different block tag (`"safe"`, `"finalized"`, a hex number).
    pub fn at_block(mut self, block_tag: impl Into<String>) -> Self {
        self.block_tag = block_tag.into();
        self
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn batch_read(&self, calls: &[LedgerCall]) -> Result<Vec<CallOutcome>, LedgerError> {
        let mut outcomes: Vec<Option<CallOutcome>> = vec![None; calls.len()];
        let mut requests = Vec::with_capacity(calls.len());

        for (index, call) in calls.iter().enumerate() {
            match encode_call_data(call) {
                Ok(data) => requests.push(JsonRpcRequest {
                    jsonrpc: "2.0",
                    id: index as u64,
                    method: "eth_call",
                    params: (
                        EthCallParams {
                            to: call.contract.to_string(),
                            data: format!("0x{}", hex::encode(data)),
                        },
                        self.block_tag.as_str(),
                    ),
                }),
                Err(e) => outcomes[index] = Some(Err(e)),
            }
        }

        if requests.is_empty() {
            return Ok(outcomes.into_iter().flatten().collect());
        }

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&requests)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Unreachable(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    LedgerError::Unreachable(format!("connection failed: {e}"))
                } else {
                    LedgerError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(LedgerError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            LedgerError::InvalidResponse(format!("failed to parse batch response: {e}"))
        })?;

        collect_outcomes(body, outcomes)
    }
}

/// Match a batch response body back onto the pending call slots.
///
/// Slots already filled (calls that failed to encode) are left alone; slots
/// the node never answered become [`CallError::MissingResponse`].
fn collect_outcomes(
    body: Value,
    mut outcomes: Vec<Option<CallOutcome>>,
) -> Result<Vec<CallOutcome>, LedgerError> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(_) => {
            // Some endpoints answer an unsupported batch with a single error.
            let single: JsonRpcResponse = serde_json::from_value(body)
                .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
            return Err(match single.error {
                Some(err) => LedgerError::Rpc {
                    code: err.code,
                    message: err.message,
                },
                None => LedgerError::InvalidResponse("expected a batch (JSON array)".into()),
            });
        }
        other => {
            return Err(LedgerError::InvalidResponse(format!(
                "unexpected response body: {other}"
            )))
        }
    };

    for entry in entries {
        let response: JsonRpcResponse = serde_json::from_value(entry)
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        let Some(index) = response.id.as_u64().map(|i| i as usize) else {
            tracing::debug!(id = %response.id, "ignoring batch response without numeric id");
            continue;
        };
        match outcomes.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(call_outcome(response)),
            _ => tracing::debug!(index, "ignoring unexpected or duplicate batch response"),
        }
    }

    Ok(outcomes
        .into_iter()
        .map(|slot| slot.unwrap_or(Err(CallError::MissingResponse)))
        .collect())
}

fn call_outcome(response: JsonRpcResponse) -> CallOutcome {
    if let Some(err) = response.error {
        let reverted =
            err.code == EXECUTION_REVERTED || err.message.to_lowercase().contains("revert");
        return Err(if reverted {
            let detail = match err.data {
                Some(Value::String(data)) => format!("{} ({data})", err.message),
                _ => err.message,
            };
            CallError::Reverted(detail)
        } else {
            CallError::Rpc {
                code: err.code,
                message: err.message,
            }
        });
    }

    let result = response.result.ok_or(CallError::MissingResponse)?;
    let digits = result.strip_prefix("0x").unwrap_or(&result);
    hex::decode(digits).map_err(|e| CallError::InvalidReturnData(e.to_string()))
}
