//! Wallet / provider boundary.
//!
//! [`Provider`] is the narrow interface behind which the wallet lives:
//! account list, network id, and contract-bound read (`call`) and write
//! (`send`) operations. The wallet signs and encodes; the client only ever
//! sees JSON values.
//!
//! [`HttpProvider`] is the JSON-RPC 2.0 implementation used when no wallet
//! bridge endpoint is configured, pointed at the fixed local development
//! endpoint. A `send` can be rejected by the human operator in the wallet
//! dialog; that surfaces as a handled [`ClientError::Transaction`], never a
//! panic, and nothing is retried automatically.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{ClientError, Result};
use crate::models::Address;

/// EIP-1193 code reported when the operator dismisses the wallet dialog.
const USER_REJECTED_CODE: i64 = 4001;

pub trait Provider {
    /// Accounts exposed by the wallet. Empty means no session is possible.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;

    /// Id of the network the wallet is connected to.
    fn network_id(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Read-only contract call; no state change, no signature.
    fn call(
        &self,
        contract: &Address,
        method: &str,
        args: Value,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// State-changing contract call signed by `from`; `value` attaches
    /// native currency. Resolves to the decoded receipt or fails on
    /// revert / user rejection.
    fn send(
        &self,
        from: &Address,
        contract: &Address,
        method: &str,
        args: Value,
        value: Option<u128>,
    ) -> impl Future<Output = Result<Value>> + Send;
}

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

// ─────────────────────────────────────────────────────────
// HTTP transport
// ─────────────────────────────────────────────────────────

pub struct HttpProvider {
    http: reqwest::Client,
    url: String,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(HttpProvider {
            http,
            url: url.into(),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        debug!("rpc -> {method}");

        let response = self
            .http
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        let body: RpcEnvelope = response.json().await?;

        if let Some(err) = body.error {
            if err.code == USER_REJECTED_CODE {
                return Err(ClientError::Transaction(
                    "rejected in the wallet dialog".to_string(),
                ));
            }
            return Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        body.result.ok_or_else(|| ClientError::Rpc {
            code: 0,
            message: format!("empty result from {method}"),
        })
    }
}

impl Provider for HttpProvider {
    async fn accounts(&self) -> Result<Vec<Address>> {
        let value = self.request("getAccounts", json!([])).await?;
        let raw: Vec<String> = serde_json::from_value(value)?;
        raw.iter().map(|s| Address::parse(s)).collect()
    }

    async fn network_id(&self) -> Result<u64> {
        let value = self.request("getNetworkId", json!([])).await?;
        decode_network_id(&value)
    }

    async fn call(&self, contract: &Address, method: &str, args: Value) -> Result<Value> {
        self.request(
            "contractCall",
            json!({ "to": contract, "method": method, "args": args }),
        )
        .await
    }

    async fn send(
        &self,
        from: &Address,
        contract: &Address,
        method: &str,
        args: Value,
        value: Option<u128>,
    ) -> Result<Value> {
        let mut params = json!({
            "from": from,
            "to": contract,
            "method": method,
            "args": args,
        });
        if let Some(v) = value {
            params["value"] = json!(v.to_string());
        }

        // A revert reaches us as an RPC error object; fold it into the
        // transaction taxonomy so callers treat it as a retryable form
        // failure rather than lost connectivity.
        match self.request("contractSend", params).await {
            Ok(receipt) => Ok(receipt),
            Err(ClientError::Rpc { code, message }) => Err(ClientError::Transaction(format!(
                "rpc {code}: {message}"
            ))),
            Err(other) => Err(other),
        }
    }
}

fn decode_network_id(value: &Value) -> Result<u64> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.parse::<u64>() {
            return Ok(n);
        }
    }
    Err(ClientError::Rpc {
        code: 0,
        message: format!("unexpected network id: {value}"),
    })
}
