//! JSON-RPC transport for the insurance registry contract.
//!
//! The contract exposes no "list all" call, only point reads by id, so the
//! mirror probes `getPolicy(uint256)` one id at a time over `eth_call`.
//! Writes go through `eth_sendTransaction` against the same contract from a
//! pre-configured unlocked account.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::codec;

/// A pending state-changing call: method name for logs, encoded call data,
/// and the native value to attach (premium on purchase, zero on settle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCall {
    pub method: &'static str,
    pub policy_id: u64,
    pub data: String,
    pub value: u128,
}

impl RegistryCall {
    pub fn purchase(policy_id: u64, premium: u128) -> Self {
        Self {
            method: "purchasePolicy",
            policy_id,
            data: codec::encode_call(codec::PURCHASE_POLICY, policy_id),
            value: premium,
        }
    }

    pub fn settle(policy_id: u64) -> Self {
        Self {
            method: "settle",
            policy_id,
            data: codec::encode_call(codec::SETTLE, policy_id),
            value: 0,
        }
    }
}

/// Seam between the mirror/dispatcher and the chain. Mocked in tests.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Raw ABI bytes of `getPolicy(id)`. Transport, timeout, and hex-decode
    /// failures all surface as `Err` and terminate the caller's scan.
    async fn get_policy_raw(&self, id: u64) -> Result<Vec<u8>>;

    /// Submit a state-changing call; returns the transaction hash. Success
    /// or failure of the state change itself is observed on the next poll.
    async fn submit(&self, call: RegistryCall) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<String>,
    error: Option<serde_json::Value>,
}

/// Reqwest-backed transport against a single RPC endpoint + contract address.
pub struct RpcRegistryClient {
    client: Client,
    rpc_url: String,
    contract_address: String,
    sender_address: Option<String>,
}

impl RpcRegistryClient {
    pub fn new(
        rpc_url: String,
        contract_address: String,
        sender_address: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        // Per-request timeout so one unresponsive id cannot stall a scan.
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            rpc_url,
            contract_address,
            sender_address,
        })
    }

    async fn rpc(&self, payload: serde_json::Value) -> Result<String> {
        let response: JsonRpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .context("RPC request failed")?
            .json()
            .await
            .context("failed to parse RPC response")?;

        if let Some(err) = response.error {
            return Err(anyhow::anyhow!("RPC error: {:?}", err));
        }

        response
            .result
            .ok_or_else(|| anyhow::anyhow!("no result in RPC response"))
    }
}

#[async_trait]
impl RegistryTransport for RpcRegistryClient {
    async fn get_policy_raw(&self, id: u64) -> Result<Vec<u8>> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [{
                "to": self.contract_address,
                "data": codec::encode_call(codec::GET_POLICY, id)
            }, "latest"],
            "id": 1
        });

        let result = self.rpc(payload).await?;

        hex::decode(result.trim_start_matches("0x")).context("failed to decode hex response")
    }

    async fn submit(&self, call: RegistryCall) -> Result<String> {
        let from = self
            .sender_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no sender address configured"))?;

        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_sendTransaction",
            "params": [{
                "from": from,
                "to": self.contract_address,
                "data": call.data,
                "value": format!("0x{:x}", call.value)
            }],
            "id": 1
        });

        let tx_hash = self.rpc(payload).await?;
        debug!(
            method = call.method,
            policy_id = call.policy_id,
            tx_hash = %tx_hash,
            "submission accepted by node"
        );
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_call_attaches_premium() {
        let call = RegistryCall::purchase(3, 42);
        assert_eq!(call.value, 42);
        assert!(call.data.starts_with("0xc1260c9a"));
        assert!(call.data.ends_with("03"));
    }

    #[test]
    fn settle_call_attaches_nothing() {
        let call = RegistryCall::settle(9);
        assert_eq!(call.value, 0);
        assert!(call.data.starts_with("0x8df82800"));
    }

    #[tokio::test]
    async fn client_creation() {
        let client = RpcRegistryClient::new(
            "http://127.0.0.1:8545".to_string(),
            "0xe4ee44a1703f3ed5b4aa58641a6ca0b2f4966a7c".to_string(),
            None,
            Duration::from_secs(10),
        );
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn submit_without_sender_fails_locally() {
        let client = RpcRegistryClient::new(
            "http://127.0.0.1:8545".to_string(),
            "0xe4ee44a1703f3ed5b4aa58641a6ca0b2f4966a7c".to_string(),
            None,
            Duration::from_secs(10),
        )
        .unwrap();

        let err = client.submit(RegistryCall::settle(1)).await.unwrap_err();
        assert!(err.to_string().contains("no sender address"));
    }
}
