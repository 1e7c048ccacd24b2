//! JSON-RPC read path.
//!
//! Raw `eth_*` queries against the configured endpoint: native balance,
//! transaction count and `eth_call` for ERC-20 metadata. Rebuilt whenever
//! the active configuration is replaced.

use std::time::Duration;

use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use serde_json::{json, Value};

// function selectors
const ERC20_BALANCE_OF: &str = "0x70a08231";
const ERC20_DECIMALS: &str = "0x313ce567";
const ERC20_SYMBOL: &str = "0x95d89b41";

pub struct RpcClient {
    http_client: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(rpc_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client: client,
            url: rpc_url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Failed to send RPC request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read RPC response body")?;

        if !status.is_success() {
            anyhow::bail!("RPC request failed with status {}: {}", status, body);
        }

        let json: Value =
            serde_json::from_str(&body).context("Failed to parse RPC response as JSON")?;

        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown RPC error");
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
            anyhow::bail!("RPC error {}: {}", code, message);
        }

        json.get("result")
            .cloned()
            .context("Missing result field in RPC response")
    }

    pub async fn get_native_balance(&self, address: Address) -> Result<U256> {
        let result = self
            .call("eth_getBalance", json!([address_hex(address), "latest"]))
            .await?;
        parse_quantity(&result)
    }

    pub async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        let result = self
            .call(
                "eth_getTransactionCount",
                json!([address_hex(address), "latest"]),
            )
            .await?;
        Ok(parse_quantity(&result)?.as_u64())
    }

    pub async fn eth_call(&self, to: Address, data: String) -> Result<String> {
        let result = self
            .call(
                "eth_call",
                json!([{"to": address_hex(to), "data": data}, "latest"]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_owned)
            .context("eth_call result is not a string")
    }

    pub async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let data = format!(
            "{}{:0>64}",
            ERC20_BALANCE_OF,
            hex::encode(owner.as_bytes())
        );
        let output = self.eth_call(token, data).await?;
        parse_hex_quantity(&output).context("Failed to parse ERC-20 balance")
    }

    pub async fn erc20_decimals(&self, token: Address) -> Result<u8> {
        let output = self.eth_call(token, ERC20_DECIMALS.to_string()).await?;
        let value = parse_hex_quantity(&output).context("Failed to parse ERC-20 decimals")?;
        if value > U256::from(u8::MAX) {
            anyhow::bail!("ERC-20 decimals out of range: {}", value);
        }
        Ok(value.as_u32() as u8)
    }

    pub async fn erc20_symbol(&self, token: Address) -> Result<String> {
        let output = self.eth_call(token, ERC20_SYMBOL.to_string()).await?;
        let bytes = hex::decode(output.trim_start_matches("0x"))
            .context("ERC-20 symbol response is not valid hex")?;
        decode_abi_string(&bytes).context("Failed to decode ERC-20 symbol")
    }
}

fn address_hex(address: Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

fn parse_quantity(result: &Value) -> Result<U256> {
    let hex_str = result.as_str().context("RPC result is not a string")?;
    parse_hex_quantity(hex_str)
}

fn parse_hex_quantity(hex_str: &str) -> Result<U256> {
    let digits = hex_str
        .strip_prefix("0x")
        .context("RPC quantity missing 0x prefix")?;
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16).context("RPC quantity is not valid hex")
}

/// Decode a solidity `string` return value (offset, length, utf8 bytes).
fn decode_abi_string(bytes: &[u8]) -> Result<String> {
    if bytes.len() < 64 {
        anyhow::bail!("ABI string response too short: {} bytes", bytes.len());
    }
    let length = U256::from_big_endian(&bytes[32..64]);
    if length > U256::from(bytes.len() - 64) {
        anyhow::bail!("ABI string length out of bounds: {}", length);
    }
    let length = length.as_usize();
    Ok(String::from_utf8_lossy(&bytes[64..64 + length]).into_owned())
}
