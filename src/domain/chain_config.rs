//! Active network configuration.
//!
//! One configuration is active at a time. Replacing it bumps an epoch
//! counter and must be followed by a `ConfigReplaced` notification on the
//! engine event bus so downstream components rebuild their RPC and protocol
//! clients instead of keeping stale ones bound to the old endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const DEFAULT_RPC_URL: &str = "https://rpc.testnet.stable.xyz";
const DEFAULT_CONTRACT_ADDRESS: &str = "0x29E4fd434758b1677c10854Fa81C2fc496D76E62";
const DEFAULT_TOKEN_ADDRESS: &str = "0x78Cf24370174180738C5B8E352B6D14c83a6c9A9";
const DEFAULT_EXPLORER_URL: &str = "https://testnet.stablescan.xyz/tx/";
const DEFAULT_CHAIN_ID: u64 = 2201;

/// Network parameters the engine runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Confidential-transfer registry contract; some deployments resolve it
    /// from the chain id instead.
    pub contract_address: Option<Address>,
    pub token_address: Address,
    pub explorer_url: String,
    pub chain_id: u64,
}

impl ChainConfig {
    /// Validated constructor. Only shape is checked here: a bad-but-present
    /// endpoint or address surfaces downstream as a connection failure,
    /// which is the caller's responsibility.
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: Option<Address>,
        token_address: Address,
        explorer_url: impl Into<String>,
        chain_id: u64,
    ) -> Result<Self> {
        let rpc_url = rpc_url.into();
        let explorer_url = explorer_url.into();
        if rpc_url.trim().is_empty() {
            anyhow::bail!("rpc_url must not be empty");
        }
        if explorer_url.trim().is_empty() {
            anyhow::bail!("explorer_url must not be empty");
        }
        if chain_id == 0 {
            anyhow::bail!("chain_id must be a positive integer");
        }
        Ok(Self {
            rpc_url,
            contract_address,
            token_address,
            explorer_url,
            chain_id,
        })
    }

    /// Build from environment variables, falling back to testnet defaults.
    pub fn from_env() -> Self {
        Self {
            rpc_url: std::env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.into()),
            contract_address: Some(env_address("CONTRACT_ADDRESS", DEFAULT_CONTRACT_ADDRESS)),
            token_address: env_address("TOKEN_ADDRESS", DEFAULT_TOKEN_ADDRESS),
            explorer_url: std::env::var("EXPLORER_URL")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_URL.into()),
            chain_id: std::env::var("CHAIN_ID")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_CHAIN_ID),
        }
    }

    /// Explorer link for a transaction hash.
    pub fn explorer_tx_url(&self, hash: &str) -> String {
        if self.explorer_url.ends_with('/') {
            format!("{}{}", self.explorer_url, hash)
        } else {
            format!("{}/{}", self.explorer_url, hash)
        }
    }
}

fn env_address(key: &str, fallback: &str) -> Address {
    let raw = std::env::var(key).unwrap_or_else(|_| fallback.to_string());
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, "Invalid address in environment, using default");
        fallback.parse().expect("default address is valid")
    })
}

/// Thread-safe holder of the active [`ChainConfig`].
pub struct ChainConfigStore {
    inner: RwLock<ChainConfig>,
    epoch: AtomicU64,
}

impl ChainConfigStore {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            inner: RwLock::new(config),
            epoch: AtomicU64::new(0),
        }
    }

    pub async fn get(&self) -> ChainConfig {
        self.inner.read().await.clone()
    }

    /// Swap the active configuration, returning the new epoch. Every replace
    /// is cache-invalidating for downstream components, whether or not the
    /// values actually changed.
    pub async fn replace(&self, config: ChainConfig) -> u64 {
        *self.inner.write().await = config;
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}
