//! Configuration management.
//! Loads from environment variables, optionally merged from a TOML file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::chain_config::ChainConfig;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "ChainConfig::from_env")]
    pub chain: ChainConfig,
    #[serde(default)]
    pub faucet: FaucetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineTuning,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Faucet relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// Hot-wallet key of the faucet. Unset disables the relay.
    pub private_key: Option<String>,
    /// Token amount sent per request, as a decimal string.
    pub token_amount: String,
    /// Native amount topped up when the recipient is low on gas.
    pub native_topup: String,
    /// Recipients below this native balance also get the top-up.
    pub native_threshold: String,
    pub gas_limit: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// Engine timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineTuning {
    /// Background balance-poll period while a signer exists.
    pub poll_interval_secs: u64,
    /// Delay before the post-transaction balance re-read, absorbing
    /// indexing lag.
    pub reconcile_delay_ms: u64,
}

/// Faucet relay HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            private_key: std::env::var("FAUCET_PRIVATE_KEY")
                .or_else(|_| std::env::var("PRIVATE_KEY"))
                .ok(),
            token_amount: std::env::var("FAUCET_TOKEN_AMOUNT").unwrap_or_else(|_| "0.25".into()),
            native_topup: std::env::var("FAUCET_NATIVE_TOPUP").unwrap_or_else(|_| "0.001".into()),
            native_threshold: std::env::var("FAUCET_NATIVE_THRESHOLD")
                .unwrap_or_else(|_| "0.001".into()),
            gas_limit: std::env::var("FAUCET_GAS_LIMIT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(100_000),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(10),
            reconcile_delay_ms: std::env::var("RECONCILE_DELAY_MS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(2_000),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8088".into()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            chain: ChainConfig::from_env(),
            faucet: FaucetConfig::default(),
            logging: LoggingConfig::default(),
            engine: EngineTuning::default(),
            server: ServerConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// Environment first, then an optional file overriding it.
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env();

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain.rpc_url.trim().is_empty() {
            anyhow::bail!("chain.rpc_url must not be empty");
        }
        if self.chain.chain_id == 0 {
            anyhow::bail!("chain.chain_id must be a positive integer");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("logging.level must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("logging.format must be 'json' or 'text'");
        }

        if self.engine.poll_interval_secs == 0 {
            anyhow::bail!("engine.poll_interval_secs must be positive");
        }

        Ok(())
    }
}
