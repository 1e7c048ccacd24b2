//! Domain module
//!
//! Core session data model and the active chain configuration.

pub mod chain_config;
pub mod types;

pub use chain_config::{ChainConfig, ChainConfigStore};
pub use types::{
    AccountKeyMaterial, BalanceSnapshot, ConfidentialBalance, FaucetOutcome, TransactionResult,
};
