//! Confidential-transfer protocol seam.
//!
//! Proof generation, encrypted-balance encoding and the on-chain calls are
//! owned by an external SDK; the engine only drives it through this trait.
//! Confidential amounts cross this boundary in protocol fixed-point units
//! (2 decimals), not token units.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};

use crate::{
    domain::chain_config::ChainConfig,
    domain::types::{AccountKeyMaterial, ConfidentialBalance, TransactionResult},
    service::wallet::SigningCapability,
};

#[async_trait]
pub trait ConfidentialClient: Send + Sync {
    /// Create or retrieve the caller's confidential account keypair.
    async fn ensure_account(&self, signer: &SigningCapability) -> Result<AccountKeyMaterial>;

    async fn public_balance(&self, address: Address, token: Address) -> Result<U256>;

    async fn confidential_balance(
        &self,
        address: Address,
        private_key: &str,
        token: Address,
    ) -> Result<ConfidentialBalance>;

    async fn confidential_deposit(
        &self,
        signer: &SigningCapability,
        token: Address,
        amount: U256,
    ) -> Result<TransactionResult>;

    async fn confidential_transfer(
        &self,
        signer: &SigningCapability,
        recipient: Address,
        token: Address,
        amount: U256,
    ) -> Result<TransactionResult>;

    async fn withdraw(
        &self,
        signer: &SigningCapability,
        token: Address,
        amount: U256,
    ) -> Result<TransactionResult>;
}

/// Builds a protocol client bound to one configuration. The session calls
/// this again whenever the configuration is replaced, so a client never
/// outlives the endpoint and chain it was constructed for.
pub trait ConfidentialClientFactory: Send + Sync {
    fn connect(&self, config: &ChainConfig) -> Result<Arc<dyn ConfidentialClient>>;
}
