//! Wallet provider seam.
//!
//! The identity/wallet provider lives outside the engine; these traits are
//! the contract it must satisfy. A provider yields an authentication state,
//! one resolved primary address and zero or more wallet handles; a handle
//! can switch its active network and hand out an EIP-1193-style request
//! transport.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;
use serde_json::Value;

/// Minimal EIP-1193 transport: one `request(method, params)` entry point.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value>;
}

/// One connected wallet account.
#[async_trait]
pub trait WalletHandle: Send + Sync {
    fn address(&self) -> Address;
    async fn switch_chain(&self, chain_id: u64) -> Result<()>;
    async fn provider(&self) -> Result<Arc<dyn Eip1193Provider>>;
}

/// The identity provider: authentication state plus available wallets.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn authenticated(&self) -> bool;
    async fn resolved_address(&self) -> Option<Address>;
    async fn wallet_handles(&self) -> Vec<Arc<dyn WalletHandle>>;
}

/// An authorization handle bound to exactly one address and one chain.
///
/// Never persisted; replaced whenever the wallet account or chain changes.
#[derive(Clone)]
pub struct SigningCapability {
    address: Address,
    chain_id: u64,
    provider: Arc<dyn Eip1193Provider>,
}

impl SigningCapability {
    pub fn new(address: Address, chain_id: u64, provider: Arc<dyn Eip1193Provider>) -> Self {
        Self {
            address,
            chain_id,
            provider,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> Arc<dyn Eip1193Provider> {
        self.provider.clone()
    }
}

impl fmt::Debug for SigningCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCapability")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
