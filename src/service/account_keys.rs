//! Confidential account key cache.
//!
//! Key material is derived once per signer through the protocol client and
//! then served from memory. A failed derivation leaves the cache empty; no
//! partial material is ever retained.

use anyhow::Result;
use ethers::types::Address;
use tokio::sync::RwLock;

use crate::{
    domain::types::AccountKeyMaterial,
    service::{protocol::ConfidentialClient, wallet::SigningCapability},
};

struct CachedKeys {
    owner: Address,
    material: AccountKeyMaterial,
}

#[derive(Default)]
pub struct AccountKeyManager {
    cache: RwLock<Option<CachedKeys>>,
}

impl AccountKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn cached(&self) -> Option<AccountKeyMaterial> {
        self.cache
            .read()
            .await
            .as_ref()
            .map(|cached| cached.material.clone())
    }

    /// Idempotent per signer: a cache hit skips the derivation call.
    pub async fn ensure(
        &self,
        client: &dyn ConfidentialClient,
        signer: &SigningCapability,
    ) -> Result<AccountKeyMaterial> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.owner == signer.address() {
                    return Ok(cached.material.clone());
                }
            }
        }

        let material = client.ensure_account(signer).await?;
        *self.cache.write().await = Some(CachedKeys {
            owner: signer.address(),
            material: material.clone(),
        });

        tracing::info!(address = %signer.address(), "Confidential account keys derived");
        Ok(material)
    }

    /// Drop all cached material.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Drop cached material unless it belongs to `owner`.
    pub async fn invalidate_if_not(&self, owner: Address) {
        let mut cache = self.cache.write().await;
        if cache.as_ref().is_some_and(|cached| cached.owner != owner) {
            *cache = None;
        }
    }
}
