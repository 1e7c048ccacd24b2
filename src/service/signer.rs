//! Signer acquisition.
//!
//! Produces a [`SigningCapability`] for the current wallet/chain pair. All
//! failure paths suspend (no signer) rather than crash: a wallet that
//! refuses the network switch or a provider error simply leaves downstream
//! operations disabled until the next wallet or chain change.

use std::sync::Arc;

use crate::{
    domain::chain_config::ChainConfigStore,
    service::wallet::{SigningCapability, WalletProvider},
};

pub struct SignerAcquisition {
    wallets: Arc<dyn WalletProvider>,
    config: Arc<ChainConfigStore>,
}

impl SignerAcquisition {
    pub fn new(wallets: Arc<dyn WalletProvider>, config: Arc<ChainConfigStore>) -> Self {
        Self { wallets, config }
    }

    /// Try to produce a signer bound to the resolved address and the
    /// configured chain. Returns `None` when unauthenticated, when no
    /// handle matches the resolved address yet (picking an arbitrary one
    /// would sign as the wrong account), or when the wallet rejects the
    /// switch.
    pub async fn acquire(&self) -> Option<SigningCapability> {
        if !self.wallets.authenticated().await {
            return None;
        }

        let address = self.wallets.resolved_address().await?;
        let handles = self.wallets.wallet_handles().await;
        let handle = handles.into_iter().find(|h| h.address() == address)?;

        let chain_id = self.config.get().await.chain_id;
        if let Err(err) = handle.switch_chain(chain_id).await {
            tracing::warn!(
                error = ?err,
                chain_id,
                address = %address,
                "Wallet rejected network switch"
            );
            return None;
        }

        match handle.provider().await {
            Ok(provider) => {
                tracing::debug!(address = %address, chain_id, "Signer acquired");
                Some(SigningCapability::new(address, chain_id, provider))
            }
            Err(err) => {
                tracing::warn!(error = ?err, address = %address, "Failed to obtain wallet provider");
                None
            }
        }
    }
}
