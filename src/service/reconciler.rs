//! Balance reconciliation.
//!
//! Produces the three-way balance snapshot. Each read is independently
//! fault-tolerant: a failure is logged and the previous value of that field
//! survives the pass, so one flaky endpoint never blanks out the rest of
//! the view.

use std::sync::Arc;

use ethers::types::Address;

use crate::{
    domain::types::{AccountKeyMaterial, BalanceSnapshot, PROTOCOL_FIXED_DECIMALS},
    infrastructure::rpc_client::RpcClient,
    service::{protocol::ConfidentialClient, wallet::SigningCapability},
    utils::amount,
};

pub struct BalanceReconciler {
    rpc: Arc<RpcClient>,
}

impl BalanceReconciler {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    /// Merge a fresh read over `prev`. The native read always runs; the
    /// token reads need a protocol client and derived key material.
    pub async fn refresh(
        &self,
        client: Option<&dyn ConfidentialClient>,
        keys: Option<&AccountKeyMaterial>,
        signer: &SigningCapability,
        token: Address,
        token_decimals: u8,
        prev: &BalanceSnapshot,
    ) -> BalanceSnapshot {
        let mut next = prev.clone();
        let address = signer.address();

        match self.rpc.get_native_balance(address).await {
            Ok(wei) => next.native = amount::from_wei(wei),
            Err(err) => {
                tracing::warn!(error = ?err, address = %address, "Failed to fetch native balance");
            }
        }

        let (Some(client), Some(keys)) = (client, keys) else {
            return next;
        };

        match client.public_balance(address, token).await {
            Ok(units) => next.public = amount::from_units(units, token_decimals as u32),
            Err(err) => {
                tracing::warn!(error = ?err, address = %address, "Failed to fetch public token balance");
            }
        }

        match client
            .confidential_balance(address, &keys.private_key, token)
            .await
        {
            Ok(balance) => {
                next.confidential = amount::from_units(balance.amount, PROTOCOL_FIXED_DECIMALS);
            }
            Err(err) => {
                tracing::warn!(error = ?err, address = %address, "Failed to fetch confidential balance");
            }
        }

        next
    }
}
