//! Faucet relay.
//!
//! Funds a requesting address with a small token amount, plus a native
//! top-up when the recipient is low on gas, using sequential nonces from
//! the relay wallet. Failures are reported in-band as a `FaucetOutcome`
//! so the HTTP surface can serialize them directly.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};

use crate::{
    config::FaucetConfig,
    domain::chain_config::ChainConfig,
    domain::types::{FaucetOutcome, DEFAULT_TOKEN_DECIMALS},
    infrastructure::rpc_client::RpcClient,
    utils::amount,
};

/// Funding collaborator consumed by the session engine.
#[async_trait]
pub trait FaucetAction: Send + Sync {
    async fn send_faucet(&self, recipient: Address) -> FaucetOutcome;
}

pub struct FaucetService {
    rpc: RpcClient,
    relay: SignerMiddleware<Provider<Http>, LocalWallet>,
    token: Address,
    config: FaucetConfig,
}

impl FaucetService {
    pub fn new(config: FaucetConfig, chain: &ChainConfig) -> Result<Self> {
        let key = config
            .private_key
            .as_deref()
            .context("Faucet private key not configured")?;
        let wallet: LocalWallet = key.parse().context("Invalid faucet private key")?;
        let wallet = wallet.with_chain_id(chain.chain_id);

        let provider =
            Provider::<Http>::try_from(chain.rpc_url.as_str()).context("Invalid RPC URL")?;

        Ok(Self {
            rpc: RpcClient::new(&chain.rpc_url),
            relay: SignerMiddleware::new(provider, wallet),
            token: chain.token_address,
            config,
        })
    }

    fn faucet_address(&self) -> Address {
        self.relay.signer().address()
    }

    async fn run(&self, recipient: Address) -> Result<FaucetOutcome> {
        let decimals = self
            .rpc
            .erc20_decimals(self.token)
            .await
            .unwrap_or(DEFAULT_TOKEN_DECIMALS);
        let token_amount = amount::to_units(&self.config.token_amount, decimals as u32)?;

        let faucet_token_balance = self
            .rpc
            .erc20_balance(self.token, self.faucet_address())
            .await
            .context("Failed to read faucet token balance")?;
        if faucet_token_balance < token_amount {
            return Ok(FaucetOutcome::failure(format!(
                "Faucet has insufficient tokens. Has {}, needs {}",
                amount::from_units(faucet_token_balance, decimals as u32),
                self.config.token_amount
            )));
        }

        let mut nonce = self
            .rpc
            .get_transaction_count(self.faucet_address())
            .await
            .context("Failed to read faucet nonce")?;
        let mut hashes: Vec<String> = Vec::new();

        let tx = TransactionRequest::new()
            .to(self.token)
            .data(erc20_transfer_calldata(recipient, token_amount))
            .gas(self.config.gas_limit)
            .nonce(nonce);
        let pending = self
            .relay
            .send_transaction(tx, None)
            .await
            .context("Failed to broadcast token transfer")?;
        let token_hash: H256 = *pending;
        pending.await.context("Token transfer was dropped")?;
        hashes.push(format!("{token_hash:#x}"));
        nonce += 1;

        tracing::info!(
            recipient = ?recipient,
            tx_hash = %format!("{token_hash:#x}"),
            amount = %self.config.token_amount,
            "Faucet token transfer sent"
        );

        // Top up gas for recipients that could not pay for their next
        // transaction otherwise.
        let threshold = amount::to_units(&self.config.native_threshold, 18)?;
        let recipient_native = self
            .rpc
            .get_native_balance(recipient)
            .await
            .context("Failed to read recipient native balance")?;
        if recipient_native < threshold {
            let topup = amount::to_units(&self.config.native_topup, 18)?;
            let faucet_native = self
                .rpc
                .get_native_balance(self.faucet_address())
                .await
                .context("Failed to read faucet native balance")?;
            if faucet_native >= topup {
                let tx = TransactionRequest::new()
                    .to(recipient)
                    .value(topup)
                    .nonce(nonce);
                let pending = self
                    .relay
                    .send_transaction(tx, None)
                    .await
                    .context("Failed to broadcast native top-up")?;
                let native_hash: H256 = *pending;
                pending.await.context("Native top-up was dropped")?;
                hashes.push(format!("{native_hash:#x}"));

                tracing::info!(
                    recipient = ?recipient,
                    tx_hash = %format!("{native_hash:#x}"),
                    amount = %self.config.native_topup,
                    "Faucet native top-up sent"
                );
            }
        }

        let message = if hashes.len() > 1 {
            format!(
                "Sent {} tokens & {} native",
                self.config.token_amount, self.config.native_topup
            )
        } else {
            format!("Sent {} tokens", self.config.token_amount)
        };

        Ok(FaucetOutcome {
            success: true,
            hash: hashes.first().cloned(),
            hashes: Some(hashes),
            message: Some(message),
            error: None,
        })
    }
}

#[async_trait]
impl FaucetAction for FaucetService {
    async fn send_faucet(&self, recipient: Address) -> FaucetOutcome {
        match self.run(recipient).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = ?err, recipient = ?recipient, "Faucet request failed");
                FaucetOutcome::failure(format!("{err:#}"))
            }
        }
    }
}

/// `transfer(address,uint256)` calldata.
fn erc20_transfer_calldata(recipient: Address, amount: U256) -> Bytes {
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&[0xa9, 0x05, 0x9c, 0xbb]);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(recipient.as_bytes());
    let mut word = [0u8; 32];
    amount.to_big_endian(&mut word);
    data.extend_from_slice(&word);
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_calldata_layout() {
        let recipient: Address = "0x29E4fd434758b1677c10854Fa81C2fc496D76E62"
            .parse()
            .unwrap();
        let data = erc20_transfer_calldata(recipient, U256::from(2_500u64));

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], recipient.as_bytes());
        assert_eq!(U256::from_big_endian(&data[36..68]), U256::from(2_500u64));
    }

    #[test]
    fn test_service_requires_private_key() {
        let config = FaucetConfig {
            private_key: None,
            token_amount: "0.25".into(),
            native_topup: "0.001".into(),
            native_threshold: "0.001".into(),
            gas_limit: 100_000,
        };
        let chain = ChainConfig::from_env();
        assert!(FaucetService::new(config, &chain).is_err());
    }

    #[test]
    fn test_service_rejects_malformed_key() {
        let config = FaucetConfig {
            private_key: Some("not-a-key".into()),
            token_amount: "0.25".into(),
            native_topup: "0.001".into(),
            native_threshold: "0.001".into(),
            gas_limit: 100_000,
        };
        let chain = ChainConfig::from_env();
        assert!(FaucetService::new(config, &chain).is_err());
    }
}
