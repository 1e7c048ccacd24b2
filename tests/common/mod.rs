//! Shared test doubles for the session engine: an in-memory wallet
//! provider, a scriptable protocol client and a scriptable faucet.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use tokio::sync::{Mutex, RwLock};

use veilcore::{
    config::EngineTuning,
    domain::chain_config::{ChainConfig, ChainConfigStore},
    domain::types::{
        AccountKeyMaterial, ConfidentialBalance, FaucetOutcome, TransactionResult,
    },
    infrastructure::event_bus::{EngineEvent, EventBus},
    service::faucet_service::FaucetAction,
    service::protocol::{ConfidentialClient, ConfidentialClientFactory},
    service::session::ConfidentialSession,
    service::wallet::{Eip1193Provider, WalletHandle, WalletProvider},
};

pub const TEST_CHAIN_ID: u64 = 2201;

pub fn user_address() -> Address {
    Address::repeat_byte(0x11)
}

pub fn test_chain_config() -> ChainConfig {
    ChainConfig::new(
        // closed local port: reads fail fast, which is what the engine must
        // tolerate anyway
        "http://127.0.0.1:9",
        Some(Address::repeat_byte(0xc0)),
        Address::repeat_byte(0x70),
        "https://scan.example/tx/",
        TEST_CHAIN_ID,
    )
    .expect("test config is valid")
}

// ---- wallet doubles -------------------------------------------------------

pub struct NullProvider;

#[async_trait]
impl Eip1193Provider for NullProvider {
    async fn request(&self, _method: &str, _params: serde_json::Value) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}

pub struct MockWalletHandle {
    address: Address,
    pub switch_calls: AtomicU32,
    pub last_chain: AtomicU64,
    pub reject_switch: AtomicBool,
}

impl MockWalletHandle {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            switch_calls: AtomicU32::new(0),
            last_chain: AtomicU64::new(0),
            reject_switch: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl WalletHandle for MockWalletHandle {
    fn address(&self) -> Address {
        self.address
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        self.last_chain.store(chain_id, Ordering::SeqCst);
        if self.reject_switch.load(Ordering::SeqCst) {
            anyhow::bail!("User rejected the request");
        }
        Ok(())
    }

    async fn provider(&self) -> Result<Arc<dyn Eip1193Provider>> {
        Ok(Arc::new(NullProvider))
    }
}

#[derive(Default)]
pub struct MockWalletProvider {
    authenticated: AtomicBool,
    address: RwLock<Option<Address>>,
    handles: RwLock<Vec<Arc<dyn WalletHandle>>>,
}

impl MockWalletProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, address: Address, handle: Arc<MockWalletHandle>) {
        self.authenticated.store(true, Ordering::SeqCst);
        *self.address.write().await = Some(address);
        *self.handles.write().await = vec![handle as Arc<dyn WalletHandle>];
    }

    pub async fn set_handles(&self, handles: Vec<Arc<dyn WalletHandle>>) {
        *self.handles.write().await = handles;
    }

    pub async fn disconnect(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
        *self.address.write().await = None;
        self.handles.write().await.clear();
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn resolved_address(&self) -> Option<Address> {
        *self.address.read().await
    }

    async fn wallet_handles(&self) -> Vec<Arc<dyn WalletHandle>> {
        self.handles.read().await.clone()
    }
}

// ---- protocol client double -----------------------------------------------

pub struct MockProtocolClient {
    pub derive_calls: AtomicU32,
    pub fail_ensure: AtomicBool,
    pub public_units: RwLock<U256>,
    pub fail_public: AtomicBool,
    pub confidential_units: RwLock<U256>,
    pub fail_confidential: AtomicBool,
    pub next_hash: RwLock<String>,
    pub fail_mutation: RwLock<Option<String>>,
    pub mutation_delay: RwLock<Option<Duration>>,
    pub last_deposit: Mutex<Option<(Address, U256)>>,
    pub last_transfer: Mutex<Option<(Address, Address, U256)>>,
    pub last_withdraw: Mutex<Option<(Address, U256)>>,
}

impl MockProtocolClient {
    pub fn new() -> Self {
        Self {
            derive_calls: AtomicU32::new(0),
            fail_ensure: AtomicBool::new(false),
            public_units: RwLock::new(U256::zero()),
            fail_public: AtomicBool::new(false),
            confidential_units: RwLock::new(U256::zero()),
            fail_confidential: AtomicBool::new(false),
            next_hash: RwLock::new("0xdefault".to_string()),
            fail_mutation: RwLock::new(None),
            mutation_delay: RwLock::new(None),
            last_deposit: Mutex::new(None),
            last_transfer: Mutex::new(None),
            last_withdraw: Mutex::new(None),
        }
    }

    async fn mutation_preamble(&self) -> Result<String> {
        if let Some(delay) = *self.mutation_delay.read().await {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.fail_mutation.read().await.clone() {
            anyhow::bail!(message);
        }
        Ok(self.next_hash.read().await.clone())
    }
}

#[async_trait]
impl ConfidentialClient for MockProtocolClient {
    async fn ensure_account(&self, signer: &veilcore::service::wallet::SigningCapability) -> Result<AccountKeyMaterial> {
        self.derive_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ensure.load(Ordering::SeqCst) {
            anyhow::bail!("key derivation failed");
        }
        Ok(AccountKeyMaterial {
            public_key: format!("pub-{:?}", signer.address()),
            private_key: format!("priv-{:?}", signer.address()),
        })
    }

    async fn public_balance(&self, _address: Address, _token: Address) -> Result<U256> {
        if self.fail_public.load(Ordering::SeqCst) {
            anyhow::bail!("public balance read failed");
        }
        Ok(*self.public_units.read().await)
    }

    async fn confidential_balance(
        &self,
        _address: Address,
        _private_key: &str,
        _token: Address,
    ) -> Result<ConfidentialBalance> {
        if self.fail_confidential.load(Ordering::SeqCst) {
            anyhow::bail!("confidential balance read failed");
        }
        Ok(ConfidentialBalance {
            amount: *self.confidential_units.read().await,
        })
    }

    async fn confidential_deposit(
        &self,
        _signer: &veilcore::service::wallet::SigningCapability,
        token: Address,
        amount: U256,
    ) -> Result<TransactionResult> {
        let hash = self.mutation_preamble().await?;
        *self.last_deposit.lock().await = Some((token, amount));
        Ok(TransactionResult { hash })
    }

    async fn confidential_transfer(
        &self,
        _signer: &veilcore::service::wallet::SigningCapability,
        recipient: Address,
        token: Address,
        amount: U256,
    ) -> Result<TransactionResult> {
        let hash = self.mutation_preamble().await?;
        *self.last_transfer.lock().await = Some((recipient, token, amount));
        Ok(TransactionResult { hash })
    }

    async fn withdraw(
        &self,
        _signer: &veilcore::service::wallet::SigningCapability,
        token: Address,
        amount: U256,
    ) -> Result<TransactionResult> {
        let hash = self.mutation_preamble().await?;
        *self.last_withdraw.lock().await = Some((token, amount));
        Ok(TransactionResult { hash })
    }
}

pub struct MockClientFactory {
    client: Arc<MockProtocolClient>,
    pub connects: AtomicU32,
}

impl MockClientFactory {
    pub fn new(client: Arc<MockProtocolClient>) -> Self {
        Self {
            client,
            connects: AtomicU32::new(0),
        }
    }
}

impl ConfidentialClientFactory for MockClientFactory {
    fn connect(
        &self,
        _config: &ChainConfig,
    ) -> Result<Arc<dyn ConfidentialClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.client.clone())
    }
}

// ---- faucet double --------------------------------------------------------

pub struct MockFaucet {
    pub outcome: RwLock<FaucetOutcome>,
    pub requests: Mutex<Vec<Address>>,
}

impl MockFaucet {
    pub fn new() -> Self {
        Self {
            outcome: RwLock::new(FaucetOutcome {
                success: true,
                hash: Some("0xfaucet".to_string()),
                hashes: Some(vec!["0xfaucet".to_string()]),
                message: Some("Sent 0.25 tokens".to_string()),
                error: None,
            }),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FaucetAction for MockFaucet {
    async fn send_faucet(&self, recipient: Address) -> FaucetOutcome {
        self.requests.lock().await.push(recipient);
        self.outcome.read().await.clone()
    }
}

// ---- harness --------------------------------------------------------------

pub struct Harness {
    pub session: Arc<ConfidentialSession>,
    pub bus: EventBus,
    pub store: Arc<ChainConfigStore>,
    pub wallets: Arc<MockWalletProvider>,
    pub client: Arc<MockProtocolClient>,
    pub factory: Arc<MockClientFactory>,
    pub faucet: Arc<MockFaucet>,
}

pub async fn harness() -> Harness {
    let store = Arc::new(ChainConfigStore::new(test_chain_config()));
    let wallets = Arc::new(MockWalletProvider::new());
    let client = Arc::new(MockProtocolClient::new());
    let factory = Arc::new(MockClientFactory::new(client.clone()));
    let faucet = Arc::new(MockFaucet::new());
    let tuning = EngineTuning {
        // polling must not fire on its own during tests
        poll_interval_secs: 3_600,
        reconcile_delay_ms: 50,
    };

    let session = ConfidentialSession::new(
        store.clone(),
        wallets.clone(),
        factory.clone(),
        faucet.clone(),
        tuning,
    )
    .await;

    let bus = EventBus::new();
    session.attach(&bus).await;

    Harness {
        session,
        bus,
        store,
        wallets,
        client,
        factory,
        faucet,
    }
}

impl Harness {
    /// Connect a wallet whose handle matches the resolved address and let
    /// the session pick it up.
    pub async fn connect_wallet(&self, address: Address) -> Arc<MockWalletHandle> {
        let handle = Arc::new(MockWalletHandle::new(address));
        self.wallets.connect(address, handle.clone()).await;
        self.bus.publish(EngineEvent::WalletChanged).await;
        handle
    }
}
