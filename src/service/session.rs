//! Confidential balance session controller.
//!
//! One `ConfidentialSession` exists per connected wallet. It owns the whole
//! session state (signer, derived keys, balances, last transaction, current
//! error), serializes the four mutating operations through a single
//! in-flight permit, and reacts to engine events (wallet changed, chain
//! changed, config replaced) with idempotent handlers. `reset()` is the
//! explicit disconnect transition: no stale session carries over to a new
//! login.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{
    config::EngineTuning,
    domain::chain_config::{ChainConfig, ChainConfigStore},
    domain::types::{
        AccountKeyMaterial, BalanceSnapshot, TransactionResult, DEFAULT_TOKEN_DECIMALS,
        DEFAULT_TOKEN_SYMBOL, PROTOCOL_FIXED_DECIMALS,
    },
    error::{EngineError, EngineResult},
    error_map,
    infrastructure::{
        event_bus::{EngineEvent, EventBus, EventHandler},
        rpc_client::RpcClient,
    },
    service::{
        account_keys::AccountKeyManager,
        faucet_service::FaucetAction,
        protocol::{ConfidentialClient, ConfidentialClientFactory},
        reconciler::BalanceReconciler,
        signer::SignerAcquisition,
        wallet::{SigningCapability, WalletProvider},
    },
    utils::amount,
};

struct SessionState {
    signer: Option<SigningCapability>,
    client: Option<Arc<dyn ConfidentialClient>>,
    balances: BalanceSnapshot,
    last_tx_hash: Option<String>,
    error: Option<String>,
    token_symbol: String,
    token_decimals: u8,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            signer: None,
            client: None,
            balances: BalanceSnapshot::default(),
            last_tx_hash: None,
            error: None,
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            token_decimals: DEFAULT_TOKEN_DECIMALS,
        }
    }
}

/// Clears the shared busy flag when dropped, whatever path the operation
/// took out of scope.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct ConfidentialSession {
    weak: Weak<ConfidentialSession>,
    config_store: Arc<ChainConfigStore>,
    client_factory: Arc<dyn ConfidentialClientFactory>,
    faucet: Arc<dyn FaucetAction>,
    signer_acquisition: SignerAcquisition,
    keys: AccountKeyManager,
    wallets: Arc<dyn WalletProvider>,
    tuning: EngineTuning,
    rpc: RwLock<Arc<RpcClient>>,
    state: RwLock<SessionState>,
    busy: AtomicBool,
    op_guard: Mutex<()>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConfidentialSession {
    pub async fn new(
        config_store: Arc<ChainConfigStore>,
        wallets: Arc<dyn WalletProvider>,
        client_factory: Arc<dyn ConfidentialClientFactory>,
        faucet: Arc<dyn FaucetAction>,
        tuning: EngineTuning,
    ) -> Arc<Self> {
        let config = config_store.get().await;
        let rpc = Arc::new(RpcClient::new(&config.rpc_url));
        let client = Self::connect_client(client_factory.as_ref(), &config);

        let session = Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            config_store: config_store.clone(),
            client_factory,
            faucet,
            signer_acquisition: SignerAcquisition::new(wallets.clone(), config_store),
            keys: AccountKeyManager::new(),
            wallets,
            tuning,
            rpc: RwLock::new(rpc),
            state: RwLock::new(SessionState {
                client,
                ..SessionState::default()
            }),
            busy: AtomicBool::new(false),
            op_guard: Mutex::new(()),
            poll_task: Mutex::new(None),
        });

        session.spawn_token_metadata_refresh();
        session
    }

    fn connect_client(
        factory: &dyn ConfidentialClientFactory,
        config: &ChainConfig,
    ) -> Option<Arc<dyn ConfidentialClient>> {
        match factory.connect(config) {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::error!(error = ?err, "Failed to initialize protocol client");
                None
            }
        }
    }

    /// Subscribe this session's event handlers on `bus`.
    pub async fn attach(&self, bus: &EventBus) {
        bus.subscribe(Arc::new(SessionEventHandler {
            session: self.weak.clone(),
        }))
        .await;
    }

    // ---- accessors --------------------------------------------------------

    pub async fn config(&self) -> ChainConfig {
        self.config_store.get().await
    }

    pub async fn signer(&self) -> Option<SigningCapability> {
        self.state.read().await.signer.clone()
    }

    pub async fn user_keys(&self) -> Option<AccountKeyMaterial> {
        self.keys.cached().await
    }

    pub async fn balances(&self) -> BalanceSnapshot {
        self.state.read().await.balances.clone()
    }

    pub fn loading(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn last_tx_hash(&self) -> Option<String> {
        self.state.read().await.last_tx_hash.clone()
    }

    pub async fn token_symbol(&self) -> String {
        self.state.read().await.token_symbol.clone()
    }

    pub async fn token_decimals(&self) -> u8 {
        self.state.read().await.token_decimals
    }

    // ---- event handling ---------------------------------------------------

    pub async fn on_wallet_changed(&self) {
        if !self.wallets.authenticated().await {
            self.reset().await;
            return;
        }
        self.reacquire_signer().await;
    }

    pub async fn on_chain_changed(&self) {
        self.reacquire_signer().await;
    }

    pub async fn on_config_replaced(&self) {
        let config = self.config_store.get().await;
        *self.rpc.write().await = Arc::new(RpcClient::new(&config.rpc_url));

        let client = Self::connect_client(self.client_factory.as_ref(), &config);
        self.state.write().await.client = client;

        self.spawn_token_metadata_refresh();
        self.reacquire_signer().await;
    }

    /// Replace the active configuration and run the invalidation handler
    /// directly. External observers still need the bus notification; this
    /// is the in-process shortcut.
    pub async fn replace_config(&self, config: ChainConfig) {
        self.config_store.replace(config).await;
        self.on_config_replaced().await;
    }

    /// Explicit disconnect transition: clears signer, derived key material,
    /// balances, last transaction and error, and stops polling.
    pub async fn reset(&self) {
        self.stop_polling().await;
        self.keys.invalidate().await;

        let mut state = self.state.write().await;
        state.signer = None;
        state.balances = BalanceSnapshot::default();
        state.last_tx_hash = None;
        state.error = None;
        drop(state);

        self.busy.store(false, Ordering::SeqCst);
        tracing::info!("Session reset");
    }

    async fn reacquire_signer(&self) {
        match self.signer_acquisition.acquire().await {
            Some(signer) => {
                self.keys.invalidate_if_not(signer.address()).await;
                self.state.write().await.signer = Some(signer);
                self.start_polling().await;
                self.fetch_balances(true).await;
            }
            None => {
                // Suspended: no matching wallet for the resolved address, or
                // the switch was rejected. Keys survive until an explicit
                // disconnect.
                self.stop_polling().await;
                self.state.write().await.signer = None;
            }
        }
    }

    // ---- balances ---------------------------------------------------------

    /// Re-read the three balance views. `silent` suppresses the busy
    /// indicator and is used by background polling; a user-initiated
    /// refresh passes `false`. No-op without a signer.
    pub async fn fetch_balances(&self, silent: bool) {
        let (signer, client, token_decimals, prev) = {
            let state = self.state.read().await;
            let Some(signer) = state.signer.clone() else {
                return;
            };
            (
                signer,
                state.client.clone(),
                state.token_decimals,
                state.balances.clone(),
            )
        };

        let _busy = if silent {
            None
        } else {
            Some(BusyGuard::engage(&self.busy))
        };

        let keys = self.keys.cached().await;
        let token = self.config_store.get().await.token_address;
        let rpc = self.rpc.read().await.clone();

        let next = BalanceReconciler::new(rpc)
            .refresh(
                client.as_deref(),
                keys.as_ref(),
                &signer,
                token,
                token_decimals,
                &prev,
            )
            .await;

        // Concurrent refreshes race benignly: the last read to complete
        // sets the displayed snapshot.
        self.state.write().await.balances = next;
    }

    fn start_polling_task(&self) -> JoinHandle<()> {
        let weak = self.weak.clone();
        let period = Duration::from_secs(self.tuning.poll_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The initial fetch already ran; skip the immediate first tick.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(session) = weak.upgrade() else {
                    break;
                };
                if session.state.read().await.signer.is_none() {
                    break;
                }
                session.fetch_balances(true).await;
            }
        })
    }

    async fn start_polling(&self) {
        let mut slot = self.poll_task.lock().await;
        if let Some(task) = slot.take() {
            task.abort();
        }
        *slot = Some(self.start_polling_task());
    }

    async fn stop_polling(&self) {
        if let Some(task) = self.poll_task.lock().await.take() {
            task.abort();
        }
    }

    fn spawn_token_metadata_refresh(&self) {
        let weak = self.weak.clone();
        tokio::spawn(async move {
            if let Some(session) = weak.upgrade() {
                session.refresh_token_metadata().await;
            }
        });
    }

    async fn refresh_token_metadata(&self) {
        let config = self.config_store.get().await;
        let rpc = self.rpc.read().await.clone();

        let (symbol, decimals) = futures::join!(
            rpc.erc20_symbol(config.token_address),
            rpc.erc20_decimals(config.token_address)
        );

        let symbol = symbol.unwrap_or_else(|err| {
            tracing::warn!(error = ?err, token = ?config.token_address, "Failed to fetch token symbol");
            DEFAULT_TOKEN_SYMBOL.to_string()
        });
        let decimals = decimals.unwrap_or_else(|err| {
            tracing::warn!(error = ?err, token = ?config.token_address, "Failed to fetch token decimals");
            DEFAULT_TOKEN_DECIMALS
        });

        let mut state = self.state.write().await;
        state.token_symbol = symbol;
        state.token_decimals = decimals;
    }

    // ---- account ----------------------------------------------------------

    /// Create or retrieve the confidential-account keypair. Idempotent per
    /// signer; at most one external derivation call happens between signer
    /// changes.
    pub async fn ensure_account(&self) -> EngineResult<AccountKeyMaterial> {
        let (client, signer) = self.require_ready().await?;

        let _busy = BusyGuard::engage(&self.busy);
        self.state.write().await.error = None;

        match self.keys.ensure(client.as_ref(), &signer).await {
            Ok(material) => Ok(material),
            Err(err) => Err(self.store_failure(err).await),
        }
    }

    // ---- mutating operations ----------------------------------------------

    /// Move `amount` of public token balance into the confidential ledger.
    pub async fn confidential_deposit(&self, amount: &str) -> EngineResult<TransactionResult> {
        let (client, signer) = self.require_ready().await?;
        let _permit = self.begin_operation()?;
        let _busy = BusyGuard::engage(&self.busy);
        self.state.write().await.error = None;

        let token = self.config_store.get().await.token_address;
        let result = async {
            let units = amount::to_units(amount, PROTOCOL_FIXED_DECIMALS)?;
            client.confidential_deposit(&signer, token, units).await
        }
        .await;

        self.finish_mutation("confidential_deposit", result).await
    }

    /// Transfer confidential balance to `recipient`.
    pub async fn confidential_transfer(
        &self,
        recipient: &str,
        amount: &str,
    ) -> EngineResult<TransactionResult> {
        let (client, signer) = self.require_ready().await?;
        let _permit = self.begin_operation()?;
        let _busy = BusyGuard::engage(&self.busy);
        self.state.write().await.error = None;

        let token = self.config_store.get().await.token_address;
        let result = async {
            let recipient: Address = recipient
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid recipient address"))?;
            let units = amount::to_units(amount, PROTOCOL_FIXED_DECIMALS)?;
            client
                .confidential_transfer(&signer, recipient, token, units)
                .await
        }
        .await;

        self.finish_mutation("confidential_transfer", result).await
    }

    /// Move confidential balance back out to the public token balance.
    pub async fn withdraw(&self, amount: &str) -> EngineResult<TransactionResult> {
        let (client, signer) = self.require_ready().await?;
        let _permit = self.begin_operation()?;
        let _busy = BusyGuard::engage(&self.busy);
        self.state.write().await.error = None;

        let token = self.config_store.get().await.token_address;
        let result = async {
            let units = amount::to_units(amount, PROTOCOL_FIXED_DECIMALS)?;
            client.withdraw(&signer, token, units).await
        }
        .await;

        self.finish_mutation("withdraw", result).await
    }

    /// Ask the faucet collaborator to fund the signer's address.
    pub async fn request_faucet(&self) -> EngineResult<TransactionResult> {
        let signer = self
            .state
            .read()
            .await
            .signer
            .clone()
            .ok_or(EngineError::NotInitialized)?;
        let _permit = self.begin_operation()?;
        let _busy = BusyGuard::engage(&self.busy);
        self.state.write().await.error = None;

        let outcome = self.faucet.send_faucet(signer.address()).await;
        let result = if outcome.success {
            match outcome.hash {
                Some(hash) => Ok(TransactionResult { hash }),
                None => Err(anyhow::anyhow!("Faucet returned no transaction hash")),
            }
        } else {
            Err(anyhow::anyhow!(outcome
                .error
                .unwrap_or_else(|| "Faucet request failed".to_string())))
        };

        self.finish_mutation("request_faucet", result).await
    }

    // ---- operation plumbing -----------------------------------------------

    async fn require_ready(&self) -> EngineResult<(Arc<dyn ConfidentialClient>, SigningCapability)> {
        let state = self.state.read().await;
        match (&state.client, &state.signer) {
            (Some(client), Some(signer)) => Ok((client.clone(), signer.clone())),
            _ => Err(EngineError::NotInitialized),
        }
    }

    fn begin_operation(&self) -> EngineResult<tokio::sync::MutexGuard<'_, ()>> {
        self.op_guard
            .try_lock()
            .map_err(|_| EngineError::OperationInProgress)
    }

    async fn finish_mutation(
        &self,
        operation: &'static str,
        result: Result<TransactionResult>,
    ) -> EngineResult<TransactionResult> {
        match result {
            Ok(receipt) => {
                tracing::info!(operation, tx_hash = %receipt.hash, "Operation submitted");
                self.schedule_reconciliation();
                self.state.write().await.last_tx_hash = Some(receipt.hash.clone());
                Ok(receipt)
            }
            Err(err) => {
                tracing::error!(operation, error = ?err, "Operation failed");
                Err(self.store_failure(err).await)
            }
        }
    }

    async fn store_failure(&self, err: anyhow::Error) -> EngineError {
        let normalized = error_map::normalize(&format!("{err:#}"));
        self.state.write().await.error = Some(normalized.message.clone());
        EngineError::Operation(normalized)
    }

    /// Re-read balances shortly after a transaction, without blocking the
    /// caller, to absorb indexing lag.
    fn schedule_reconciliation(&self) {
        let weak = self.weak.clone();
        let delay = Duration::from_millis(self.tuning.reconcile_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = weak.upgrade() {
                session.fetch_balances(true).await;
            }
        });
    }
}

struct SessionEventHandler {
    session: Weak<ConfidentialSession>,
}

#[async_trait]
impl EventHandler for SessionEventHandler {
    async fn handle(&self, event: &EngineEvent) -> Result<()> {
        let Some(session) = self.session.upgrade() else {
            return Ok(());
        };
        match event {
            EngineEvent::WalletChanged => session.on_wallet_changed().await,
            EngineEvent::ChainChanged { .. } => session.on_chain_changed().await,
            EngineEvent::ConfigReplaced => session.on_config_replaced().await,
        }
        Ok(())
    }

    fn event_kinds(&self) -> Vec<&'static str> {
        vec!["wallet_changed", "chain_changed", "config_replaced"]
    }
}
