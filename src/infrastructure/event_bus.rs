//! Engine event notifications.
//!
//! State changes that used to be implicit (a wallet connecting, the active
//! chain moving, the configuration being swapped) are published as explicit
//! events; interested components subscribe idempotent handlers. Dispatch is
//! inline and awaited, so a publisher returns only after every handler ran.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Well-defined state-change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The wallet set or the authenticated account changed, including
    /// disconnects.
    WalletChanged,
    /// The wallet's active chain moved.
    ChainChanged { chain_id: u64 },
    /// The active [`ChainConfig`](crate::domain::chain_config::ChainConfig)
    /// was replaced.
    ConfigReplaced,
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::WalletChanged => "wallet_changed",
            EngineEvent::ChainChanged { .. } => "chain_changed",
            EngineEvent::ConfigReplaced => "config_replaced",
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &EngineEvent) -> Result<()>;
    fn event_kinds(&self) -> Vec<&'static str>;
}

/// In-memory publish/subscribe bus.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    pub async fn publish(&self, event: EngineEvent) {
        let handlers = self.handlers.read().await.clone();
        for handler in handlers {
            if !handler.event_kinds().contains(&event.kind()) {
                continue;
            }
            if let Err(err) = handler.handle(&event).await {
                tracing::error!(error = ?err, event = ?event, "Event handler failed");
            }
        }
    }
}
