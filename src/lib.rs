//! Veilcore - confidential balance session engine
//!
//! Orchestrates deposits, transfers and withdrawals between a public ERC-20
//! balance and an amount-hidden confidential ledger, against a browser-style
//! wallet and an external confidential-transfer protocol client.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod error_map;
pub mod infrastructure;
pub mod service;
pub mod utils;

pub use error::{EngineError, EngineResult};

pub mod prelude {
    pub use crate::{
        domain::{
            chain_config::{ChainConfig, ChainConfigStore},
            types::{AccountKeyMaterial, BalanceSnapshot, FaucetOutcome, TransactionResult},
        },
        error::{EngineError, EngineResult},
        service::session::ConfidentialSession,
    };
}
