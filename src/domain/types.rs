//! Session data model.

use std::fmt;

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Fixed-point scale of the confidential ledger. The protocol encodes every
/// confidential amount (balances as well as deposit/transfer/withdraw
/// arguments) at two decimals, independent of the token's own precision.
pub const PROTOCOL_FIXED_DECIMALS: u32 = 2;

pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;
pub const DEFAULT_TOKEN_SYMBOL: &str = "TKN";

/// Confidential-account keypair derived by the protocol client.
///
/// Lives in memory for the session only; wiped on drop, redacted in logs.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccountKeyMaterial {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for AccountKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKeyMaterial")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// The three balance views, formatted as decimal strings.
///
/// Fields refresh independently; a failed read keeps the previous value of
/// that field, so stale-but-present beats blanked-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub native: String,
    pub public: String,
    pub confidential: String,
}

impl Default for BalanceSnapshot {
    fn default() -> Self {
        Self {
            native: "0".to_string(),
            public: "0".to_string(),
            confidential: "0".to_string(),
        }
    }
}

/// Receipt of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub hash: String,
}

/// Decrypted confidential balance, in protocol fixed-point units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidentialBalance {
    pub amount: U256,
}

/// Result shape of the faucet funding action. Failures are reported in-band
/// rather than thrown, so a relay endpoint can serialize the outcome as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FaucetOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            hash: None,
            hashes: None,
            message: None,
            error: Some(error.into()),
        }
    }
}
