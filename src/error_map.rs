//! Failure classification.
//!
//! Wallets, RPC endpoints and the protocol client all throw differently
//! shaped errors; the only reliable common denominator is the message text.
//! `normalize` pattern-matches that text into a small taxonomy with a
//! display string suitable for the session's `error` field.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Classified failure kind, derived from message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UserRejected,
    ExecutionReverted,
    InsufficientFunds,
    NetworkError,
    NonceTooLow,
    UnderpricedReplacement,
    CallException,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub category: ErrorCategory,
    pub message: String,
}

impl NormalizedError {
    fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Raw messages longer than this are assumed to be provider dumps and are
/// reduced to an embedded message or a generic fallback.
const MAX_RAW_MESSAGE_LEN: usize = 80;

static REVERT_REASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"execution reverted:\s*([^"]+)""#).expect("static regex"));

static EMBEDDED_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""message"\s*:\s*"([^"]+)""#).expect("static regex"));

/// Classify an arbitrary failure message.
pub fn normalize(raw: &str) -> NormalizedError {
    if raw.is_empty() {
        return NormalizedError::new(ErrorCategory::Unclassified, "An unknown error occurred.");
    }

    if raw.contains("User rejected")
        || raw.contains("Action rejected")
        || raw.contains("4001")
        || raw.contains("ACTION_REJECTED")
    {
        return NormalizedError::new(ErrorCategory::UserRejected, "User rejected the request.");
    }

    if raw.contains("execution reverted") {
        if let Some(reason) = REVERT_REASON
            .captures(raw)
            .and_then(|captures| captures.get(1))
        {
            return NormalizedError::new(
                ErrorCategory::ExecutionReverted,
                format!("Transaction failed: {}", reason.as_str()),
            );
        }
        return NormalizedError::new(
            ErrorCategory::ExecutionReverted,
            "Transaction failed: Execution reverted.",
        );
    }

    if raw.contains("insufficient funds") || raw.contains("exceeds balance") {
        return NormalizedError::new(
            ErrorCategory::InsufficientFunds,
            "Insufficient funds for gas or transaction.",
        );
    }

    if raw.contains("Internal JSON-RPC error") {
        return NormalizedError::new(
            ErrorCategory::NetworkError,
            "Internal network error. Please try again.",
        );
    }

    if raw.contains("Network Error") || raw.contains("connection refused") {
        return NormalizedError::new(
            ErrorCategory::NetworkError,
            "Network connection failed. Please check your internet.",
        );
    }

    if raw.contains("timeout") || raw.contains("timed out") {
        return NormalizedError::new(
            ErrorCategory::NetworkError,
            "Request timed out. Please try again.",
        );
    }

    if raw.contains("nonce too low") {
        return NormalizedError::new(
            ErrorCategory::NonceTooLow,
            "Transaction failed: Nonce too low. Please reset your wallet.",
        );
    }

    if raw.contains("replacement transaction underpriced") {
        return NormalizedError::new(
            ErrorCategory::UnderpricedReplacement,
            "Transaction failed: Replacement gas too low. Please increase gas.",
        );
    }

    if raw.contains("call revert exception") || raw.contains("CALL_EXCEPTION") {
        return NormalizedError::new(
            ErrorCategory::CallException,
            "Transaction failed: Contract execution reverted.",
        );
    }

    if raw.len() > MAX_RAW_MESSAGE_LEN {
        // Provider dumps are often stringified JSON with a usable message
        // buried inside.
        if let Some(inner) = EMBEDDED_MESSAGE
            .captures(raw)
            .and_then(|captures| captures.get(1))
        {
            let inner = inner.as_str();
            let message = if inner.chars().count() > MAX_RAW_MESSAGE_LEN {
                let head: String = inner.chars().take(MAX_RAW_MESSAGE_LEN - 3).collect();
                format!("{head}...")
            } else {
                inner.to_string()
            };
            return NormalizedError::new(ErrorCategory::Unclassified, message);
        }
        return NormalizedError::new(ErrorCategory::Unclassified, "An unexpected error occurred.");
    }

    NormalizedError::new(ErrorCategory::Unclassified, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejected_variants() {
        for raw in [
            "User rejected the request",
            "MetaMask Tx Signature: Action rejected by user",
            "error code 4001",
            "ACTION_REJECTED",
        ] {
            let normalized = normalize(raw);
            assert_eq!(normalized.category, ErrorCategory::UserRejected);
            assert_eq!(normalized.message, "User rejected the request.");
        }
    }

    #[test]
    fn test_revert_reason_extracted() {
        let raw = r#"processing response error: {"error": "execution reverted: Insufficient confidential balance"}"#;
        let normalized = normalize(raw);
        assert_eq!(normalized.category, ErrorCategory::ExecutionReverted);
        assert_eq!(
            normalized.message,
            "Transaction failed: Insufficient confidential balance"
        );
    }

    #[test]
    fn test_revert_without_reason() {
        let normalized = normalize("execution reverted");
        assert_eq!(normalized.category, ErrorCategory::ExecutionReverted);
        assert_eq!(normalized.message, "Transaction failed: Execution reverted.");
    }

    #[test]
    fn test_insufficient_funds() {
        let normalized = normalize("err: insufficient funds for gas * price + value");
        assert_eq!(normalized.category, ErrorCategory::InsufficientFunds);
    }

    #[test]
    fn test_network_categories() {
        assert_eq!(
            normalize("Internal JSON-RPC error.").category,
            ErrorCategory::NetworkError
        );
        assert_eq!(
            normalize("connection refused").category,
            ErrorCategory::NetworkError
        );
        assert_eq!(
            normalize("operation timed out").category,
            ErrorCategory::NetworkError
        );
    }

    #[test]
    fn test_nonce_and_replacement() {
        assert_eq!(
            normalize("nonce too low").category,
            ErrorCategory::NonceTooLow
        );
        assert_eq!(
            normalize("replacement transaction underpriced").category,
            ErrorCategory::UnderpricedReplacement
        );
    }

    #[test]
    fn test_call_exception() {
        assert_eq!(
            normalize("CALL_EXCEPTION during estimateGas").category,
            ErrorCategory::CallException
        );
    }

    #[test]
    fn test_short_message_passes_through() {
        let normalized = normalize("Faucet is empty");
        assert_eq!(normalized.category, ErrorCategory::Unclassified);
        assert_eq!(normalized.message, "Faucet is empty");
    }

    #[test]
    fn test_long_dump_extracts_embedded_message() {
        let raw = format!(
            r#"{{"jsonrpc":"2.0","id":7,"error":{{"code":-32000,"message":"gas required exceeds allowance"}},"data":"{}"}}"#,
            "f".repeat(120)
        );
        let normalized = normalize(&raw);
        assert_eq!(normalized.category, ErrorCategory::Unclassified);
        assert_eq!(normalized.message, "gas required exceeds allowance");
    }

    #[test]
    fn test_long_dump_without_message_falls_back() {
        let raw = "x".repeat(200);
        let normalized = normalize(&raw);
        assert_eq!(normalized.message, "An unexpected error occurred.");
    }

    #[test]
    fn test_long_embedded_message_truncated() {
        let inner = "y".repeat(120);
        let raw = format!(r#"prefix {} "message": "{}" suffix {}"#, "p".repeat(40), inner, "s".repeat(40));
        let normalized = normalize(&raw);
        assert!(normalized.message.ends_with("..."));
        assert!(normalized.message.len() <= 80);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize("").message, "An unknown error occurred.");
    }
}
