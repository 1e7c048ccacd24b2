//! Decimal-string / integer-unit conversion.
//!
//! Public and native balances use the token's real precision; everything
//! crossing the confidential ledger uses the protocol's fixed 2-decimal
//! scale (see [`PROTOCOL_FIXED_DECIMALS`](crate::domain::types::PROTOCOL_FIXED_DECIMALS)).

use anyhow::{Context, Result};
use ethers::types::U256;
use ethers::utils::{format_ether, format_units, parse_units};

/// Convert a human-entered decimal string to integer units at `decimals`.
pub fn to_units(amount: &str, decimals: u32) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        anyhow::bail!("amount is empty");
    }
    if trimmed.starts_with('-') {
        anyhow::bail!("amount must be positive: {trimmed}");
    }
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() as u32 > decimals {
            anyhow::bail!("amount {trimmed} has more than {decimals} decimal places");
        }
    }

    let parsed = parse_units(trimmed, decimals)
        .with_context(|| format!("invalid decimal amount: {trimmed}"))?;
    Ok(parsed.into())
}

/// Format integer units back into a decimal string at `decimals`.
pub fn from_units(value: U256, decimals: u32) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}

/// Format a wei amount as a native-currency decimal string.
pub fn from_wei(value: U256) -> String {
    format_ether(value)
}
