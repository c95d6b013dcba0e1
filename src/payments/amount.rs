//! Exact conversion between human-entered decimal amounts and minor units.

use alloy::primitives::U256;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::error::SettlementError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount '{0}' is negative")]
    Negative(String),

    #[error("amount '{0}' is not a decimal number")]
    NotNumeric(String),

    #[error("amount '{amount}' has more than {decimals} fractional digits")]
    TooPrecise { amount: String, decimals: u8 },

    #[error("amount '{0}' does not fit in 256 bits")]
    Overflow(String),
}

impl From<AmountError> for SettlementError {
    fn from(e: AmountError) -> Self {
        SettlementError::Validation(e.to_string())
    }
}

/// Split a decimal string into whole and fractional digits.
///
/// Rejects empty, negative and non-numeric input without needing the decimal count.
pub fn split_decimal(amount: &str) -> Result<(&str, &str), AmountError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(AmountError::Negative(trimmed.to_string()));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::NotNumeric(trimmed.to_string()));
    }
    Ok((whole, fraction))
}

/// Convert `amount` to minor units: `amount * 10^decimals`, exactly.
///
/// Fractional digits beyond `decimals` are rejected rather than truncated.
pub fn to_minor_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    let (whole, fraction) = split_decimal(trimmed)?;

    let significant = fraction.trim_end_matches('0');
    if significant.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            amount: trimmed.to_string(),
            decimals,
        });
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(significant);
    digits.extend(std::iter::repeat('0').take(decimals as usize - significant.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow(trimmed.to_string()))
}

/// Render minor units as a decimal string without trailing zeros (`1.5`, `20`).
pub fn format_minor_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// A token quantity with the decimal count it is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub minor: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(minor: U256, decimals: u8) -> Self {
        Self { minor, decimals }
    }

    /// Parse a human-entered amount.
    pub fn parse(amount: &str, decimals: u8) -> Result<Self, AmountError> {
        Ok(Self::new(to_minor_units(amount, decimals)?, decimals))
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_minor_units(self.minor, self.decimals))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
