//! Payment rail data types.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

use crate::blockchain::transaction::UnsignedTransaction;
use crate::blockchain::types::TxReceipt;
use crate::error::{SettlementError, SettlementResult};
use crate::payments::amount::TokenAmount;

/// Audit event type written for rail payments.
pub const PAYMENT_EVENT: &str = "payment";

/// A payment a rail is asked to make.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Settlement contract the payment belongs to.
    pub contract_ref: String,
    pub network: String,
    pub funder: String,
    pub recipient: String,
    /// Native symbol or configured token symbol.
    pub symbol: String,
    /// Decimal amount as entered (e.g., "1.5").
    pub amount: String,
    /// Externally supplied transaction reference (manual rail).
    pub reference: Option<String>,
}

/// What a payment produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Broadcast and mined with status 1.
    Confirmed(TxReceipt),
    /// Signing is waiting for MFA approval; nothing was broadcast.
    AwaitingApproval {
        mfa_id: Option<String>,
        transaction: Box<UnsignedTransaction>,
    },
    /// Recorded without touching the chain.
    Recorded { reference: String },
}

/// Asset a payment moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentAsset {
    Native { symbol: String },
    Token { symbol: String, contract: Address },
}

/// A payment transaction ready for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPayment {
    pub transaction: UnsignedTransaction,
    /// Party receiving the funds, which differs from `transaction.to` for tokens.
    pub recipient: Address,
    pub asset: PaymentAsset,
    pub amount: TokenAmount,
}

/// An asset account the rail can pay from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RailAccount {
    pub network: String,
    pub symbol: String,
    pub token_contract: Address,
}

/// A known payee of the rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RailRecipient {
    pub network: String,
    pub name: String,
    pub address: Address,
}

/// Deposit lookup for one counterparty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRequest {
    pub network: String,
    pub buyer: Option<String>,
    pub funder: Option<String>,
    pub counterparty: String,
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Parse an address field supplied by a caller.
pub(crate) fn parse_address(field: &str, value: &str) -> SettlementResult<Address> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SettlementError::validation(format!("{} address is required", field)));
    }
    Address::from_str(value).map_err(|e| {
        SettlementError::validation(format!("invalid {} address '{}': {}", field, value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let parsed = parse_address("funder", "0x1111111111111111111111111111111111111111").unwrap();
        assert_eq!(parsed, Address::repeat_byte(0x11));

        let empty = parse_address("funder", "  ").unwrap_err();
        assert_eq!(empty.to_string(), "validation error: funder address is required");

        assert!(parse_address("recipient", "0x1234").unwrap_err().is_validation());
    }
}
