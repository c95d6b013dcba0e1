//! Deposit scan inputs and results.

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::payments::amount::TokenAmount;

/// Rail tag carried by every deposit found on-chain.
pub const TOKEN_RAIL: &str = "token";

/// Parameters of one deposit scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositQuery {
    pub network: String,
    /// Sender of the transfers (topic 1).
    pub buyer: Option<Address>,
    /// Recipient of the transfers (topic 2).
    pub funder: Option<Address>,
    /// Opaque identifier copied into every record.
    pub counterparty: String,
    pub token_contract: Address,
    pub decimals: u8,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One incoming token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositRecord {
    pub rail: &'static str,
    pub counterparty: String,
    pub tx_hash: TxHash,
    pub amount: TokenAmount,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
}
