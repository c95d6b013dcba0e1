//! Crate-level error taxonomy.
//!
//! Every failure the settlement core reports falls into one of these classes.
//! A signature awaiting MFA approval is not an error; it is returned as
//! [`crate::blockchain::SigningOutcome::ApprovalRequired`].

use thiserror::Error;

use crate::blockchain::types::{ChainError, TxReceipt};

#[derive(Debug, Error)]
pub enum SettlementError {
    /// The RPC endpoint of a network is unreachable or failed its liveness check.
    #[error("connection to network '{network}' failed")]
    Connection {
        network: String,
        #[source]
        source: ChainError,
    },

    /// No network with this name is configured.
    #[error("unknown network '{0}'")]
    UnknownNetwork(String),

    /// Missing or invalid caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A chain call made while building or broadcasting a transaction failed.
    #[error("{operation} failed on network '{network}'")]
    Rpc {
        network: String,
        operation: &'static str,
        #[source]
        source: ChainError,
    },

    /// The signing service rejected the request.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The signing service could not be reached.
    #[error("signing request failed")]
    SigningTransport(#[source] reqwest::Error),

    /// No receipt appeared before the deadline.
    #[error("no receipt for {tx_hash} after {timeout_secs} seconds")]
    ReceiptTimeout { tx_hash: String, timeout_secs: u64 },

    /// The transaction was mined but reverted.
    #[error("transaction {} failed on-chain with status {}", .receipt.tx_hash, .receipt.status)]
    TransactionFailed { receipt: Box<TxReceipt> },

    /// Block resolution or log scanning failed; no partial results are kept.
    #[error("deposit scan on network '{network}' failed")]
    ScanFailure {
        network: String,
        #[source]
        source: ChainError,
    },
}

impl SettlementError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error was raised before anything was sent to a remote service.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownNetwork(_))
    }
}

/// Result type for settlement operations.
pub type SettlementResult<T> = Result<T, SettlementError>;
