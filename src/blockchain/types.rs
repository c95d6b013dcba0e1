//! Chain-level types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::schema::NetworkConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors raised while talking to a chain node.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The endpoint did not answer the liveness check.
    #[error("failed to connect to {network}: {reason}")]
    Connection { network: String, reason: String },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// A block the node should have cannot be found.
    #[error("block {0} not found")]
    BlockNotFound(String),

    /// A node response could not be decoded.
    #[error("malformed RPC response: {0}")]
    Decode(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// The subset of a block header every component needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
}

/// Which block a lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Latest,
    Number(u64),
}

impl std::fmt::Display for BlockRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockRef::Latest => write!(f, "latest"),
            BlockRef::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A call or transaction to simulate against the node (`eth_estimateGas`, `eth_call`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

/// Log query issued by the deposit scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub from_block: u64,
    pub to_block: u64,
    pub address: Address,
    /// Positional topics; `None` leaves the position unfiltered.
    pub topics: [Option<B256>; 3],
}

/// An event log as returned by the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<TxHash>,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// 1 on success, anything else is an on-chain failure.
    pub status: u64,
    pub gas_used: u64,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Immutable per-network metadata resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
    pub name: String,
    pub chain_id: ChainId,
    pub rpc_url: String,
    pub poa: bool,
    pub native_symbol: String,
    pub native_decimals: u8,
    pub rpc_timeout_secs: u64,
    pub fees: FeePolicy,
}

impl From<&NetworkConfig> for NetworkDescriptor {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            name: config.name.clone(),
            chain_id: ChainId(config.chain_id),
            rpc_url: config.rpc_url.clone(),
            poa: config.poa,
            native_symbol: config.native_symbol.clone(),
            native_decimals: config.native_decimals,
            rpc_timeout_secs: config.rpc_timeout_secs,
            fees: FeePolicy {
                max_priority_fee_per_gas: config.max_priority_fee_per_gas,
                min_fee_per_gas: config.min_fee_per_gas,
                fee_buffer_per_gas: config.fee_buffer_per_gas,
            },
        }
    }
}

/// Fixed, non-adaptive fee policy of a network. All values in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub max_priority_fee_per_gas: u128,
    pub min_fee_per_gas: u128,
    pub fee_buffer_per_gas: u128,
}

impl FeePolicy {
    pub fn max_fee_per_gas(&self) -> u128 {
        self.min_fee_per_gas.saturating_add(self.fee_buffer_per_gas)
    }
}
