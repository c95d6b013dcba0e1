//! EIP-1559 transaction assembly and fee estimation.
//!
//! # Responsibilities
//! - Build unsigned type-2 transactions
//! - Estimate gas, capped at the latest block's gas limit
//! - Apply the network's fixed fee policy
//! - Fetch the sender nonce immediately before assembly (never cached)

use alloy::primitives::{Address, Bytes, U256};

use crate::blockchain::client::ChainRpc;
use crate::blockchain::types::{
    BlockRef, CallRequest, ChainId, ChainResult, FeePolicy, NetworkDescriptor,
};
use crate::error::{SettlementError, SettlementResult};

/// EIP-1559 transaction type tag.
pub const EIP1559_TX_TYPE: u8 = 2;

/// Transaction ready to be handed to the remote signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub from: Address,
    /// `None` for contract deployment.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub chain_id: ChainId,
    pub tx_type: u8,
}

impl UnsignedTransaction {
    /// Assemble a transaction with fees still unset.
    pub fn build(
        from: Address,
        to: Option<Address>,
        value: U256,
        data: Bytes,
        nonce: u64,
        chain_id: ChainId,
    ) -> Self {
        Self {
            from,
            to,
            value,
            data,
            nonce,
            gas_limit: 0,
            max_fee_per_gas: 0,
            max_priority_fee_per_gas: 0,
            chain_id,
            tx_type: EIP1559_TX_TYPE,
        }
    }

    /// Apply a fee estimate.
    pub fn with_fees(mut self, fees: FeeEstimate) -> Self {
        self.gas_limit = fees.gas_limit;
        self.max_fee_per_gas = fees.max_fee_per_gas;
        self.max_priority_fee_per_gas = fees.max_priority_fee_per_gas;
        self
    }

    /// The call the node should simulate for gas estimation.
    pub fn call_request(&self) -> CallRequest {
        CallRequest {
            from: Some(self.from),
            to: self.to,
            value: self.value,
            data: self.data.clone(),
        }
    }
}

/// Gas and fee fields of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Estimate gas and fees for a partially built transaction.
///
/// The gas limit never exceeds the latest block's gas limit.
pub async fn estimate_fees(
    connection: &dyn ChainRpc,
    policy: &FeePolicy,
    tx: &UnsignedTransaction,
) -> ChainResult<FeeEstimate> {
    let estimated = connection.estimate_gas(&tx.call_request()).await?;
    let block = connection.block(BlockRef::Latest).await?;
    let gas_limit = estimated.min(block.gas_limit);

    if gas_limit < estimated {
        tracing::warn!(
            network = connection.network(),
            estimated,
            block_gas_limit = block.gas_limit,
            "Gas estimate capped at block gas limit"
        );
    }

    Ok(FeeEstimate {
        gas_limit,
        max_fee_per_gas: policy.max_fee_per_gas(),
        max_priority_fee_per_gas: policy.max_priority_fee_per_gas,
    })
}

/// Transaction builder bound to one network connection.
pub struct TxBuilder<'a> {
    connection: &'a dyn ChainRpc,
    network: &'a NetworkDescriptor,
}

impl<'a> TxBuilder<'a> {
    /// Create a new transaction builder.
    pub fn new(connection: &'a dyn ChainRpc, network: &'a NetworkDescriptor) -> Self {
        Self {
            connection,
            network,
        }
    }

    /// Fetch the sender nonce, assemble the transaction and fill in fees.
    ///
    /// # Arguments
    /// * `from` - Sender (signer) address
    /// * `to` - Destination address, `None` to deploy
    /// * `value` - Amount of native token to send, in minor units
    /// * `data` - Call data (empty for simple transfers)
    pub async fn prepare(
        &self,
        from: Address,
        to: Option<Address>,
        value: U256,
        data: Bytes,
    ) -> SettlementResult<UnsignedTransaction> {
        let nonce = self
            .connection
            .transaction_count(from)
            .await
            .map_err(|e| self.rpc_error("nonce lookup", from, e))?;

        let tx = UnsignedTransaction::build(from, to, value, data, nonce, self.network.chain_id);
        let fees = estimate_fees(self.connection, &self.network.fees, &tx)
            .await
            .map_err(|e| self.rpc_error("fee estimation", from, e))?;

        let tx = tx.with_fees(fees);
        tracing::debug!(
            network = %self.network.name,
            from = %tx.from,
            to = ?tx.to,
            value = %tx.value,
            nonce = tx.nonce,
            gas_limit = tx.gas_limit,
            max_fee_per_gas = tx.max_fee_per_gas,
            "Transaction prepared"
        );
        Ok(tx)
    }

    fn rpc_error(
        &self,
        operation: &'static str,
        from: Address,
        source: crate::blockchain::types::ChainError,
    ) -> SettlementError {
        tracing::error!(
            network = %self.network.name,
            from = %from,
            error = %source,
            "{} failed",
            operation
        );
        SettlementError::Rpc {
            network: self.network.name.clone(),
            operation,
            source,
        }
    }
}
