//! Chain RPC seam and its JSON-RPC implementation.
//!
//! # Responsibilities
//! - Connect to a network's JSON-RPC endpoint
//! - Query chain state (blocks, nonces, gas estimates, logs, receipts)
//! - Submit raw signed transactions
//! - Enforce a per-call timeout and map transport errors into `ChainError`

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U64};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{Filter, TransactionRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Display;
use std::future::IntoFuture;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{
    BlockInfo, BlockRef, CallRequest, ChainError, ChainLog, ChainResult, LogQuery,
    NetworkDescriptor, TxReceipt,
};

/// Every remote operation the settlement core performs against a chain.
///
/// Each method is one RPC round trip. Implementations must not retry.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Name of the network this handle talks to.
    fn network(&self) -> &str;

    /// Chain id reported by the node. Used as the liveness check.
    async fn chain_id(&self) -> ChainResult<u64>;

    /// Look up a block header.
    async fn block(&self, block: BlockRef) -> ChainResult<BlockInfo>;

    /// Current transaction count (next nonce) of an address.
    async fn transaction_count(&self, address: Address) -> ChainResult<u64>;

    /// Node gas estimate for a call.
    async fn estimate_gas(&self, call: &CallRequest) -> ChainResult<u64>;

    /// Execute a read-only call.
    async fn call(&self, call: &CallRequest) -> ChainResult<Bytes>;

    /// Query event logs for one block range.
    async fn logs(&self, query: &LogQuery) -> ChainResult<Vec<ChainLog>>;

    /// Submit a signed raw transaction, returning its hash.
    async fn send_raw_transaction(&self, raw: &Bytes) -> ChainResult<TxHash>;

    /// Receipt of a transaction, `None` while it is still pending.
    async fn transaction_receipt(&self, hash: TxHash) -> ChainResult<Option<TxReceipt>>;
}

/// Header fields read from `eth_getBlockByNumber` on proof-of-authority chains.
///
/// Unknown fields (vendor extra data, validator sets) are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LenientHeader {
    number: U64,
    timestamp: U64,
    gas_limit: U64,
}

/// JSON-RPC client for one network.
#[derive(Clone)]
pub struct BlockchainClient {
    provider: RootProvider,
    network: NetworkDescriptor,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a client for a network. No request is made yet.
    pub fn new(network: NetworkDescriptor) -> ChainResult<Self> {
        let url: url::Url = network.rpc_url.parse().map_err(|e| {
            ChainError::Rpc(format!("Invalid RPC URL '{}': {}", network.rpc_url, e))
        })?;

        let timeout_duration = Duration::from_secs(network.rpc_timeout_secs);
        let provider = RootProvider::new_http(url);

        tracing::debug!(
            network = %network.name,
            rpc_url = %network.rpc_url,
            poa = network.poa,
            "Blockchain client created"
        );

        Ok(Self {
            provider,
            network,
            timeout_duration,
        })
    }

    /// Get the network descriptor.
    pub fn descriptor(&self) -> &NetworkDescriptor {
        &self.network
    }

    async fn timed<T, E, F>(&self, what: &str, fut: F) -> ChainResult<T>
    where
        E: Display,
        F: IntoFuture<Output = Result<T, E>>,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(network = %self.network.name, error = %e, "{} failed", what);
                Err(ChainError::Rpc(format!("{} failed: {}", what, e)))
            }
            Err(_) => {
                tracing::warn!(network = %self.network.name, "{} timed out", what);
                Err(ChainError::Timeout(self.network.rpc_timeout_secs))
            }
        }
    }

    fn block_tag(block: BlockRef) -> BlockNumberOrTag {
        match block {
            BlockRef::Latest => BlockNumberOrTag::Latest,
            BlockRef::Number(n) => BlockNumberOrTag::Number(n),
        }
    }
}

fn to_transaction_request(call: &CallRequest) -> TransactionRequest {
    let mut request = TransactionRequest::default()
        .with_value(call.value)
        .with_input(call.data.clone());
    if let Some(from) = call.from {
        request = request.with_from(from);
    }
    if let Some(to) = call.to {
        request = request.with_to(to);
    }
    request
}

fn to_filter(query: &LogQuery) -> Filter {
    let mut filter = Filter::new()
        .address(query.address)
        .from_block(query.from_block)
        .to_block(query.to_block);
    if let Some(signature) = query.topics[0] {
        filter = filter.event_signature(signature);
    }
    if let Some(topic) = query.topics[1] {
        filter = filter.topic1(topic);
    }
    if let Some(topic) = query.topics[2] {
        filter = filter.topic2(topic);
    }
    filter
}

#[async_trait]
impl ChainRpc for BlockchainClient {
    fn network(&self) -> &str {
        &self.network.name
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        self.timed("eth_chainId", self.provider.get_chain_id()).await
    }

    async fn block(&self, block: BlockRef) -> ChainResult<BlockInfo> {
        let tag = Self::block_tag(block);

        if self.network.poa {
            let header: Option<LenientHeader> = self
                .timed(
                    "eth_getBlockByNumber",
                    self.provider
                        .raw_request("eth_getBlockByNumber".into(), (tag, false)),
                )
                .await?;
            let header = header.ok_or_else(|| ChainError::BlockNotFound(block.to_string()))?;
            return Ok(BlockInfo {
                number: header.number.to::<u64>(),
                timestamp: header.timestamp.to::<u64>(),
                gas_limit: header.gas_limit.to::<u64>(),
            });
        }

        let found = self
            .timed("eth_getBlockByNumber", self.provider.get_block_by_number(tag))
            .await?
            .ok_or_else(|| ChainError::BlockNotFound(block.to_string()))?;
        Ok(BlockInfo {
            number: found.header.number,
            timestamp: found.header.timestamp,
            gas_limit: found.header.gas_limit,
        })
    }

    async fn transaction_count(&self, address: Address) -> ChainResult<u64> {
        self.timed(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address),
        )
        .await
    }

    async fn estimate_gas(&self, call: &CallRequest) -> ChainResult<u64> {
        self.timed(
            "eth_estimateGas",
            self.provider.estimate_gas(to_transaction_request(call)),
        )
        .await
    }

    async fn call(&self, call: &CallRequest) -> ChainResult<Bytes> {
        self.timed("eth_call", self.provider.call(to_transaction_request(call)))
            .await
    }

    async fn logs(&self, query: &LogQuery) -> ChainResult<Vec<ChainLog>> {
        let filter = to_filter(query);
        let logs = self.timed("eth_getLogs", self.provider.get_logs(&filter)).await?;

        Ok(logs
            .into_iter()
            .map(|log| ChainLog {
                address: log.inner.address,
                topics: log.inner.data.topics().to_vec(),
                data: log.inner.data.data.clone(),
                block_number: log.block_number,
                transaction_hash: log.transaction_hash,
            })
            .collect())
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> ChainResult<TxHash> {
        let pending = self
            .timed(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(raw),
            )
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> ChainResult<Option<TxReceipt>> {
        let receipt = self
            .timed(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(hash),
            )
            .await?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash: r.transaction_hash,
            status: if r.status() { 1 } else { 0 },
            gas_used: r.gas_used,
            block_number: r.block_number,
            block_hash: r.block_hash,
        }))
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("network", &self.network.name)
            .field("rpc_url", &self.network.rpc_url)
            .field("chain_id", &self.network.chain_id)
            .field("poa", &self.network.poa)
            .finish()
    }
}
