//! Shared utilities for integration tests: an in-memory chain and config fixtures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{address, keccak256, Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use chain_settlement::audit::{AuditEvent, EventSink};
use chain_settlement::blockchain::types::{
    BlockInfo, BlockRef, CallRequest, ChainError, ChainLog, ChainResult, LogQuery, NetworkDescriptor,
    TxReceipt,
};
use chain_settlement::blockchain::{ChainRpc, Connection, Connector};
use chain_settlement::config::parse_config;
use chain_settlement::payments::erc20::{address_topic, transfer_topic};
use chain_settlement::SettlementConfig;

pub const AVALANCHE_CHAIN_ID: u64 = 43114;
pub const USDC: Address = address!("b97ef9ef8734c71904d8002f8b6bc66dd9c48a6e");
pub const BUYER: Address = address!("1111111111111111111111111111111111111111");
pub const FUNDER: Address = address!("2222222222222222222222222222222222222222");
pub const BLOCK_GAS_LIMIT: u64 = 8_000_000;

/// Config with an `avalanche` network (AVAX, USDC) and a POA `fizit` network.
pub fn test_config(signer_url: &str) -> SettlementConfig {
    let toml = format!(
        r#"
[[networks]]
name = "avalanche"
chain_id = 43114
rpc_url = "http://127.0.0.1:9650/ext/bc/C/rpc"
native_symbol = "AVAX"

[[networks]]
name = "fizit"
chain_id = 1337
rpc_url = "http://127.0.0.1:8545"
poa = true
native_symbol = "FIZ"

[[tokens]]
network = "avalanche"
symbol = "USDC"
address = "{usdc}"

[[recipients]]
network = "avalanche"
name = "Buyer Co"
address = "{buyer}"

[signer]
url = "{signer_url}"
org_id = "Org#test"

[broadcast]
receipt_timeout_secs = 2
poll_interval_ms = 10
release = "test-release"
"#,
        usdc = USDC,
        buyer = BUYER,
        signer_url = signer_url,
    );
    parse_config(&toml).unwrap()
}

#[derive(Default)]
struct FakeState {
    blocks: Vec<BlockInfo>,
    logs: Vec<ChainLog>,
    nonce: u64,
    gas_estimate: u64,
    decimals: u8,
    receipt_status: u64,
    withhold_receipts: bool,
    receipts: HashMap<TxHash, TxReceipt>,
    fail_log_query: Option<usize>,

    latest_lookups: usize,
    block_lookups: Vec<u64>,
    log_queries: Vec<LogQuery>,
    estimates: Vec<CallRequest>,
    calls: Vec<CallRequest>,
    nonce_lookups: usize,
    sent: Vec<Bytes>,
}

/// In-memory chain implementing the RPC seam.
pub struct FakeChain {
    name: String,
    chain_id: u64,
    state: Mutex<FakeState>,
}

impl FakeChain {
    pub fn new(name: &str, chain_id: u64) -> Self {
        Self {
            name: name.to_string(),
            chain_id,
            state: Mutex::new(FakeState {
                gas_estimate: 21_000,
                decimals: 6,
                receipt_status: 1,
                ..Default::default()
            }),
        }
    }

    /// Avalanche chain with blocks 0..=3 at timestamps 100, 200, 300, 400.
    pub fn avalanche() -> Self {
        Self::new("avalanche", AVALANCHE_CHAIN_ID).with_timestamps(&[100, 200, 300, 400])
    }

    pub fn with_timestamps(self, timestamps: &[u64]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.blocks = timestamps
                .iter()
                .enumerate()
                .map(|(number, &timestamp)| BlockInfo {
                    number: number as u64,
                    timestamp,
                    gas_limit: BLOCK_GAS_LIMIT,
                })
                .collect();
        }
        self
    }

    /// Blocks `0..count` spaced ten seconds apart, starting at timestamp 1000.
    pub fn with_block_count(self, count: u64) -> Self {
        let timestamps: Vec<u64> = (0..count).map(|n| 1000 + n * 10).collect();
        self.with_timestamps(&timestamps)
    }

    pub fn set_nonce(&self, nonce: u64) {
        self.state.lock().unwrap().nonce = nonce;
    }

    pub fn set_gas_estimate(&self, gas: u64) {
        self.state.lock().unwrap().gas_estimate = gas;
    }

    pub fn set_decimals(&self, decimals: u8) {
        self.state.lock().unwrap().decimals = decimals;
    }

    pub fn set_receipt_status(&self, status: u64) {
        self.state.lock().unwrap().receipt_status = status;
    }

    /// Never produce receipts, as if the transaction stays in the mempool.
    pub fn withhold_receipts(&self) {
        self.state.lock().unwrap().withhold_receipts = true;
    }

    /// Fail the `n`th log query (zero-based).
    pub fn fail_log_query(&self, n: usize) {
        self.state.lock().unwrap().fail_log_query = Some(n);
    }

    /// Add a `Transfer(from, to, value)` log of `token` in `block`.
    pub fn add_transfer(&self, token: Address, from: Address, to: Address, value: U256, block: u64) {
        let mut state = self.state.lock().unwrap();
        let index = state.logs.len() as u64;
        state.logs.push(ChainLog {
            address: token,
            topics: vec![transfer_topic(), address_topic(from), address_topic(to)],
            data: value.to_be_bytes::<32>().to_vec().into(),
            block_number: Some(block),
            transaction_hash: Some(keccak256(index.to_be_bytes())),
        });
    }

    pub fn latest_lookups(&self) -> usize {
        self.state.lock().unwrap().latest_lookups
    }

    /// Block numbers looked up by number, in order.
    pub fn block_lookups(&self) -> Vec<u64> {
        self.state.lock().unwrap().block_lookups.clone()
    }

    pub fn log_queries(&self) -> Vec<LogQuery> {
        self.state.lock().unwrap().log_queries.clone()
    }

    pub fn estimates(&self) -> Vec<CallRequest> {
        self.state.lock().unwrap().estimates.clone()
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn nonce_lookups(&self) -> usize {
        self.state.lock().unwrap().nonce_lookups
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }
}

fn matches(query: &LogQuery, log: &ChainLog) -> bool {
    let in_range = log
        .block_number
        .is_some_and(|n| n >= query.from_block && n <= query.to_block);
    let topics_match = query
        .topics
        .iter()
        .enumerate()
        .all(|(i, topic)| topic.map_or(true, |t| log.topics.get(i) == Some(&t)));
    in_range && log.address == query.address && topics_match
}

#[async_trait]
impl ChainRpc for FakeChain {
    fn network(&self) -> &str {
        &self.name
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        Ok(self.chain_id)
    }

    async fn block(&self, block: BlockRef) -> ChainResult<BlockInfo> {
        let mut state = self.state.lock().unwrap();
        let found = match block {
            BlockRef::Latest => {
                state.latest_lookups += 1;
                state.blocks.last().copied()
            }
            BlockRef::Number(number) => {
                state.block_lookups.push(number);
                state.blocks.get(number as usize).copied()
            }
        };
        found.ok_or_else(|| ChainError::BlockNotFound(block.to_string()))
    }

    async fn transaction_count(&self, _address: Address) -> ChainResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.nonce_lookups += 1;
        Ok(state.nonce)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> ChainResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.estimates.push(call.clone());
        Ok(state.gas_estimate)
    }

    async fn call(&self, call: &CallRequest) -> ChainResult<Bytes> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());
        Ok(U256::from(state.decimals).to_be_bytes::<32>().to_vec().into())
    }

    async fn logs(&self, query: &LogQuery) -> ChainResult<Vec<ChainLog>> {
        let mut state = self.state.lock().unwrap();
        let index = state.log_queries.len();
        state.log_queries.push(query.clone());
        if state.fail_log_query == Some(index) {
            return Err(ChainError::Rpc("query returned more than 10000 results".to_string()));
        }
        Ok(state
            .logs
            .iter()
            .filter(|log| matches(query, log))
            .cloned()
            .collect())
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> ChainResult<TxHash> {
        let mut state = self.state.lock().unwrap();
        let tx_hash = keccak256(raw);
        state.sent.push(raw.clone());
        if !state.withhold_receipts {
            let receipt = TxReceipt {
                tx_hash,
                status: state.receipt_status,
                gas_used: state.gas_estimate,
                block_number: Some(state.blocks.len().saturating_sub(1) as u64),
                block_hash: None,
            };
            state.receipts.insert(tx_hash, receipt);
        }
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> ChainResult<Option<TxReceipt>> {
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }
}

/// Connector handing out prepared fake chains by network name.
#[derive(Default)]
pub struct FakeConnector {
    chains: HashMap<String, Arc<FakeChain>>,
    connects: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, chain: Arc<FakeChain>) -> Self {
        self.chains.insert(chain.network().to_string(), chain);
        self
    }

    /// Sleep before every connect to widen races between first callers.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, network: &NetworkDescriptor) -> ChainResult<Connection> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.chains.get(&network.name) {
            Some(chain) => {
                let connection: Connection = chain.clone();
                Ok(connection)
            }
            None => Err(ChainError::Connection {
                network: network.name.clone(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// Event sink that keeps every pending event, optionally failing each write.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn create_pending_event(&self, event: AuditEvent) -> Result<(), String> {
        self.events.lock().unwrap().push(event);
        if self.fail {
            return Err("event store unavailable".to_string());
        }
        Ok(())
    }
}
