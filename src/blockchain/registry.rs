//! Per-network connection registry.
//!
//! Holds one live RPC handle per network name for the life of the registry,
//! plus the token-decimals cache that depends on those handles. Both are
//! dropped together by [`ConnectionRegistry::reset`].

use alloy::primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::blockchain::client::{BlockchainClient, ChainRpc};
use crate::blockchain::types::{ChainError, ChainResult, NetworkDescriptor};
use crate::config::SettlementConfig;
use crate::error::{SettlementError, SettlementResult};
use crate::observability::metrics;

/// Shared handle to a chain connection.
pub type Connection = Arc<dyn ChainRpc>;

/// Opens a connection for a network descriptor.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, network: &NetworkDescriptor) -> ChainResult<Connection>;
}

/// Connector backed by JSON-RPC over HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, network: &NetworkDescriptor) -> ChainResult<Connection> {
        Ok(Arc::new(BlockchainClient::new(network.clone())?))
    }
}

/// Lazily populated cache of chain connections.
pub struct ConnectionRegistry {
    config: Arc<SettlementConfig>,
    connector: Arc<dyn Connector>,
    connections: DashMap<String, Arc<OnceCell<Connection>>>,
    decimals: DashMap<(String, Address), u8>,
}

impl ConnectionRegistry {
    /// Create a registry that opens HTTP connections.
    pub fn new(config: Arc<SettlementConfig>) -> Self {
        Self::with_connector(config, Arc::new(HttpConnector))
    }

    /// Create a registry with a custom connector.
    pub fn with_connector(config: Arc<SettlementConfig>, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            connections: DashMap::new(),
            decimals: DashMap::new(),
        }
    }

    /// Resolve a network's metadata. Unknown names are errors.
    pub fn network(&self, name: &str) -> SettlementResult<NetworkDescriptor> {
        self.config
            .network(name)
            .map(NetworkDescriptor::from)
            .ok_or_else(|| SettlementError::UnknownNetwork(name.to_string()))
    }

    /// Get the connection for a network, opening it on first use.
    ///
    /// Concurrent first callers share a single connection attempt. A failed
    /// attempt leaves the slot empty so a later call can try again.
    pub async fn get_connection(&self, name: &str) -> SettlementResult<Connection> {
        if let Some(cell) = self.connections.get(name) {
            if let Some(connection) = cell.get() {
                return Ok(connection.clone());
            }
        }

        let cell = self
            .connections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let connection = cell
            .get_or_try_init(|| async {
                let network = self.network(name)?;
                self.open(&network).await
            })
            .await?;

        Ok(connection.clone())
    }

    async fn open(&self, network: &NetworkDescriptor) -> SettlementResult<Connection> {
        let result = async {
            let connection = self.connector.connect(network).await?;
            let actual = connection
                .chain_id()
                .await
                .map_err(|e| ChainError::Connection {
                    network: network.name.clone(),
                    reason: e.to_string(),
                })?;
            if actual != network.chain_id.0 {
                return Err(ChainError::ChainMismatch {
                    expected: network.chain_id.0,
                    actual,
                });
            }
            Ok(connection)
        }
        .await;

        match result {
            Ok(connection) => {
                metrics::record_connection(&network.name, true);
                tracing::info!(
                    network = %network.name,
                    chain_id = network.chain_id.0,
                    "Chain connection established"
                );
                Ok(connection)
            }
            Err(e) => {
                metrics::record_connection(&network.name, false);
                tracing::error!(
                    network = %network.name,
                    rpc_url = %network.rpc_url,
                    error = %e,
                    "Chain connection failed"
                );
                Err(SettlementError::Connection {
                    network: network.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// Cached decimals of a token contract, if already read.
    pub fn cached_decimals(&self, network: &str, token: Address) -> Option<u8> {
        self.decimals
            .get(&(network.to_string(), token))
            .map(|entry| *entry.value())
    }

    /// Remember the decimals of a token contract.
    pub fn cache_decimals(&self, network: &str, token: Address, decimals: u8) {
        self.decimals.insert((network.to_string(), token), decimals);
    }

    /// Number of networks with an open connection.
    pub fn connection_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    /// Drop every cached connection and dependent cache.
    pub fn reset(&self) {
        let dropped = self.connection_count();
        self.connections.clear();
        self.decimals.clear();
        tracing::info!(connections = dropped, "Connection registry reset");
    }

    /// Configuration the registry resolves networks from.
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("networks", &self.config.networks.len())
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[tokio::test]
    async fn test_failed_liveness_check_is_connection_error() {
        let config = parse_config(
            r#"
[[networks]]
name = "local"
chain_id = 31337
rpc_url = "http://127.0.0.1:1"
native_symbol = "ETH"
rpc_timeout_secs = 2
"#,
        )
        .unwrap();
        let registry = ConnectionRegistry::new(Arc::new(config));

        match registry.get_connection("local").await {
            Err(SettlementError::Connection { network, source }) => {
                assert_eq!(network, "local");
                assert!(matches!(source, ChainError::Connection { ref network, .. } if network == "local"));
            }
            Err(other) => panic!("expected connection error, got {:?}", other),
            Ok(_) => panic!("expected connection error"),
        }
        assert_eq!(registry.connection_count(), 0);
    }
}
