//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the settlement core.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the settlement core.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SettlementConfig {
    /// Chains payments can be made on, looked up by name.
    pub networks: Vec<NetworkConfig>,

    /// ERC-20 token contracts per network and symbol.
    pub tokens: Vec<TokenConfig>,

    /// Deployed contracts per contract type.
    pub contracts: Vec<ContractConfig>,

    /// Known payees of the token rail.
    pub recipients: Vec<RecipientConfig>,

    /// Remote custodial signing service.
    pub signer: SignerConfig,

    /// Broadcast and receipt tracking settings.
    pub broadcast: BroadcastConfig,

    /// Deposit scanner settings.
    pub scanner: ScannerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Per-chain metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Network name used for lookups (e.g., "avalanche").
    pub name: String,

    /// Chain ID (e.g., 43114 for Avalanche C-Chain).
    pub chain_id: u64,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain headers carry vendor extra-data and need lenient decoding.
    #[serde(default)]
    pub poa: bool,

    /// Symbol of the native gas token (e.g., "AVAX").
    pub native_symbol: String,

    /// Decimal count of the native token.
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,

    /// RPC request timeout in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Fixed priority fee in wei.
    #[serde(default)]
    pub max_priority_fee_per_gas: u128,

    /// Minimum fee floor in wei.
    #[serde(default = "default_min_fee_per_gas")]
    pub min_fee_per_gas: u128,

    /// Buffer added on top of the floor in wei.
    #[serde(default = "default_fee_buffer_per_gas")]
    pub fee_buffer_per_gas: u128,
}

fn default_native_decimals() -> u8 {
    18
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

fn default_min_fee_per_gas() -> u128 {
    25_000_000_000
}

fn default_fee_buffer_per_gas() -> u128 {
    25_000_000_000
}

/// ERC-20 token deployment on one network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Network the token lives on.
    pub network: String,

    /// Token symbol (matched case-insensitively).
    pub symbol: String,

    /// Token contract address.
    pub address: String,
}

/// A named payee address on one network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecipientConfig {
    pub network: String,
    pub name: String,
    pub address: String,
}

/// Deployed contract address per contract type.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractConfig {
    /// Contract type (e.g., "delivery", "sale").
    pub contract_type: String,

    /// Network the contract is deployed on.
    pub network: String,

    /// Contract address.
    pub address: String,
}

/// Remote signing service settings. The session token never lives here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Base URL of the signing service.
    pub url: String,

    /// Organization id the signing keys belong to.
    pub org_id: String,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            url: "https://gamma.signer.cubist.dev".to_string(),
            org_id: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Broadcast settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Maximum time to wait for a receipt in seconds.
    pub receipt_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Release tag stamped on audit events. Defaults to the crate version.
    pub release: String,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            receipt_timeout_secs: 120,
            poll_interval_ms: 2000,
            release: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Deposit scanner settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Maximum number of blocks per log query.
    pub window_blocks: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            window_blocks: 2048,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl SettlementConfig {
    /// Find a network by name.
    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.name == name)
    }

    /// Find a token by network and symbol (case-insensitive symbol).
    pub fn token(&self, network: &str, symbol: &str) -> Option<&TokenConfig> {
        self.tokens
            .iter()
            .find(|t| t.network == network && t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Find a deployed contract by type and network.
    pub fn contract(&self, contract_type: &str, network: &str) -> Option<&ContractConfig> {
        self.contracts
            .iter()
            .find(|c| c.contract_type == contract_type && c.network == network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[networks]]
name = "avalanche"
chain_id = 43114
rpc_url = "https://api.avax.network/ext/bc/C/rpc"
poa = true
native_symbol = "AVAX"

[[tokens]]
network = "avalanche"
symbol = "USDC"
address = "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"

[[contracts]]
contract_type = "purchase"
network = "avalanche"
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[signer]
org_id = "Org#123"

[broadcast]
receipt_timeout_secs = 60
"#;

    #[test]
    fn test_parse_sample() {
        let config: SettlementConfig = toml::from_str(SAMPLE).unwrap();
        let network = config.network("avalanche").unwrap();
        assert_eq!(network.chain_id, 43114);
        assert!(network.poa);
        assert_eq!(network.native_decimals, 18);
        assert_eq!(network.max_priority_fee_per_gas, 0);
        assert_eq!(network.min_fee_per_gas + network.fee_buffer_per_gas, 50_000_000_000);

        assert_eq!(config.signer.org_id, "Org#123");
        assert_eq!(config.signer.timeout_secs, 30);
        assert_eq!(config.broadcast.receipt_timeout_secs, 60);
        assert_eq!(config.broadcast.poll_interval_ms, 2000);
        assert_eq!(config.scanner.window_blocks, 2048);
    }

    #[test]
    fn test_token_lookup_is_case_insensitive() {
        let config: SettlementConfig = toml::from_str(SAMPLE).unwrap();
        assert!(config.token("avalanche", "usdc").is_some());
        assert!(config.token("fizit", "USDC").is_none());
        assert!(config.network("ethereum").is_none());
    }

    #[test]
    fn test_contract_lookup_by_type_and_network() {
        let config: SettlementConfig = toml::from_str(SAMPLE).unwrap();
        let contract = config.contract("purchase", "avalanche").unwrap();
        assert_eq!(contract.address, "0x5FbDB2315678afecb367f032d93F642f64180aa3");
        assert!(config.contract("sale", "avalanche").is_none());
        assert!(config.contract("purchase", "fizit").is_none());
    }
}
