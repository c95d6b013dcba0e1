//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SettlementConfig (validated, immutable)
//!     → shared via Arc through the SettlementContext
//!
//! Secrets (signing session token)
//!     → environment only, read by loader.rs
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; network descriptors never change afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, session_token_from_env, ConfigError};
pub use schema::{
    BroadcastConfig, ContractConfig, NetworkConfig, ObservabilityConfig, RecipientConfig,
    ScannerConfig, SettlementConfig, SignerConfig, TokenConfig,
};
