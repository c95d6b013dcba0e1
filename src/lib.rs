//! Multi-network EVM settlement core.
//!
//! Builds, remotely signs and broadcasts payment transactions, and scans
//! ERC-20 transfer logs for incoming deposits.

pub mod audit;
pub mod blockchain;
pub mod config;
pub mod context;
pub mod deposits;
pub mod error;
pub mod observability;
pub mod payments;

pub use config::schema::SettlementConfig;
pub use context::SettlementContext;
pub use error::{SettlementError, SettlementResult};
