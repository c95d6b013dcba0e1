//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! SettlementConfig (per-network RPC URL, chain id, fee policy)
//!     → registry.rs (one cached connection per network)
//!     → client.rs (JSON-RPC calls with timeouts)
//!     → transaction.rs (nonce, gas estimate, EIP-1559 fees)
//!     → signer.rs (remote custodial signing, MFA deferral)
//!     → broadcast.rs (submit, wait for receipt, audit event)
//! ```
//!
//! # Security Constraints
//! - No private keys in this process; signing is remote
//! - The signing session token comes only from the environment and is never logged
//! - All RPC calls have configurable timeouts
//! - Nothing is retried automatically

pub mod broadcast;
pub mod client;
pub mod nonce;
pub mod registry;
pub mod signer;
pub mod transaction;
pub mod types;

pub use broadcast::{AuditTarget, Broadcaster};
pub use client::{BlockchainClient, ChainRpc};
pub use nonce::NonceLocks;
pub use registry::{Connection, ConnectionRegistry, Connector, HttpConnector};
pub use signer::{RemoteSigner, SigningOutcome};
pub use transaction::{estimate_fees, FeeEstimate, TxBuilder, UnsignedTransaction};
pub use types::{BlockInfo, BlockRef, ChainError, ChainId, FeePolicy, NetworkDescriptor, TxReceipt};
