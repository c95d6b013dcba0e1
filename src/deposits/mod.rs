//! Deposit discovery from on-chain `Transfer` logs.

pub mod scanner;
pub mod search;
pub mod types;

pub use scanner::DepositScanner;
pub use search::{block_from_date, block_windows};
pub use types::{DepositQuery, DepositRecord, TOKEN_RAIL};
