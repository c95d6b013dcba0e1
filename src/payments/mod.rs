//! Payments subsystem.
//!
//! # Data Flow
//! ```text
//! PaymentRail::from_key("token" | "manual")
//!     → processor.rs (nonce lock held for the whole pipeline)
//!     → builder.rs (native transfer or ERC-20 transfer call)
//!     → amount.rs (exact decimal to minor-unit conversion)
//!     → blockchain (fees, remote signing, broadcast)
//! ```

pub mod amount;
pub mod builder;
pub mod erc20;
pub mod processor;
pub mod rail;
pub mod types;

pub use amount::{format_minor_units, to_minor_units, AmountError, TokenAmount};
pub use builder::PaymentBuilder;
pub use processor::process_payment;
pub use rail::{ManualRail, PaymentRail, TokenRail, MANUAL_RAIL_KEY, TOKEN_RAIL_KEY};
pub use types::{
    DepositRequest, PaymentAsset, PaymentOutcome, PaymentRequest, PreparedPayment, RailAccount,
    RailRecipient, PAYMENT_EVENT,
};
