//! Payment rails selected by key.
//!
//! Every rail answers the same four questions: which accounts it pays from,
//! which recipients it knows, which deposits arrived, and how to make a payment.

use std::sync::Arc;

use crate::context::SettlementContext;
use crate::deposits::{DepositQuery, DepositRecord};
use crate::error::{SettlementError, SettlementResult};
use crate::payments::processor::process_payment;
use crate::payments::types::{
    parse_address, DepositRequest, PaymentOutcome, PaymentRequest, RailAccount, RailRecipient,
};

/// Rail key of on-chain token payments.
pub const TOKEN_RAIL_KEY: &str = "token";
/// Rail key of externally settled payments.
pub const MANUAL_RAIL_KEY: &str = "manual";

/// The closed set of payment rails.
#[derive(Debug, Clone)]
pub enum PaymentRail {
    Token(TokenRail),
    Manual(ManualRail),
}

impl PaymentRail {
    /// Select a rail by key. Unknown keys are validation errors.
    pub fn from_key(key: &str, context: Arc<SettlementContext>) -> SettlementResult<Self> {
        match key.to_ascii_lowercase().as_str() {
            TOKEN_RAIL_KEY => Ok(Self::Token(TokenRail::new(context))),
            MANUAL_RAIL_KEY => Ok(Self::Manual(ManualRail)),
            other => Err(SettlementError::validation(format!(
                "unsupported payment rail '{}'",
                other
            ))),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Token(_) => TOKEN_RAIL_KEY,
            Self::Manual(_) => MANUAL_RAIL_KEY,
        }
    }

    pub fn get_accounts(&self) -> SettlementResult<Vec<RailAccount>> {
        match self {
            Self::Token(rail) => rail.get_accounts(),
            Self::Manual(_) => Ok(Vec::new()),
        }
    }

    pub fn get_recipients(&self) -> SettlementResult<Vec<RailRecipient>> {
        match self {
            Self::Token(rail) => rail.get_recipients(),
            Self::Manual(_) => Ok(Vec::new()),
        }
    }

    pub async fn get_deposits(&self, request: &DepositRequest) -> SettlementResult<Vec<DepositRecord>> {
        match self {
            Self::Token(rail) => rail.get_deposits(request).await,
            Self::Manual(_) => Ok(Vec::new()),
        }
    }

    pub async fn make_payment(&self, request: &PaymentRequest) -> SettlementResult<PaymentOutcome> {
        match self {
            Self::Token(rail) => rail.make_payment(request).await,
            Self::Manual(rail) => rail.make_payment(request),
        }
    }
}

/// On-chain payments through the full build/sign/broadcast pipeline.
#[derive(Debug, Clone)]
pub struct TokenRail {
    context: Arc<SettlementContext>,
}

impl TokenRail {
    pub fn new(context: Arc<SettlementContext>) -> Self {
        Self { context }
    }

    /// Configured token contracts, one account per network and symbol.
    pub fn get_accounts(&self) -> SettlementResult<Vec<RailAccount>> {
        let builder = self.context.payment_builder();
        self.context
            .config()
            .tokens
            .iter()
            .map(|token| {
                Ok(RailAccount {
                    network: token.network.clone(),
                    symbol: token.symbol.clone(),
                    token_contract: builder.resolve_token(&token.network, &token.symbol)?,
                })
            })
            .collect()
    }

    /// Configured payees.
    pub fn get_recipients(&self) -> SettlementResult<Vec<RailRecipient>> {
        self.context
            .config()
            .recipients
            .iter()
            .map(|recipient| {
                Ok(RailRecipient {
                    network: recipient.network.clone(),
                    name: recipient.name.clone(),
                    address: parse_address("recipient", &recipient.address)?,
                })
            })
            .collect()
    }

    /// Transfers of the requested token from buyer to funder.
    pub async fn get_deposits(&self, request: &DepositRequest) -> SettlementResult<Vec<DepositRecord>> {
        let party = |field: &str, value: &Option<String>| match value {
            Some(value) => parse_address(field, value).map(Some),
            None => Ok(None),
        };
        let buyer = party("buyer", &request.buyer)?;
        let funder = party("funder", &request.funder)?;

        let builder = self.context.payment_builder();
        let token_contract = builder.resolve_token(&request.network, &request.symbol)?;

        let query = DepositQuery {
            network: request.network.clone(),
            buyer,
            funder,
            counterparty: request.counterparty.clone(),
            token_contract,
            decimals: 0,
            start: request.start,
            end: request.end,
        };
        // Reject bad parties and dates before reading decimals from the chain.
        let scanner = self.context.deposit_scanner();
        scanner.check(&query)?;

        let decimals = builder.token_decimals(&request.network, token_contract).await?;
        scanner
            .find_deposits(&DepositQuery { decimals, ..query })
            .await
    }

    pub async fn make_payment(&self, request: &PaymentRequest) -> SettlementResult<PaymentOutcome> {
        process_payment(&self.context, request).await
    }
}

/// Payments settled outside the system; only the reference is recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualRail;

impl ManualRail {
    pub fn make_payment(&self, request: &PaymentRequest) -> SettlementResult<PaymentOutcome> {
        let reference = request
            .reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| SettlementError::validation("manual payment requires a reference"))?;

        tracing::info!(
            contract_ref = %request.contract_ref,
            reference = %reference,
            amount = %request.amount,
            "Manual payment recorded"
        );
        Ok(PaymentOutcome::Recorded {
            reference: reference.to_string(),
        })
    }
}
