//! Payment transaction shapes.
//!
//! A payment in the network's native symbol is a plain value transfer. Any
//! other symbol must be a configured ERC-20 token and becomes a zero-value
//! `transfer(to, amount)` call on the token contract.

use alloy::primitives::{Address, Bytes, U256};
use std::str::FromStr;

use crate::blockchain::registry::ConnectionRegistry;
use crate::blockchain::transaction::{TxBuilder, UnsignedTransaction};
use crate::error::{SettlementError, SettlementResult};
use crate::payments::amount::{split_decimal, TokenAmount};
use crate::payments::erc20::{read_decimals, transfer_calldata};
use crate::payments::types::{PaymentAsset, PreparedPayment};

/// Builds payment transactions against the registry's connections.
#[derive(Debug, Clone, Copy)]
pub struct PaymentBuilder<'a> {
    registry: &'a ConnectionRegistry,
}

impl<'a> PaymentBuilder<'a> {
    pub fn new(registry: &'a ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Build a payment of `amount` `symbol` from `from` to `to`.
    pub async fn build_payment(
        &self,
        from: Address,
        to: Address,
        network: &str,
        symbol: &str,
        amount: &str,
    ) -> SettlementResult<PreparedPayment> {
        let descriptor = self.registry.network(network)?;

        if symbol.eq_ignore_ascii_case(&descriptor.native_symbol) {
            let amount = TokenAmount::parse(amount, descriptor.native_decimals)?;
            let transaction = self.build_native_payment(from, to, network, amount.minor).await?;
            return Ok(PreparedPayment {
                transaction,
                recipient: to,
                asset: PaymentAsset::Native {
                    symbol: descriptor.native_symbol,
                },
                amount,
            });
        }

        let contract = self.resolve_token(network, symbol)?;
        split_decimal(amount)?;
        let decimals = self.token_decimals(network, contract).await?;
        let amount = TokenAmount::parse(amount, decimals)?;
        let transaction = self
            .build_token_payment(from, to, network, contract, amount.minor)
            .await?;

        Ok(PreparedPayment {
            transaction,
            recipient: to,
            asset: PaymentAsset::Token {
                symbol: symbol.to_string(),
                contract,
            },
            amount,
        })
    }

    /// Plain value transfer with empty call data.
    pub async fn build_native_payment(
        &self,
        from: Address,
        to: Address,
        network: &str,
        value: U256,
    ) -> SettlementResult<UnsignedTransaction> {
        let descriptor = self.registry.network(network)?;
        let connection = self.registry.get_connection(network).await?;
        TxBuilder::new(&*connection, &descriptor)
            .prepare(from, Some(to), value, Bytes::new())
            .await
    }

    /// `transfer(to, amount)` on `token_contract` with zero native value.
    pub async fn build_token_payment(
        &self,
        from: Address,
        to: Address,
        network: &str,
        token_contract: Address,
        amount: U256,
    ) -> SettlementResult<UnsignedTransaction> {
        let descriptor = self.registry.network(network)?;
        let connection = self.registry.get_connection(network).await?;
        TxBuilder::new(&*connection, &descriptor)
            .prepare(
                from,
                Some(token_contract),
                U256::ZERO,
                transfer_calldata(to, amount),
            )
            .await
    }

    /// Contract address of a configured token. Symbols match case-insensitively.
    pub fn resolve_token(&self, network: &str, symbol: &str) -> SettlementResult<Address> {
        let token = self.registry.config().token(network, symbol).ok_or_else(|| {
            SettlementError::validation(format!(
                "token '{}' is not configured on network '{}'",
                symbol, network
            ))
        })?;
        Address::from_str(&token.address).map_err(|e| {
            SettlementError::validation(format!(
                "token '{}' has invalid address '{}': {}",
                symbol, token.address, e
            ))
        })
    }

    /// On-chain `decimals()` of a token, cached per network and contract.
    pub async fn token_decimals(&self, network: &str, token: Address) -> SettlementResult<u8> {
        if let Some(decimals) = self.registry.cached_decimals(network, token) {
            return Ok(decimals);
        }

        let connection = self.registry.get_connection(network).await?;
        let decimals = read_decimals(&*connection, token).await.map_err(|e| {
            tracing::error!(network = %network, token = %token, error = %e, "decimals() call failed");
            SettlementError::Rpc {
                network: network.to_string(),
                operation: "decimals lookup",
                source: e,
            }
        })?;

        self.registry.cache_decimals(network, token, decimals);
        tracing::debug!(network = %network, token = %token, decimals, "Token decimals cached");
        Ok(decimals)
    }
}
