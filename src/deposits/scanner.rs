//! Incoming token transfer scanner.
//!
//! Resolves the date range to block heights, then walks the range in bounded
//! windows with one `Transfer` log query per window. Any chain failure aborts
//! the scan and nothing found so far is returned.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};

use crate::blockchain::client::ChainRpc;
use crate::blockchain::registry::ConnectionRegistry;
use crate::blockchain::types::{BlockRef, ChainError, ChainResult, LogQuery};
use crate::deposits::search::{block_from_date, block_windows};
use crate::deposits::types::{DepositQuery, DepositRecord, TOKEN_RAIL};
use crate::error::{SettlementError, SettlementResult};
use crate::observability::metrics;
use crate::payments::amount::TokenAmount;
use crate::payments::erc20::{address_topic, decode_transfer, transfer_topic};

/// Finds incoming ERC-20 transfers between two parties.
#[derive(Debug)]
pub struct DepositScanner<'a> {
    registry: &'a ConnectionRegistry,
    window_blocks: u64,
}

/// Query after validation.
#[derive(Debug)]
struct ScanPlan<'q> {
    query: &'q DepositQuery,
    buyer: Address,
    funder: Address,
    start: u64,
    end: u64,
}

impl<'a> DepositScanner<'a> {
    /// Create a scanner using the configured window size.
    pub fn new(registry: &'a ConnectionRegistry) -> Self {
        let window_blocks = registry.config().scanner.window_blocks;
        Self::with_window(registry, window_blocks)
    }

    /// Create a scanner with an explicit window size in blocks.
    pub fn with_window(registry: &'a ConnectionRegistry, window_blocks: u64) -> Self {
        Self {
            registry,
            window_blocks: window_blocks.max(1),
        }
    }

    /// Validate a query without touching the chain.
    pub fn check(&self, query: &DepositQuery) -> SettlementResult<()> {
        validate(query).map(|_| ())
    }

    /// Find every transfer of `token_contract` from buyer to funder in the date range.
    ///
    /// Input problems are reported before any network call. Records come back
    /// in block order.
    pub async fn find_deposits(&self, query: &DepositQuery) -> SettlementResult<Vec<DepositRecord>> {
        let plan = validate(query)?;
        let connection = self.registry.get_connection(&query.network).await?;

        match self.scan(&*connection, &plan).await {
            Ok(records) => {
                tracing::info!(
                    network = %query.network,
                    buyer = %plan.buyer,
                    funder = %plan.funder,
                    token = %query.token_contract,
                    deposits = records.len(),
                    "Deposit scan complete"
                );
                Ok(records)
            }
            Err(e) => {
                tracing::error!(
                    network = %query.network,
                    buyer = %plan.buyer,
                    funder = %plan.funder,
                    token = %query.token_contract,
                    error = %e,
                    "Deposit scan failed"
                );
                Err(SettlementError::ScanFailure {
                    network: query.network.clone(),
                    source: e,
                })
            }
        }
    }

    async fn scan(&self, connection: &dyn ChainRpc, plan: &ScanPlan<'_>) -> ChainResult<Vec<DepositRecord>> {
        let query = plan.query;
        let from_block = block_from_date(connection, plan.start).await?;
        let to_block = block_from_date(connection, plan.end).await?;

        let mut records = Vec::new();
        for (window_start, window_end) in block_windows(from_block, to_block, self.window_blocks) {
            let logs = connection
                .logs(&LogQuery {
                    from_block: window_start,
                    to_block: window_end,
                    address: query.token_contract,
                    topics: [
                        Some(transfer_topic()),
                        Some(address_topic(plan.buyer)),
                        Some(address_topic(plan.funder)),
                    ],
                })
                .await?;

            let found = logs.len();
            for log in &logs {
                let transfer = decode_transfer(log)?;
                let block_number = log
                    .block_number
                    .ok_or_else(|| ChainError::Decode("log without block number".to_string()))?;
                let tx_hash = log
                    .transaction_hash
                    .ok_or_else(|| ChainError::Decode("log without transaction hash".to_string()))?;

                let block = connection.block(BlockRef::Number(block_number)).await?;
                let timestamp = i64::try_from(block.timestamp)
                    .ok()
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                    .ok_or_else(|| {
                        ChainError::Decode(format!("block {} has timestamp {}", block_number, block.timestamp))
                    })?;

                records.push(DepositRecord {
                    rail: TOKEN_RAIL,
                    counterparty: query.counterparty.clone(),
                    tx_hash,
                    amount: TokenAmount::new(transfer.value, query.decimals),
                    block_number,
                    timestamp,
                });
            }

            metrics::record_deposit_window(&query.network, found);
            tracing::debug!(
                network = %query.network,
                from_block = window_start,
                to_block = window_end,
                found,
                "Scanned log window"
            );
        }

        Ok(records)
    }
}

fn validate(query: &DepositQuery) -> SettlementResult<ScanPlan<'_>> {
    let buyer = query
        .buyer
        .filter(|a| !a.is_zero())
        .ok_or_else(|| SettlementError::validation("buyer address is required"))?;
    let funder = query
        .funder
        .filter(|a| !a.is_zero())
        .ok_or_else(|| SettlementError::validation("funder address is required"))?;

    if query.start > query.end {
        return Err(SettlementError::validation(format!(
            "start date {} is after end date {}",
            query.start, query.end
        )));
    }
    let start = u64::try_from(query.start.timestamp())
        .map_err(|_| SettlementError::validation("start date is before the epoch"))?;
    let end = u64::try_from(query.end.timestamp())
        .map_err(|_| SettlementError::validation("end date is before the epoch"))?;

    Ok(ScanPlan {
        query,
        buyer,
        funder,
        start,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use chrono::TimeZone;

    fn query() -> DepositQuery {
        DepositQuery {
            network: "avalanche".to_string(),
            buyer: Some(address!("1111111111111111111111111111111111111111")),
            funder: Some(address!("2222222222222222222222222222222222222222")),
            counterparty: "Buyer Co".to_string(),
            token_contract: address!("b97ef9ef8734c71904d8002f8b6bc66dd9c48a6e"),
            decimals: 6,
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_query() {
        let query = query();
        let plan = validate(&query).unwrap();
        assert!(plan.start < plan.end);
    }

    #[test]
    fn test_validate_rejects_missing_parties() {
        let mut missing_buyer = query();
        missing_buyer.buyer = None;
        assert!(validate(&missing_buyer).unwrap_err().is_validation());

        let mut zero_funder = query();
        zero_funder.funder = Some(Address::ZERO);
        assert!(validate(&zero_funder).unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut inverted = query();
        std::mem::swap(&mut inverted.start, &mut inverted.end);
        let err = validate(&inverted).unwrap_err();
        assert!(err.to_string().contains("after end date"));
    }
}
