mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{keccak256, Bytes, U256};
use chain_settlement::audit::{AuditContext, EventStatus};
use chain_settlement::blockchain::{AuditTarget, Broadcaster, ConnectionRegistry};
use chain_settlement::payments::erc20::transfer_calldata;
use chain_settlement::payments::{PaymentAsset, PaymentBuilder};
use chain_settlement::SettlementError;
use common::{
    test_config, FakeChain, FakeConnector, RecordingSink, AVALANCHE_CHAIN_ID, BLOCK_GAS_LIMIT,
    BUYER, FUNDER, USDC,
};

const FIFTY_GWEI: u128 = 50_000_000_000;

fn registry_for(chain: Arc<FakeChain>) -> ConnectionRegistry {
    ConnectionRegistry::with_connector(
        Arc::new(test_config("http://127.0.0.1:1")),
        Arc::new(FakeConnector::new().with_chain(chain)),
    )
}

#[tokio::test]
async fn test_native_payment_is_plain_transfer() {
    let chain = Arc::new(FakeChain::avalanche());
    chain.set_nonce(7);
    let registry = registry_for(chain.clone());

    let prepared = PaymentBuilder::new(&registry)
        .build_payment(FUNDER, BUYER, "avalanche", "avax", "1.5")
        .await
        .unwrap();

    let tx = &prepared.transaction;
    assert_eq!(tx.from, FUNDER);
    assert_eq!(tx.to, Some(BUYER));
    assert_eq!(tx.value, U256::from(1_500_000_000_000_000_000u128));
    assert!(tx.data.is_empty());
    assert_eq!(tx.nonce, 7);
    assert_eq!(tx.gas_limit, 21_000);
    assert_eq!(tx.max_fee_per_gas, FIFTY_GWEI);
    assert_eq!(tx.max_priority_fee_per_gas, 0);
    assert_eq!(tx.chain_id.0, AVALANCHE_CHAIN_ID);
    assert_eq!(tx.tx_type, 2);
    assert!(matches!(prepared.asset, PaymentAsset::Native { ref symbol } if symbol == "AVAX"));
    assert!(chain.calls().is_empty(), "native payments read no decimals");
}

#[tokio::test]
async fn test_token_payment_calls_transfer() {
    let chain = Arc::new(FakeChain::avalanche());
    chain.set_decimals(6);
    let registry = registry_for(chain.clone());

    let prepared = PaymentBuilder::new(&registry)
        .build_payment(FUNDER, BUYER, "avalanche", "usdc", "20")
        .await
        .unwrap();

    let tx = &prepared.transaction;
    assert_eq!(tx.to, Some(USDC));
    assert_eq!(tx.value, U256::ZERO);
    assert_eq!(tx.data, transfer_calldata(BUYER, U256::from(20_000_000u64)));
    assert_eq!(prepared.recipient, BUYER);
    assert_eq!(prepared.amount.minor, U256::from(20_000_000u64));
    assert!(matches!(prepared.asset, PaymentAsset::Token { contract, .. } if contract == USDC));

    let estimates = chain.estimates();
    assert_eq!(estimates.len(), 1);
    assert_eq!(estimates[0].from, Some(FUNDER));
    assert_eq!(estimates[0].data, tx.data);
}

#[tokio::test]
async fn test_gas_limit_capped_at_block_limit() {
    let chain = Arc::new(FakeChain::avalanche());
    chain.set_gas_estimate(BLOCK_GAS_LIMIT * 2);
    let registry = registry_for(chain);

    let tx = PaymentBuilder::new(&registry)
        .build_native_payment(FUNDER, BUYER, "avalanche", U256::from(1u64))
        .await
        .unwrap();
    assert_eq!(tx.gas_limit, BLOCK_GAS_LIMIT);
}

#[tokio::test]
async fn test_nonce_is_fetched_for_every_build() {
    let chain = Arc::new(FakeChain::avalanche());
    let registry = registry_for(chain.clone());
    let builder = PaymentBuilder::new(&registry);

    chain.set_nonce(1);
    let first = builder
        .build_native_payment(FUNDER, BUYER, "avalanche", U256::from(1u64))
        .await
        .unwrap();
    chain.set_nonce(2);
    let second = builder
        .build_native_payment(FUNDER, BUYER, "avalanche", U256::from(1u64))
        .await
        .unwrap();

    assert_eq!((first.nonce, second.nonce), (1, 2));
    assert_eq!(chain.nonce_lookups(), 2);
}

#[tokio::test]
async fn test_unknown_token_is_validation_error() {
    let chain = Arc::new(FakeChain::avalanche());
    let registry = registry_for(chain.clone());

    let err = PaymentBuilder::new(&registry)
        .build_payment(FUNDER, BUYER, "avalanche", "DAI", "1")
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("DAI"));
    assert_eq!(chain.nonce_lookups(), 0);
}

#[tokio::test]
async fn test_bad_amounts_fail_before_building() {
    let chain = Arc::new(FakeChain::avalanche());
    let registry = registry_for(chain.clone());
    let builder = PaymentBuilder::new(&registry);

    for (symbol, amount) in [("USDC", "abc"), ("USDC", "-5"), ("AVAX", "1,5"), ("AVAX", "")] {
        let err = builder
            .build_payment(FUNDER, BUYER, "avalanche", symbol, amount)
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{} {:?}", symbol, amount);
    }
    assert!(chain.calls().is_empty());
    assert_eq!(chain.nonce_lookups(), 0);

    // More precision than the token carries.
    let err = builder
        .build_payment(FUNDER, BUYER, "avalanche", "USDC", "0.0000001")
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Validation(_)));
    assert_eq!(chain.nonce_lookups(), 0);
}

fn broadcaster(sink: Arc<RecordingSink>) -> Broadcaster {
    Broadcaster::new(&test_config("http://127.0.0.1:1").broadcast, sink)
}

#[tokio::test]
async fn test_broadcast_success_emits_one_pending_event() {
    let chain = FakeChain::avalanche();
    let sink = Arc::new(RecordingSink::new());
    let raw = Bytes::from_static(&[0x02, 0xf8, 0x6b]);
    let audit = AuditContext::new("contract-9", "payment");

    let receipt = broadcaster(sink.clone())
        .broadcast(
            &chain,
            &raw,
            Some(AuditTarget {
                context: &audit,
                from: FUNDER,
                to: Some(BUYER),
            }),
        )
        .await
        .unwrap();

    assert_eq!(receipt.tx_hash, keccak256(&raw));
    assert!(receipt.succeeded());
    assert_eq!(chain.sent(), vec![raw]);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Pending);
    assert_eq!(events[0].tx_hash, receipt.tx_hash);
    assert_eq!(events[0].contract_ref, "contract-9");
    assert_eq!(events[0].network, "avalanche");
    assert_eq!(events[0].from_addr, FUNDER);
    assert_eq!(events[0].to_addr, Some(BUYER));
    assert_eq!(events[0].release, "test-release");
}

#[tokio::test]
async fn test_zero_poll_interval_still_polls() {
    let chain = FakeChain::avalanche();
    let mut config = test_config("http://127.0.0.1:1").broadcast;
    config.poll_interval_ms = 0;
    let raw = Bytes::from_static(&[0x02, 0xf8, 0x01]);

    let receipt = Broadcaster::new(&config, Arc::new(RecordingSink::new()))
        .broadcast(&chain, &raw, None)
        .await
        .unwrap();
    assert_eq!(receipt.tx_hash, keccak256(&raw));
}

#[tokio::test]
async fn test_reverted_transaction_carries_receipt() {
    let chain = FakeChain::avalanche();
    chain.set_receipt_status(0);
    let sink = Arc::new(RecordingSink::new());
    let audit = AuditContext::new("contract-9", "payment");

    let err = broadcaster(sink.clone())
        .broadcast(
            &chain,
            &Bytes::from_static(&[0x02, 0x01]),
            Some(AuditTarget {
                context: &audit,
                from: FUNDER,
                to: None,
            }),
        )
        .await
        .unwrap_err();

    match err {
        SettlementError::TransactionFailed { receipt } => assert_eq!(receipt.status, 0),
        other => panic!("expected TransactionFailed, got {:?}", other),
    }
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn test_missing_receipt_times_out() {
    let chain = FakeChain::avalanche();
    chain.withhold_receipts();
    let sink = Arc::new(RecordingSink::new());
    let audit = AuditContext::new("contract-9", "payment");

    let err = broadcaster(sink.clone())
        .with_receipt_timeout(Duration::from_millis(100))
        .broadcast(
            &chain,
            &Bytes::from_static(&[0x02, 0x02]),
            Some(AuditTarget {
                context: &audit,
                from: FUNDER,
                to: Some(BUYER),
            }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SettlementError::ReceiptTimeout { .. }));
    assert_eq!(sink.events().len(), 1, "the pending record survives a timeout");
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_broadcast() {
    let chain = FakeChain::avalanche();
    let sink = Arc::new(RecordingSink::failing());
    let audit = AuditContext::new("contract-9", "payment");

    let receipt = broadcaster(sink.clone())
        .broadcast(
            &chain,
            &Bytes::from_static(&[0x02, 0x03]),
            Some(AuditTarget {
                context: &audit,
                from: FUNDER,
                to: Some(BUYER),
            }),
        )
        .await
        .unwrap();
    assert!(receipt.succeeded());
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn test_broadcast_without_audit_context() {
    let chain = FakeChain::avalanche();
    let sink = Arc::new(RecordingSink::new());

    broadcaster(sink.clone())
        .broadcast(&chain, &Bytes::from_static(&[0x02, 0x04]), None)
        .await
        .unwrap();
    assert!(sink.events().is_empty());
}
