//! Broadcast of signed transactions and receipt tracking.
//!
//! # Responsibilities
//! - Submit signed raw transactions
//! - Poll for the receipt until it appears or the deadline passes
//! - Classify receipts: status 1 is success, anything else is an error
//! - Write one pending audit event per audited broadcast

use alloy::primitives::{Address, Bytes, TxHash};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::audit::{AuditContext, AuditEvent, EventSink, LogEventSink};
use crate::blockchain::client::ChainRpc;
use crate::blockchain::types::TxReceipt;
use crate::config::BroadcastConfig;
use crate::error::{SettlementError, SettlementResult};
use crate::observability::metrics;

/// Shortest receipt poll period; `interval` rejects a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What to write to the audit collaborator for a broadcast.
#[derive(Debug, Clone, Copy)]
pub struct AuditTarget<'a> {
    pub context: &'a AuditContext,
    pub from: Address,
    pub to: Option<Address>,
}

/// Submits signed transactions and waits for their receipts.
#[derive(Clone)]
pub struct Broadcaster {
    receipt_timeout: Duration,
    poll_interval: Duration,
    release: String,
    events: Arc<dyn EventSink>,
}

impl Broadcaster {
    /// Create a broadcaster writing audit events to `events`.
    pub fn new(config: &BroadcastConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms).max(MIN_POLL_INTERVAL),
            release: config.release.clone(),
            events,
        }
    }

    /// Create a broadcaster that only logs audit events.
    pub fn with_log_events(config: &BroadcastConfig) -> Self {
        Self::new(config, Arc::new(LogEventSink))
    }

    /// Override the receipt deadline.
    pub fn with_receipt_timeout(mut self, receipt_timeout: Duration) -> Self {
        self.receipt_timeout = receipt_timeout;
        self
    }

    /// Submit a signed transaction and wait for its receipt.
    ///
    /// The pending audit event is written as soon as the node accepts the
    /// transaction, before waiting. A reverted transaction is returned as
    /// [`SettlementError::TransactionFailed`] with the receipt attached.
    pub async fn broadcast(
        &self,
        connection: &dyn ChainRpc,
        signed: &Bytes,
        audit: Option<AuditTarget<'_>>,
    ) -> SettlementResult<TxReceipt> {
        let network = connection.network().to_string();

        let tx_hash = connection.send_raw_transaction(signed).await.map_err(|e| {
            tracing::error!(network = %network, error = %e, "Broadcast failed");
            SettlementError::Rpc {
                network: network.clone(),
                operation: "broadcast",
                source: e,
            }
        })?;
        tracing::info!(network = %network, tx_hash = %tx_hash, "Transaction submitted");

        if let Some(target) = audit {
            self.emit_pending(&network, tx_hash, target).await;
        }

        let receipt = self.wait_for_receipt(connection, tx_hash).await?;

        if receipt.succeeded() {
            metrics::record_transaction(&network, "success");
            tracing::info!(
                network = %network,
                tx_hash = %tx_hash,
                block_number = ?receipt.block_number,
                gas_used = receipt.gas_used,
                "Transaction confirmed"
            );
            Ok(receipt)
        } else {
            metrics::record_transaction(&network, "failed");
            tracing::error!(
                network = %network,
                tx_hash = %tx_hash,
                status = receipt.status,
                "Transaction failed on-chain"
            );
            Err(SettlementError::TransactionFailed {
                receipt: Box::new(receipt),
            })
        }
    }

    /// Poll until the receipt of `tx_hash` is available.
    pub async fn wait_for_receipt(
        &self,
        connection: &dyn ChainRpc,
        tx_hash: TxHash,
    ) -> SettlementResult<TxReceipt> {
        let network = connection.network().to_string();
        let started = Instant::now();

        let result = timeout(self.receipt_timeout, async {
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match connection.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    Err(e) => return Err(e),
                }
            }
        })
        .await;

        match result {
            Ok(Ok(receipt)) => {
                metrics::record_receipt_wait(&network, started.elapsed());
                Ok(receipt)
            }
            Ok(Err(e)) => {
                tracing::error!(network = %network, tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                Err(SettlementError::Rpc {
                    network,
                    operation: "receipt lookup",
                    source: e,
                })
            }
            Err(_) => {
                metrics::record_transaction(&network, "timeout");
                tracing::error!(
                    network = %network,
                    tx_hash = %tx_hash,
                    timeout_secs = self.receipt_timeout.as_secs(),
                    "No receipt before deadline"
                );
                Err(SettlementError::ReceiptTimeout {
                    tx_hash: tx_hash.to_string(),
                    timeout_secs: self.receipt_timeout.as_secs(),
                })
            }
        }
    }

    async fn emit_pending(&self, network: &str, tx_hash: TxHash, target: AuditTarget<'_>) {
        let event = AuditEvent::pending(
            target.context,
            network,
            target.from,
            target.to,
            tx_hash,
            &self.release,
        );
        let event_id = event.id;

        // Audit failures are logged only; the broadcast result stands.
        if let Err(e) = self.events.create_pending_event(event).await {
            tracing::error!(
                event_id = %event_id,
                contract_ref = %target.context.contract_ref,
                tx_hash = %tx_hash,
                error = %e,
                "Failed to record pending audit event"
            );
        }
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("receipt_timeout", &self.receipt_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("release", &self.release)
            .finish()
    }
}
