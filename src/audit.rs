//! Audit events written to the external event collaborator.
//!
//! The core only ever creates `pending` events. Flipping them to `complete`
//! or `failed` belongs to the collaborator once it has queried the chain.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Complete,
    Failed,
}

/// Caller-supplied context of a broadcast that should be audited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    /// Reference of the settlement contract the transaction belongs to.
    pub contract_ref: String,
    /// Kind of event (e.g., "payment", "settlement").
    pub event_type: String,
}

impl AuditContext {
    pub fn new(contract_ref: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            contract_ref: contract_ref.into(),
            event_type: event_type.into(),
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub contract_ref: String,
    pub network: String,
    pub from_addr: Address,
    pub to_addr: Option<Address>,
    pub tx_hash: TxHash,
    pub event_type: String,
    pub status: EventStatus,
    /// Release of the settlement core that wrote the event.
    pub release: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// A fresh `pending` event.
    pub fn pending(
        context: &AuditContext,
        network: &str,
        from_addr: Address,
        to_addr: Option<Address>,
        tx_hash: TxHash,
        release: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_ref: context.contract_ref.clone(),
            network: network.to_string(),
            from_addr,
            to_addr,
            tx_hash,
            event_type: context.event_type.clone(),
            status: EventStatus::Pending,
            release: release.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// The event/audit collaborator.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist a pending event. Errors are logged by the broadcaster and do not fail the broadcast.
    async fn create_pending_event(&self, event: AuditEvent) -> Result<(), String>;
}

/// Sink that only writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn create_pending_event(&self, event: AuditEvent) -> Result<(), String> {
        tracing::info!(
            event_id = %event.id,
            contract_ref = %event.contract_ref,
            network = %event.network,
            tx_hash = %event.tx_hash,
            event_type = %event.event_type,
            release = %event.release,
            "Pending audit event"
        );
        Ok(())
    }
}
