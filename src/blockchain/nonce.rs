//! Per-sender serialization of transaction submission.
//!
//! The nonce is read from the chain right before a transaction is built and is
//! never cached. Two overlapping submissions for the same sender would read the
//! same nonce, so callers hold the sender's lock from nonce fetch until the
//! receipt (or failure) comes back.

use alloy::primitives::Address;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async lock per (network, sender) pair.
#[derive(Debug, Clone, Default)]
pub struct NonceLocks {
    locks: Arc<DashMap<(String, Address), Arc<Mutex<()>>>>,
}

/// Held while a sender's transaction is in flight.
#[derive(Debug)]
pub struct SenderGuard {
    _guard: OwnedMutexGuard<()>,
}

impl NonceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other submission for `sender` on `network` is in flight.
    pub async fn acquire(&self, network: &str, sender: Address) -> SenderGuard {
        let lock = self
            .locks
            .entry((network.to_string(), sender))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        SenderGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of senders that have been seen.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
