//! Settlement context: every shared component, built once and passed explicitly.

use std::sync::Arc;

use crate::audit::{EventSink, LogEventSink};
use crate::blockchain::{Broadcaster, ConnectionRegistry, Connector, HttpConnector, NonceLocks, RemoteSigner};
use crate::config::validation::validate_config;
use crate::config::{session_token_from_env, SettlementConfig};
use crate::deposits::DepositScanner;
use crate::error::{SettlementError, SettlementResult};
use crate::payments::PaymentBuilder;

/// Owns the configuration, connection registry, signer, broadcaster and nonce locks.
#[derive(Debug)]
pub struct SettlementContext {
    config: Arc<SettlementConfig>,
    registry: ConnectionRegistry,
    signer: RemoteSigner,
    broadcaster: Broadcaster,
    nonce_locks: NonceLocks,
}

impl SettlementContext {
    /// Start building a context for `config`.
    pub fn builder(config: SettlementConfig) -> SettlementContextBuilder {
        SettlementContextBuilder {
            config,
            session_token: None,
            connector: None,
            events: None,
        }
    }

    /// Build a context with HTTP connections, log-only audit events and the
    /// session token taken from the environment.
    pub fn from_env(config: SettlementConfig) -> SettlementResult<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn signer(&self) -> &RemoteSigner {
        &self.signer
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn nonce_locks(&self) -> &NonceLocks {
        &self.nonce_locks
    }

    pub fn payment_builder(&self) -> PaymentBuilder<'_> {
        PaymentBuilder::new(&self.registry)
    }

    pub fn deposit_scanner(&self) -> DepositScanner<'_> {
        DepositScanner::new(&self.registry)
    }

    /// Drop cached connections and token decimals.
    pub fn reset(&self) {
        self.registry.reset();
    }
}

/// Builder for [`SettlementContext`].
pub struct SettlementContextBuilder {
    config: SettlementConfig,
    session_token: Option<String>,
    connector: Option<Arc<dyn Connector>>,
    events: Option<Arc<dyn EventSink>>,
}

impl SettlementContextBuilder {
    /// Use this session token instead of reading the environment.
    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Open chain connections through `connector`.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Write audit events to `events`.
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and assemble the context.
    pub fn build(self) -> SettlementResult<SettlementContext> {
        validate_config(&self.config).map_err(|errors| {
            let problems: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            SettlementError::validation(format!("invalid configuration: {}", problems.join(", ")))
        })?;

        let session_token = match self.session_token {
            Some(token) => token,
            None => session_token_from_env().map_err(|e| SettlementError::validation(e.to_string()))?,
        };

        let config = Arc::new(self.config);
        let connector = self.connector.unwrap_or_else(|| Arc::new(HttpConnector));
        let events = self.events.unwrap_or_else(|| Arc::new(LogEventSink));

        let signer = RemoteSigner::new(&config.signer, session_token)?;
        let broadcaster = Broadcaster::new(&config.broadcast, events);
        let registry = ConnectionRegistry::with_connector(config.clone(), connector);

        tracing::debug!(
            networks = config.networks.len(),
            tokens = config.tokens.len(),
            "Settlement context ready"
        );

        Ok(SettlementContext {
            config,
            registry,
            signer,
            broadcaster,
            nonce_locks: NonceLocks::new(),
        })
    }
}
