//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (tokens, contracts and recipients reference existing networks)
//! - Validate value ranges (timeouts > 0, window size > 0, parsable URLs and addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SettlementConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use std::collections::HashSet;

use crate::config::schema::SettlementConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &SettlementConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (i, network) in config.networks.iter().enumerate() {
        let field = format!("networks[{}]", i);
        if network.name.is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !names.insert(network.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate network '{}'", network.name),
            ));
        }
        if url::Url::parse(&network.rpc_url).is_err() {
            errors.push(ValidationError::new(
                format!("{}.rpc_url", field),
                format!("invalid URL '{}'", network.rpc_url),
            ));
        }
        if network.native_symbol.is_empty() {
            errors.push(ValidationError::new(
                format!("{}.native_symbol", field),
                "must not be empty",
            ));
        }
        if network.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new(
                format!("{}.rpc_timeout_secs", field),
                "must be greater than zero",
            ));
        }
    }

    for (i, token) in config.tokens.iter().enumerate() {
        let field = format!("tokens[{}]", i);
        if !names.contains(token.network.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.network", field),
                format!("unknown network '{}'", token.network),
            ));
        }
        if token.address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                format!("{}.address", field),
                format!("invalid address '{}'", token.address),
            ));
        }
    }

    for (i, contract) in config.contracts.iter().enumerate() {
        let field = format!("contracts[{}]", i);
        if !names.contains(contract.network.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.network", field),
                format!("unknown network '{}'", contract.network),
            ));
        }
        if contract.address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                format!("{}.address", field),
                format!("invalid address '{}'", contract.address),
            ));
        }
    }

    for (i, recipient) in config.recipients.iter().enumerate() {
        let field = format!("recipients[{}]", i);
        if !names.contains(recipient.network.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.network", field),
                format!("unknown network '{}'", recipient.network),
            ));
        }
        if recipient.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        }
        if recipient.address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                format!("{}.address", field),
                format!("invalid address '{}'", recipient.address),
            ));
        }
    }

    if !config.signer.url.is_empty() && url::Url::parse(&config.signer.url).is_err() {
        errors.push(ValidationError::new(
            "signer.url",
            format!("invalid URL '{}'", config.signer.url),
        ));
    }
    if config.broadcast.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "broadcast.receipt_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.broadcast.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "broadcast.poll_interval_ms",
            "must be greater than zero",
        ));
    }
    if config.scanner.window_blocks == 0 {
        errors.push(ValidationError::new(
            "scanner.window_blocks",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
