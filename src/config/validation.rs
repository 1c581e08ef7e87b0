//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require every endpoint and contract address the relay cannot start without
//! - Validate value ranges (timeouts > 0, confirmations >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before any subsystem is constructed

use std::net::SocketAddr;

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::{RelayConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is missing")]
    Missing(&'static str),

    #[error("{field} is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Validate a fully-merged configuration (file + environment overrides).
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::invalid(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let chain = &config.blockchain;
    if chain.rpc_url.trim().is_empty() {
        errors.push(ValidationError::Missing("blockchain.rpc_url (RPC_URL)"));
    } else if let Err(e) = chain.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::invalid("blockchain.rpc_url", e.to_string()));
    }
    for (i, failover) in chain.failover_urls.iter().enumerate() {
        if let Err(e) = failover.parse::<url::Url>() {
            errors.push(ValidationError::invalid(
                format!("blockchain.failover_urls[{}]", i),
                e.to_string(),
            ));
        }
    }
    if chain.confirmation_blocks == 0 {
        errors.push(ValidationError::invalid(
            "blockchain.confirmation_blocks",
            "at least one confirmation is required",
        ));
    }
    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::invalid("blockchain.rpc_timeout_secs", "must be > 0"));
    }
    if chain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::invalid(
            "blockchain.confirmation_timeout_secs",
            "must be > 0",
        ));
    }
    if chain.poll_interval_ms == 0 {
        errors.push(ValidationError::invalid("blockchain.poll_interval_ms", "must be > 0"));
    }
    if !(chain.gas_price_multiplier >= 1.0) {
        errors.push(ValidationError::invalid(
            "blockchain.gas_price_multiplier",
            "must be >= 1.0",
        ));
    }

    check_address(&mut errors, "contracts.qna (CONTRACT_ADDRESS)", &config.contracts.qna);
    check_address(&mut errors, "contracts.token (BRAIN_TOKEN_ADDRESS)", &config.contracts.token);
    check_address(&mut errors, "contracts.swap (BRAIN_SWAP_ADDRESS)", &config.contracts.swap);

    if config.timeouts.request_secs <= chain.confirmation_timeout_secs {
        errors.push(ValidationError::invalid(
            "timeouts.request_secs",
            format!(
                "must exceed blockchain.confirmation_timeout_secs ({})",
                chain.confirmation_timeout_secs
            ),
        ));
    }

    if config.relay.swap_history_limit == 0 {
        errors.push(ValidationError::invalid("relay.swap_history_limit", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::invalid(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::invalid(
                "admin.api_key (RELAY_ADMIN_API_KEY)",
                "a real key is required when admin routes are enabled",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Missing(field));
    } else if let Err(e) = value.trim().parse::<Address>() {
        errors.push(ValidationError::invalid(field, e.to_string()));
    }
}
