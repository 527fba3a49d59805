//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check relay and preload entries name real streams
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{section} entry {index} has an empty stream name")]
    EmptyName { section: &'static str, index: usize },

    #[error("relay entry {index} forwards stream '{name}' to itself")]
    RelayLoop { index: usize, name: String },
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }

    let protocol = &config.protocol;
    if protocol.stall_limit == 0 {
        errors.push(ValidationError::Zero("protocol.stall_limit"));
    }
    if protocol.max_data_size == 0 {
        errors.push(ValidationError::Zero("protocol.max_data_size"));
    }
    if protocol.read_timeout_ms == 0 {
        // a zero read timeout means "block forever" to the socket layer
        errors.push(ValidationError::Zero("protocol.read_timeout_ms"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    for (index, preload) in config.preload.iter().enumerate() {
        if preload.name.is_empty() {
            errors.push(ValidationError::EmptyName {
                section: "preload",
                index,
            });
        }
    }

    for (index, route) in config.relay.iter().enumerate() {
        if route.from.is_empty() || route.to.is_empty() {
            errors.push(ValidationError::EmptyName {
                section: "relay",
                index,
            });
        } else if route.from == route.to {
            errors.push(ValidationError::RelayLoop {
                index,
                name: route.from.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
