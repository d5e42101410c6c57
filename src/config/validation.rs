//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that the backend URL can have an address appended to it
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, PLACEHOLDER_API_KEY};
use crate::net::listener::parse_listen;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = parse_listen(&config.listener.listen) {
        errors.push(ValidationError::new("listener.listen", e.to_string()));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be greater than 0"));
    }

    match url::Url::parse(&config.backend.url) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::new(
            "backend.url",
            format!("unsupported scheme '{}', only http is supported", url.scheme()),
        )),
        Ok(url) if url.cannot_be_a_base() => {
            errors.push(ValidationError::new("backend.url", "must be an absolute URL"))
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("backend.url", e.to_string())),
    }

    for (field, value) in [
        ("backend.connect_timeout_secs", config.backend.connect_timeout_secs),
        ("backend.request_timeout_secs", config.backend.request_timeout_secs),
        ("relay.send_timeout_secs", config.relay.send_timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
    // the router timeout must not fire before the backend or relay bound does
    let inner = config
        .backend
        .request_timeout_secs
        .max(config.relay.send_timeout_secs);
    if config.timeouts.request_secs != 0 && config.timeouts.request_secs <= inner {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed backend.request_timeout_secs and relay.send_timeout_secs ({inner}s)"
            ),
        ));
    }
    if config.relay.queue_depth == 0 {
        errors.push(ValidationError::new("relay.queue_depth", "must be greater than 0"));
    }
    if config.backend.max_response_size == 0 {
        errors.push(ValidationError::new("backend.max_response_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new("admin.api_key", "must be set when the admin API is enabled"));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("'{}' is not a socket address", config.admin.bind_address),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
