//! Backend service client.
//!
//! # Responsibilities
//! - Build the per-address backend URL (`base url + address`)
//! - Open one pooled channel per logical connection
//! - Authorize proposed connections (`GET`) and relay messages (`POST`)
//! - Bound every call with a timeout
//!
//! # Data Flow
//! ```text
//! upgrade request → BackendChannel::open → auth::authorize (GET)
//!     → Allowed(channel) → channel moves into the connection's relay worker
//!     → every socket message → channel.post_text (POST)
//! ```
//!
//! # Design Decisions
//! - The channel created for authorization is the one reused for relay,
//!   so pooling is per connection and never shared across connections
//! - No retries: failures surface to the caller or are logged and dropped

pub mod auth;
pub mod channel;

use axum::body::Bytes;
use axum::http::Uri;
use std::time::Duration;
use thiserror::Error;

use crate::config::BackendConfig;
use crate::routing::Address;

pub use auth::{authorize, Authorization};
pub use channel::{BackendChannel, BackendReply};

/// Errors from a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// `base url + address` is not a valid request URI.
    #[error("invalid backend url '{0}'")]
    InvalidUrl(String),

    /// The outbound request could not be built.
    #[error("could not build backend request: {0}")]
    Request(String),

    /// Connection or protocol failure.
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// The call did not finish in time.
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be read or is not text.
    #[error("unreadable backend response: {0}")]
    Body(String),

    /// The response body ran past `limit`; `prefix` holds the bytes read up
    /// to the limit.
    #[error("backend response exceeds {limit} bytes")]
    TooLarge { limit: usize, prefix: Bytes },
}

/// Where and how to reach the backend.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    base_url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    max_response_size: usize,
}

impl BackendTarget {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            base_url: config.url.clone(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            max_response_size: config.max_response_size,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base url + address`, appended verbatim.
    pub fn uri_for(&self, address: &Address) -> Result<Uri, BackendError> {
        let raw = format!("{}{}", self.base_url, address);
        raw.parse::<Uri>()
            .map_err(|_| BackendError::InvalidUrl(raw))
    }
}

/// Render an error with its source chain, for log lines and 502 bodies.
pub(crate) fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_appended_to_base() {
        let target = BackendTarget::from_config(&BackendConfig::default());
        let address = Address::from_path("/room-7").unwrap();
        assert_eq!(
            target.uri_for(&address).unwrap().to_string(),
            "http://localhost:5000/room-7"
        );
    }

    #[test]
    fn base_without_trailing_slash_is_used_verbatim() {
        let config = BackendConfig {
            url: "http://localhost:5000/hook?addr=".into(),
            ..BackendConfig::default()
        };
        let target = BackendTarget::from_config(&config);
        let uri = target.uri_for(&Address::from_path("/x").unwrap()).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:5000/hook?addr=x");
    }

    #[test]
    fn invalid_base_is_reported() {
        let config = BackendConfig {
            url: "http://bad host/".into(),
            ..BackendConfig::default()
        };
        let target = BackendTarget::from_config(&config);
        let err = target.uri_for(&Address::from_path("/x").unwrap()).unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }
}
