//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse the `listen` setting (`[host]:port`)
//! - Bind to the configured address
//!
//! An empty host binds every interface, so `":4000"` listens on `0.0.0.0:4000`.

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The `listen` setting is malformed.
    #[error("invalid listen address '{0}': {1}")]
    InvalidAddress(String, &'static str),
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

/// Normalize a `listen` value into something `TcpListener::bind` accepts.
pub fn parse_listen(listen: &str) -> Result<String, ListenerError> {
    let Some((host, port)) = listen.rsplit_once(':') else {
        return Err(ListenerError::InvalidAddress(listen.to_string(), "expected host:port"));
    };
    let port: u16 = port
        .parse()
        .map_err(|_| ListenerError::InvalidAddress(listen.to_string(), "port is not a number in 0-65535"))?;
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok(format!("{host}:{port}"))
}

/// Bind to the configured address.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let addr = parse_listen(&config.listen)?;
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(
        address = %listener.local_addr()?,
        "Listener bound"
    );
    Ok(listener)
}
