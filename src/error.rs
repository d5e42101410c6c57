//! Request-scoped errors.
//!
//! Nothing here is fatal to the process: every variant belongs to one
//! request. The status each one maps to lives in `http::response`.

use thiserror::Error;

use crate::backend::BackendError;
use crate::relay::RelayError;
use crate::routing::{Address, InvalidAddress};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request path has no address segment.
    #[error("invalid url, use /address")]
    InvalidAddress,

    /// A non-POST request that does not ask for a WebSocket upgrade.
    #[error("no upgrade requested")]
    NoUpgradeRequested,

    /// Data-plane POST for an address with no open connection.
    #[error("no connection for address '{0}'")]
    UnknownAddress(Address),

    /// The data-plane POST body could not be read as text.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// The data-plane message could not be written to the socket.
    #[error("failed to deliver message: {0}")]
    Delivery(#[from] RelayError),

    /// Authorization call did not complete.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Backend refused the connection; the reason is echoed verbatim.
    #[error("{0}")]
    Denied(String),
}

impl From<InvalidAddress> for GatewayError {
    fn from(_: InvalidAddress) -> Self {
        Self::InvalidAddress
    }
}
