//! Message relay between sockets and the backend.
//!
//! # Data Flow
//! ```text
//! Socket → Backend:
//!     session.rs reads a text frame
//!     → per-connection inbound queue
//!     → worker.rs (one message at a time) → BackendChannel::post_text
//!     → non-empty reply → outbound queue → session writer → socket
//!
//! Backend/Client → Socket (data-plane POST):
//!     http handler → Registry::lookup → deliver()
//!     → outbound queue → session writer → socket → ack
//! ```
//!
//! # Design Decisions
//! - A single worker per connection serializes the backend round-trips, so
//!   replies come back in the order messages arrived
//! - A single writer per connection owns the socket sink; everything that
//!   writes goes through its queue
//! - Relay failures on socket events are logged and dropped, never retried

pub mod session;
pub mod worker;

use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::net::Connection;
use crate::observability::metrics;

/// Errors delivering a frame into a socket.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The connection is closed or closing.
    #[error("connection closed")]
    ConnectionClosed,

    /// The socket rejected the frame.
    #[error("socket send failed: {0}")]
    Send(String),

    /// The writer did not report back in time.
    #[error("socket send timed out after {0:?}")]
    Timeout(Duration),
}

/// Deliver a data-plane message into `connection`'s socket, waiting at most
/// `send_timeout` for the write to complete.
pub async fn deliver(
    connection: &Connection,
    text: String,
    send_timeout: Duration,
) -> Result<(), RelayError> {
    let result = match timeout(send_timeout, connection.send_text(text)).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::Timeout(send_timeout)),
    };

    match &result {
        Ok(()) => metrics::record_relay("to_socket", "ok"),
        Err(e) => {
            tracing::warn!(
                address = %connection.address(),
                connection_id = %connection.id(),
                error = %e,
                "Data-plane delivery failed"
            );
            metrics::record_relay("to_socket", "failed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Outbound;
    use crate::routing::Address;

    #[tokio::test]
    async fn stalled_writer_times_out() {
        let (conn, _mailbox) = Connection::new(Address::from_path("/a").unwrap(), 4);
        conn.mark_open();

        let err = deliver(&conn, "hello".into(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Timeout(_)));
    }

    #[tokio::test]
    async fn acknowledged_write_succeeds() {
        let (conn, mut mailbox) = Connection::new(Address::from_path("/a").unwrap(), 4);
        conn.mark_open();
        tokio::spawn(async move {
            if let Some(Outbound::Text { ack: Some(ack), .. }) = mailbox.outbound.recv().await {
                let _ = ack.send(Ok(()));
            }
        });

        deliver(&conn, "hello".into(), Duration::from_secs(1))
            .await
            .unwrap();
    }
}
