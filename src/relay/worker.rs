//! Socket → backend relay worker.
//!
//! One worker per connection drains the inbound queue strictly in order.
//! It owns the connection's backend channel; aborting the worker cancels the
//! call in flight and releases the channel.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::backend::BackendChannel;
use crate::net::{Connection, Outbound};
use crate::observability::metrics;

pub async fn run(
    connection: Arc<Connection>,
    channel: BackendChannel,
    mut inbound: mpsc::Receiver<String>,
) {
    while let Some(message) = inbound.recv().await {
        let reply = match channel.post_text(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    address = %connection.address(),
                    connection_id = %connection.id(),
                    error = %e,
                    "Relay to backend failed, message dropped"
                );
                metrics::record_relay("to_backend", "dropped");
                continue;
            }
        };

        let text = match reply.text() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    address = %connection.address(),
                    connection_id = %connection.id(),
                    status = %reply.status,
                    error = %e,
                    "Backend reply is not text, dropped"
                );
                metrics::record_relay("to_backend", "dropped");
                continue;
            }
        };
        metrics::record_relay("to_backend", "ok");

        if !reply.status.is_success() {
            tracing::debug!(
                address = %connection.address(),
                status = %reply.status,
                "Backend replied with non-success status"
            );
        }
        if text.is_empty() {
            continue;
        }

        let frame = Outbound::Text {
            text: text.to_owned(),
            ack: None,
        };
        if connection.enqueue(frame).await.is_err() {
            tracing::debug!(
                connection_id = %connection.id(),
                "Socket writer gone, stopping relay"
            );
            break;
        }
    }
}
