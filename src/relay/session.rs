//! Per-connection session task.
//!
//! Owns the upgraded socket for its whole life and reacts to one stream of
//! events: frames from the client, and the connection's close signal. Every
//! way out of the loop runs the same cleanup, so the registry entry and the
//! backend channel are always released.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::backend::BackendChannel;
use crate::net::{CloseCause, Connection, ConnectionId, Mailbox, Outbound, Registry};
use crate::observability::metrics;
use crate::relay::{worker, RelayError};
use crate::routing::Address;

/// How long the writer gets to flush queued frames and the close frame.
const WRITER_DRAIN: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum SessionEnd {
    ClientClosed,
    StreamEnded,
    SocketError(String),
    RelayStopped,
    Released(CloseCause),
}

/// Drive one upgraded socket until it closes.
pub async fn run(
    socket: WebSocket,
    connection: Arc<Connection>,
    mailbox: Mailbox,
    channel: BackendChannel,
    registry: Arc<Registry>,
    queue_depth: usize,
) {
    let Mailbox { outbound, mut close } = mailbox;
    let (sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(write_loop(
        sink,
        outbound,
        connection.address().clone(),
        connection.id(),
    ));
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(queue_depth);
    let relay = tokio::spawn(worker::run(connection.clone(), channel, inbound_rx));

    metrics::connection_opened();
    tracing::info!(
        address = %connection.address(),
        connection_id = %connection.id(),
        "Connection open"
    );

    // A text frame waiting for room in the inbound queue. While one is held
    // no further frames are read, but the close signal is still watched.
    let mut pending: Option<String> = None;

    let end = loop {
        tokio::select! {
            biased;

            changed = close.changed() => {
                if changed.is_err() {
                    break SessionEnd::Released(CloseCause::Shutdown);
                }
                let cause = *close.borrow_and_update();
                if let Some(cause) = cause {
                    break SessionEnd::Released(cause);
                }
            }
            permit = inbound_tx.reserve(), if pending.is_some() => match (permit, pending.take()) {
                (Ok(permit), Some(text)) => permit.send(text),
                _ => break SessionEnd::RelayStopped,
            },
            frame = stream.next(), if pending.is_none() => match frame {
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(connection_id = %connection.id(), len = text.as_str().len(), "Message received");
                    pending = Some(text.as_str().to_owned());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::warn!(
                        address = %connection.address(),
                        connection_id = %connection.id(),
                        bytes = data.len(),
                        "Binary messages are not supported, discarded"
                    );
                }
                Some(Ok(Message::Close(_))) => break SessionEnd::ClientClosed,
                // ping/pong are answered by the protocol layer
                Some(Ok(_)) => {}
                Some(Err(e)) => break SessionEnd::SocketError(e.to_string()),
                None => break SessionEnd::StreamEnded,
            }
        }
    };

    if let Some(text) = pending {
        tracing::debug!(
            connection_id = %connection.id(),
            len = text.len(),
            "Connection closing, queued message dropped"
        );
    }
    drop(inbound_tx);
    relay.abort();
    connection.mark_closed();
    let removed = registry.remove(&connection);

    let cause = match end {
        SessionEnd::Released(cause) => Some(cause),
        _ => None,
    };
    if timeout(WRITER_DRAIN, connection.enqueue(Outbound::Close(cause)))
        .await
        .is_err()
    {
        tracing::debug!(connection_id = %connection.id(), "Outbound queue full, skipping close frame");
    }
    if timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        tracing::warn!(connection_id = %connection.id(), "Socket writer did not drain in time");
        writer.abort();
    }

    metrics::connection_closed();
    match &end {
        SessionEnd::SocketError(error) => tracing::warn!(
            address = %connection.address(),
            connection_id = %connection.id(),
            error = %error,
            removed,
            "Connection closed on socket error"
        ),
        _ => tracing::info!(
            address = %connection.address(),
            connection_id = %connection.id(),
            reason = ?end,
            removed,
            "Connection closed"
        ),
    }
}

fn close_frame(cause: CloseCause) -> CloseFrame {
    let code = match cause {
        CloseCause::Shutdown => close_code::AWAY,
        CloseCause::Superseded | CloseCause::Disconnected => close_code::NORMAL,
    };
    CloseFrame {
        code,
        reason: cause.as_str().into(),
    }
}

/// Sole owner of the socket sink. Send failures are reported to whoever
/// asked for an acknowledgement and otherwise logged; they do not end the
/// connection.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
    address: Address,
    id: ConnectionId,
) {
    while let Some(frame) = outbound.recv().await {
        match frame {
            Outbound::Text { text, ack } => {
                let result = sink
                    .send(Message::Text(text.into()))
                    .await
                    .map_err(|e| RelayError::Send(e.to_string()));
                if let Err(e) = &result {
                    tracing::warn!(
                        address = %address,
                        connection_id = %id,
                        error = %e,
                        "Socket send failed"
                    );
                }
                if let Some(ack) = ack {
                    let _ = ack.send(result);
                }
            }
            Outbound::Close(cause) => {
                if let Err(e) = sink.send(Message::Close(cause.map(close_frame))).await {
                    tracing::debug!(connection_id = %id, error = %e, "Close frame not sent");
                }
                break;
            }
        }
    }
}
