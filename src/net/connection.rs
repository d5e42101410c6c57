//! Connection record and lifecycle tracking.
//!
//! # Responsibilities
//! - Track connection state (Authorizing → Open → Closed)
//! - Generate unique connection IDs for tracing and for telling a
//!   superseded connection apart from its replacement
//! - Hand frames to the socket writer and carry the close signal
//!
//! A [`Connection`] never touches the socket itself. The session task that
//! owns the socket holds the matching [`Mailbox`].

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};

use crate::relay::RelayError;
use crate::routing::Address;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Authorization call in flight, not yet registered.
    Authorizing = 0,
    /// Registered and eligible for relay.
    Open = 1,
    /// Terminal.
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Authorizing,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorizing => "authorizing",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Why the gateway closed a connection on its own initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// A newer connection registered under the same address.
    Superseded,
    /// Closed through the admin API.
    Disconnected,
    /// The gateway is shutting down.
    Shutdown,
}

impl CloseCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Superseded => "superseded by a newer connection",
            Self::Disconnected => "disconnected by administrator",
            Self::Shutdown => "gateway shutting down",
        }
    }
}

/// Acknowledgement for a frame whose sender wants to know it was written.
pub type SendAck = oneshot::Sender<Result<(), RelayError>>;

/// A frame queued for the socket writer.
#[derive(Debug)]
pub enum Outbound {
    Text { text: String, ack: Option<SendAck> },
    Close(Option<CloseCause>),
}

/// Receiving halves owned by the session task.
#[derive(Debug)]
pub struct Mailbox {
    pub outbound: mpsc::Receiver<Outbound>,
    pub close: watch::Receiver<Option<CloseCause>>,
}

/// One logical client binding.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    address: Address,
    state: AtomicU8,
    outbound: mpsc::Sender<Outbound>,
    close: watch::Sender<Option<CloseCause>>,
    created: Instant,
}

impl Connection {
    /// Create a connection in the `Authorizing` state.
    pub fn new(address: Address, queue_depth: usize) -> (Arc<Self>, Mailbox) {
        let (outbound_tx, outbound_rx) = mpsc::channel(queue_depth);
        let (close_tx, close_rx) = watch::channel(None);

        let connection = Arc::new(Self {
            id: ConnectionId::new(),
            address,
            state: AtomicU8::new(ConnectionState::Authorizing as u8),
            outbound: outbound_tx,
            close: close_tx,
            created: Instant::now(),
        });
        let mailbox = Mailbox {
            outbound: outbound_rx,
            close: close_rx,
        };
        (connection, mailbox)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Time since the connection record was created.
    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }

    /// `Authorizing → Open`. Returns false if the connection already moved on.
    pub fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Authorizing as u8,
                ConnectionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn mark_closed(&self) {
        self.state.store(ConnectionState::Closed as u8, Ordering::Release);
    }

    /// Ask the session to close the socket. Only the first cause is kept;
    /// returns true for that first call.
    pub fn close(&self, cause: CloseCause) -> bool {
        let mut first = false;
        self.close.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(cause);
                first = true;
                true
            } else {
                false
            }
        });
        first
    }

    pub fn close_cause(&self) -> Option<CloseCause> {
        *self.close.borrow()
    }

    /// Write one text frame to the socket and wait until the writer reports
    /// the outcome.
    pub async fn send_text(&self, text: String) -> Result<(), RelayError> {
        if self.state() == ConnectionState::Closed || self.close_cause().is_some() {
            return Err(RelayError::ConnectionClosed);
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(Outbound::Text {
            text,
            ack: Some(ack_tx),
        })
        .await?;
        ack_rx.await.map_err(|_| RelayError::ConnectionClosed)?
    }

    /// Queue a frame for the writer without waiting for it to be written.
    pub async fn enqueue(&self, frame: Outbound) -> Result<(), RelayError> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| RelayError::ConnectionClosed)
    }
}
