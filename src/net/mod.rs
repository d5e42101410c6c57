//! Network layer: listener binding, connection records and the registry.
//!
//! # Data Flow
//! ```text
//! listener.rs  → bound TcpListener handed to axum
//! connection.rs → one record per client binding (id, state, outbound queue)
//! registry.rs   → address → connection, shared by every request flow
//! ```

pub mod connection;
pub mod listener;
pub mod registry;

pub use connection::{CloseCause, Connection, ConnectionId, ConnectionState, Mailbox, Outbound};
pub use registry::Registry;
