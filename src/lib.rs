//! WebSocket-to-HTTP gateway library.
//!
//! Bridges WebSocket clients to a plain HTTP backend. Each socket is bound
//! to an address (the first path segment); the backend authorizes it,
//! receives every message as a POST and answers in the response body, and
//! can push messages back by POSTing to the gateway.

pub mod admin;
pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod routing;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
