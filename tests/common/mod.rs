//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use futures_util::StreamExt;
use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use ws_gateway::net::Registry;
use ws_gateway::{GatewayConfig, GatewayServer, Shutdown};

pub type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Messages seen by the mock backend, as `(address, body)`.
pub type Received = Arc<Mutex<Vec<(String, String)>>>;

#[derive(Clone, Default)]
struct MockState {
    /// Relay calls as they arrive, before any delay.
    arrived: Received,
    /// Relay calls that ran to completion.
    received: Received,
    /// Addresses refused on top of the `deny-*` rule.
    denied: Arc<Mutex<HashSet<String>>>,
}

/// Handle on a running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockBackend {
    /// Relay calls that ran to completion.
    pub fn received(&self) -> Vec<(String, String)> {
        self.state.received.lock().unwrap().clone()
    }

    /// Bodies of relay calls as they arrived, completed or not.
    pub fn arrived(&self) -> Vec<String> {
        self.state
            .arrived
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Refuse every later authorization for `address`.
    pub fn deny(&self, address: &str) {
        self.state.denied.lock().unwrap().insert(address.to_string());
    }
}

/// Start a mock backend on an ephemeral port.
///
/// Authorization (`GET /{address}`):
/// - `deny-*` and addresses passed to [`MockBackend::deny`] answer 200 with a
///   non-"ok" body
/// - `err-*` answers 500 with body "ok"
/// - anything else answers 200 "ok"
///
/// Relay (`POST /{address}`):
/// - bodies starting with `slow` are held for 200ms
/// - bodies starting with `stall` are held for 2s
/// - `silent` gets an empty reply
/// - everything else is echoed back as `echo:{body}`
pub async fn start_mock_backend() -> MockBackend {
    let state = MockState::default();

    let app = Router::new()
        .route("/{address}", get(authorize).post(relay))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, state }
}

async fn authorize(
    State(state): State<MockState>,
    Path(address): Path<String>,
) -> (StatusCode, String) {
    let refused = state.denied.lock().unwrap().contains(&address);
    if refused || address.starts_with("deny") {
        (StatusCode::OK, format!("address {address} is not welcome"))
    } else if address.starts_with("err") {
        (StatusCode::INTERNAL_SERVER_ERROR, "ok".into())
    } else {
        (StatusCode::OK, "ok".into())
    }
}

async fn relay(
    State(state): State<MockState>,
    Path(address): Path<String>,
    body: Bytes,
) -> String {
    let message = String::from_utf8_lossy(&body).into_owned();
    state
        .arrived
        .lock()
        .unwrap()
        .push((address.clone(), message.clone()));

    if message.starts_with("slow") {
        tokio::time::sleep(Duration::from_millis(200)).await;
    } else if message.starts_with("stall") {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    state.received.lock().unwrap().push((address, message.clone()));

    if message == "silent" {
        String::new()
    } else {
        format!("echo:{message}")
    }
}

/// Start a backend that accepts connections but never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Gateway config pointed at `backend`.
pub fn gateway_config(backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.listen = "127.0.0.1:0".into();
    config.backend.url = format!("http://{backend}/");
    config
}

/// Serve a gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Arc<Registry>, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = GatewayServer::new(config);
    let registry = server.registry();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    (addr, registry, shutdown)
}

/// Open a WebSocket to `ws://{gateway}/{address}`.
pub async fn connect(gateway: SocketAddr, address: &str) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{gateway}/{address}"))
        .await
        .unwrap();
    client
}

/// Next text frame, skipping control frames. Panics after two seconds.
pub async fn next_text(client: &mut Client) -> String {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("expected text frame, got {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for text frame")
}

/// Wait until the socket is closed by the gateway.
pub async fn expect_closed(client: &mut Client) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await
    .expect("socket was not closed");
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
