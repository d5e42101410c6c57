//! Gateway request handler.
//!
//! Classifies every request into one of four outcomes:
//!
//! ```text
//! START ─ no address ─────────────────────────────→ 400
//!       ─ POST ─→ lookup → read body → socket send → 200 "ok" | 404 | 500
//!       ─ no Upgrade: websocket ──────────────────→ 500
//!       ─ upgrade ─→ authorize ─ transport error ─→ 502
//!                              ─ denied ──────────→ 403 (reason)
//!                              ─ allowed ─→ register → 101 → session
//! ```

use axum::{
    body::Body,
    extract::{ws::WebSocketUpgrade, ConnectInfo, FromRequestParts, State},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Instant;

use crate::backend::{self, Authorization, BackendChannel};
use crate::error::GatewayError;
use crate::http::request::{request_id, wants_websocket};
use crate::http::server::AppState;
use crate::net::Connection;
use crate::observability::metrics;
use crate::relay::{self, session};
use crate::routing::Address;

/// Entry point for every request on the gateway listener.
pub async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        peer = ?peer,
        "Routing request"
    );

    let response = match route(&state, request).await {
        Ok(response) => response,
        Err(error) => {
            let status = error.status();
            if status.is_server_error() {
                tracing::warn!(request_id = %request_id, path = %path, status = %status, error = %error, "Request failed");
            } else {
                tracing::debug!(request_id = %request_id, path = %path, status = %status, error = %error, "Request rejected");
            }
            error.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn route(state: &AppState, request: Request<Body>) -> Result<Response, GatewayError> {
    let address = Address::from_path(request.uri().path())?;

    if request.method() == Method::POST {
        return forward_to_socket(state, address, request.into_body()).await;
    }
    if !wants_websocket(request.headers()) {
        return Err(GatewayError::NoUpgradeRequested);
    }
    upgrade(state, address, request).await
}

/// Data-plane POST: the body becomes one text frame on the addressed socket.
async fn forward_to_socket(
    state: &AppState,
    address: Address,
    body: Body,
) -> Result<Response, GatewayError> {
    let connection = state
        .registry
        .lookup(address.as_str())
        .ok_or_else(|| GatewayError::UnknownAddress(address))?;

    let bytes = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(|e| GatewayError::BodyRead(e.to_string()))?;
    let text = String::from_utf8(bytes.to_vec()).map_err(|e| GatewayError::BodyRead(e.to_string()))?;

    relay::deliver(&connection, text, state.relay.send_timeout()).await?;
    Ok((StatusCode::OK, "ok").into_response())
}

/// Authorize with the backend, then complete the WebSocket handshake and
/// register the connection.
async fn upgrade(
    state: &AppState,
    address: Address,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let (mut parts, _body) = request.into_parts();

    let channel = BackendChannel::open(&state.backend, &address)?;
    let channel = match backend::authorize(channel).await? {
        Authorization::Allowed(channel) => channel,
        Authorization::Denied(reason) => {
            tracing::info!(address = %address, reason = %reason, "Connection denied by backend");
            return Err(GatewayError::Denied(reason));
        }
    };

    let ws: WebSocketUpgrade =
        match <WebSocketUpgrade as FromRequestParts<AppState>>::from_request_parts(&mut parts, state).await {
            Ok(ws) => ws,
            Err(rejection) => {
                tracing::warn!(address = %address, error = %rejection, "WebSocket handshake rejected");
                return Ok(rejection.into_response());
            }
        };

    let (connection, mailbox) = Connection::new(address, state.relay.queue_depth);
    connection.mark_open();
    state.registry.insert(connection.clone());

    let failed = connection.clone();
    let failed_registry = state.registry.clone();
    let registry = state.registry.clone();
    let queue_depth = state.relay.queue_depth;

    Ok(ws
        .on_failed_upgrade(move |error| {
            tracing::warn!(
                address = %failed.address(),
                connection_id = %failed.id(),
                error = %error,
                "WebSocket upgrade failed"
            );
            failed.mark_closed();
            failed_registry.remove(&failed);
        })
        .on_upgrade(move |socket| {
            session::run(socket, connection, mailbox, channel, registry, queue_depth)
        }))
}
