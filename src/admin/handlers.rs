use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::net::CloseCause;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub active_connections: usize,
}

#[derive(Serialize)]
pub struct ConnectionStatus {
    pub address: String,
    pub connection_id: String,
    pub state: &'static str,
    pub connected_secs: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        active_connections: state.registry.len(),
    })
}

pub async fn get_connections(State(state): State<AdminState>) -> Json<Vec<ConnectionStatus>> {
    let mut connections: Vec<_> = state
        .registry
        .snapshot()
        .into_iter()
        .map(|conn| ConnectionStatus {
            address: conn.address().to_string(),
            connection_id: conn.id().to_string(),
            state: conn.state().as_str(),
            connected_secs: conn.age().as_secs(),
        })
        .collect();
    connections.sort_by(|a, b| a.address.cmp(&b.address));

    Json(connections)
}

pub async fn disconnect(
    State(state): State<AdminState>,
    Path(address): Path<String>,
) -> StatusCode {
    match state.registry.lookup(&address) {
        Some(conn) => {
            conn.close(CloseCause::Disconnected);
            tracing::info!(address = %address, connection_id = %conn.id(), "Connection closed by admin");
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}
