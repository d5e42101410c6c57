//! Admin API: gateway status and live connection management.
//!
//! Served on its own listener, behind a bearer token.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::net::Registry;

#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<Registry>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(registry: Arc<Registry>, api_key: String) -> Router {
    let state = AdminState {
        registry,
        api_key: api_key.into(),
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/connections", get(get_connections))
        .route("/admin/connections/{address}", delete(disconnect))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
