//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Start the admin API when enabled
//! - Close every live connection on shutdown

use axum::{routing::any, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::backend::BackendTarget;
use crate::config::{GatewayConfig, RelayConfig};
use crate::http::handler::gateway_handler;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::net::{CloseCause, Registry};

/// Application state injected into handlers.
///
/// Built once at startup; the registry is the only state shared between
/// request flows.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub backend: Arc<BackendTarget>,
    pub relay: RelayConfig,
    pub max_body_size: usize,
}

/// HTTP/WebSocket server for the gateway.
pub struct GatewayServer {
    router: Router,
    state: AppState,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new server with the given (validated) configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let state = AppState {
            registry: Arc::new(Registry::new()),
            backend: Arc::new(BackendTarget::from_config(&config.backend)),
            relay: config.relay.clone(),
            max_body_size: config.listener.max_body_size,
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The gateway router, for serving elsewhere or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.state.registry.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.state.backend.base_url(),
            "Gateway server starting"
        );

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_router =
                admin::setup_admin_router(self.state.registry.clone(), self.config.admin.api_key.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API stopped");
                }
            });
        }

        let registry = self.state.registry.clone();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                let closing = registry.close_all(CloseCause::Shutdown);
                tracing::info!(connections = closing, "Shutdown signal received, closing connections");
            })
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}
