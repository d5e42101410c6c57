//! WebSocket-to-HTTP gateway.
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!   WS client ────────▶│ /{address}  upgrade ─▶ GET  {url}{address}   │──▶ Backend
//!                      │                        body "ok" → 101       │
//!   WS message ───────▶│ session ─▶ worker ───▶ POST {url}{address}   │──▶ Backend
//!   WS reply   ◀───────│ writer  ◀──────────── response body          │◀──
//!                      │                                              │
//!   POST /{address} ──▶│ registry lookup ─▶ writer ─▶ socket          │◀── Backend
//!                      └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use ws_gateway::config::loader::{load_config, validate};
use ws_gateway::config::GatewayConfig;
use ws_gateway::lifecycle::{signals, Shutdown};
use ws_gateway::net::listener;
use ws_gateway::observability::{logging, metrics};
use ws_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "ws-gateway", version)]
#[command(about = "Bridges WebSocket clients to a plain HTTP backend", long_about = None)]
struct Cli {
    /// host:port to bind (default ":4000")
    #[arg(long)]
    listen: Option<String>,

    /// Backend base URL; the address is appended (default "http://localhost:5000/")
    #[arg(long)]
    url: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    let config = validate(config.with_overrides(cli.listen, cli.url))?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ws-gateway starting");
    tracing::info!(
        listen = %config.listener.listen,
        backend = %config.backend.url,
        request_timeout_secs = config.backend.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = GatewayServer::new(config);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
