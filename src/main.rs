//! Edge gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                     EDGE GATEWAY                      │
//!                  │                                                       │
//!  Browser ───────▶│  request-id ─▶ trace ─▶ cors ─┬─▶ /health (local)     │
//!                  │                     │         │                       │
//!                  │               OPTIONS → 200   └─▶ proxy handler       │
//!                  │                                    │ rewrite /admin   │
//!                  │                                    │ ?token= → Bearer │
//!                  │                                    ▼                  │
//!  Browser ◀───────│  cors headers ◀─ hop-by-hop filter ◀── forwarder ◀────┼──── Backend
//!                  │                                    (or ws bridge)     │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config;
use edge_gateway::lifecycle::{wait_for_signal, Shutdown};
use edge_gateway::net;
use edge_gateway::observability::{logging, metrics};
use edge_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "edge-gateway", version, about = "CORS-permissive edge gateway")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = config::load(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    net::install_crypto_provider();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.url,
        rewrites = config.backend.rewrites.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
