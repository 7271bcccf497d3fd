//! Correlation-tracked HTTP service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ correlation layer ─▶ trace ─▶ timeout ─▶ catch-panic ─▶ handlers
//!                        │ propagate or generate id                            │
//!                        │ open request span (correlation_id)                  │ relay
//!                        │                                                     ▼
//!     Client Response    │                                          downstream service
//!     ◀──────────────────┘ stamp header, log completion          (id propagated on call)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use correlation_tracker::config::{load_config, ServiceConfig};
use correlation_tracker::observability::{logging, metrics};
use correlation_tracker::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "correlation-tracker")]
#[command(about = "HTTP service with request correlation tracking", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;

    tracing::info!("correlation-tracker v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        header = %config.correlation.header_name,
        request_timeout_secs = config.timeouts.request_secs,
        downstream = ?config.downstream.base_url,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
