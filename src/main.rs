//! Terminal gateway (v1)
//!
//! HTTP service translating terminal Field/Value XML into postal lookups,
//! reverse geocoding, text correction and weight/item simulations.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────┐
//!                              │                 TERMINAL GATEWAY                 │
//!     Terminal Request         │  ┌─────────┐   ┌─────────┐   ┌──────────────┐    │
//!     ─────────────────────────┼─▶│  http   │──▶│   xml   │──▶│   handlers   │────┼──▶ ViaCEP
//!                              │  │ request │   │ parser/ │   │ postal, geo, │    │    Nominatim
//!                              │  │ resolver│   │ extract │   │ text, weight,│◀───┼─── Groq
//!                              │  └─────────┘   └─────────┘   │ item         │    │
//!     Terminal Response        │  ┌─────────┐   ┌─────────┐   └──────┬───────┘    │
//!     ◀────────────────────────┼──│response │◀──│  xml    │◀─────────┘            │
//!      (UTF-16 XML)            │  │ encoder │   │ writer  │                       │
//!                              │  └─────────┘   └─────────┘                       │
//!                              │  config · error · state · observability · lifecycle
//!                              └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terminal_gateway::config::{load_config, GatewayConfig};
use terminal_gateway::lifecycle::{signals, Shutdown};
use terminal_gateway::observability::metrics;
use terminal_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "terminal-gateway")]
#[command(about = "Field/Value XML gateway for kiosk terminals", long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    // Initialize tracing subscriber
    let default_filter = format!(
        "terminal_gateway={},tower_http={}",
        config.observability.log_level, config.observability.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("terminal-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        config_file = ?args.config,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    signals::spawn_signal_listener(shutdown.clone());
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
