//! RAG gateway.
//!
//! A thin HTTP gateway in front of a retrieval-augmented-generation backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────┐
//!                          │                  RAG GATEWAY                  │
//!     Client Request       │  ┌─────────┐   ┌──────────┐   ┌────────────┐  │
//!     ─────────────────────┼─▶│  http   │──▶│  relay   │──▶│  backend   │──┼──▶ RAG backend
//!                          │  │ server  │   │ handlers │   │   client   │  │    /query
//!     Client Response      │  └─────────┘   └──────────┘   └────────────┘  │    /reset
//!     ◀────────────────────┼── response relay (status, headers, body) ◀───┼─── /add_pdf
//!                          │                                               │
//!                          │  config (+ hot reload) · observability ·      │
//!                          │  lifecycle (signals, graceful shutdown)       │
//!                          └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;

use rag_gateway::config::ConfigWatcher;
use rag_gateway::http::HttpServer;
use rag_gateway::lifecycle::startup::{self, StartupError};
use rag_gateway::lifecycle::{signals, Shutdown};
use rag_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "rag-gateway")]
#[command(about = "HTTP gateway relaying questions and documents to a RAG backend", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("rag-gateway: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    if dotenvy::dotenv().is_err() {
        eprintln!("No .env file found, using process environment");
    }

    let args = Args::parse();
    let config = startup::load(args.config.as_deref())?;

    logging::init_logging(&config.observability)?;
    tracing::info!("rag-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        upload_timeout_secs = config.timeouts.upload_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses when metrics are enabled.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr)?;
        }
    }

    let listener = startup::bind(&config).await?;
    tracing::info!(address = ?listener.local_addr().ok(), "Listening for connections");

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (updates, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (mpsc::unbounded_channel().1, None)
                }
            }
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let grace = Duration::from_secs(config.lifecycle.shutdown_grace_secs);
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let mut server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    let finished = tokio::select! {
        _ = signals::shutdown_signal() => None,
        result = &mut server_task => Some(result),
    };

    match finished {
        None => {
            shutdown.trigger();
            if !Shutdown::drain(server_task, grace).await {
                tracing::warn!("Forced shutdown with requests still in flight");
            }
        }
        Some(Ok(Err(e))) => return Err(StartupError::Serve(e)),
        Some(Err(e)) => tracing::error!(error = %e, "Server task panicked"),
        Some(Ok(Ok(()))) => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
