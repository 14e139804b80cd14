//! Pitwall Server
//!
//! Receives F1 UDP telemetry, keeps the live session state and records
//! completed laps.

use anyhow::{Context, Result};
use clap::Parser;
use pitwall_core::{Identity, LapStore};
use pitwall_decoder::WireFormat;
use pitwall_server::aggregator::SessionAggregator;
use pitwall_server::config::{Config, StoreKind};
use pitwall_server::ingest::{self, DatagramSource};
use pitwall_server::store::{MemoryLapStore, NdjsonLapStore};
use pitwall_server::{api, emitter, state};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    info!("Starting Pitwall Server");

    let store = open_store(&config)?;
    let (state, control_rx) = state::AppState::new(store.clone());

    let cancel = CancellationToken::new();
    tokio::spawn(ingest::cancel_on_signal(
        tokio::signal::ctrl_c(),
        cancel.clone(),
    ));

    // Persistence worker
    let (lap_emitter, lap_rx) = emitter::lap_channel(config.lap_queue, state.errors_tx.clone());
    let worker = emitter::spawn_persistence_worker(store, lap_rx, state.errors_tx.clone());

    // Datagram source
    let source = if config.demo {
        let (tx, rx) = mpsc::channel(256);
        ingest::spawn_demo_feed(tx, cancel.clone());
        info!("Demo mode: feeding synthetic packets");
        DatagramSource::Channel(rx)
    } else {
        DatagramSource::bind(config.udp_addr())
            .await
            .with_context(|| format!("Failed to bind UDP socket on {}", config.udp_addr()))?
    };

    let mut aggregator = SessionAggregator::new(WireFormat::f1_25());
    if config.driver.is_some() || config.session_id.is_some() {
        let defaults = Identity::default();
        aggregator.set_identity(Identity {
            driver_name: config.driver.clone().unwrap_or(defaults.driver_name),
            session_id: config.session_id.clone().unwrap_or(defaults.session_id),
        });
    }

    let ingest_task = tokio::spawn(ingest::run(
        source,
        aggregator,
        lap_emitter,
        state.clone(),
        control_rx,
        config.tick_interval(),
        cancel.clone(),
    ));

    // HTTP API
    let app = api::create_router(state.clone());
    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
    info!("Server listening on http://{}", addr);

    let server_cancel = cancel.clone();
    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_cancel.cancelled().await })
        .await;
    // The HTTP server can fail on its own; take the ingest loop down with it
    cancel.cancel();

    // Wait for the ingest loop so its emitter is dropped, then flush laps
    match ingest_task.await {
        Ok(aggregator) => info!(
            "Ingest loop finished after {} packets",
            aggregator.state().packets_received
        ),
        Err(e) => error!("Ingest loop panicked: {}", e),
    }
    if let Some(saved) = emitter::drain(worker, config.shutdown_grace()).await {
        info!("Flushed lap store, {} laps saved this run", saved);
    }

    serve_result.context("HTTP server error")?;
    info!("Shutdown complete");
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<dyn LapStore>> {
    match config.store {
        StoreKind::Memory => {
            info!("Using in-memory lap store");
            Ok(Arc::new(MemoryLapStore::new()))
        }
        StoreKind::Ndjson => {
            let path = config.store_path();
            let store = NdjsonLapStore::open(&path)
                .with_context(|| format!("Failed to open lap store at {}", path.display()))?;
            info!("Recording laps to {}", path.display());
            Ok(Arc::new(store))
        }
    }
}
