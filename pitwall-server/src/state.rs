//! Application state shared by the HTTP handlers
//!
//! Handlers never touch the aggregator. They read the latest published
//! snapshot, subscribe to the broadcast channels, and send control messages
//! to the ingest loop.

use crate::emitter::PersistenceFailure;
use crate::ingest::IngestControl;
use pitwall_core::{LapStore, SessionState};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Capacity of the snapshot and error broadcast channels
const BROADCAST_CAPACITY: usize = 100;

/// Capacity of the control channel into the ingest loop
const CONTROL_CAPACITY: usize = 16;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Latest snapshot, for polling
    pub snapshot: Arc<RwLock<SessionState>>,

    /// Snapshots published on every tick
    pub snapshot_tx: broadcast::Sender<SessionState>,

    /// Laps that could not be persisted
    pub errors_tx: broadcast::Sender<PersistenceFailure>,

    /// Control messages into the ingest loop
    pub control_tx: mpsc::Sender<IngestControl>,

    pub store: Arc<dyn LapStore>,

    pub stats: Arc<IngestStats>,
}

impl AppState {
    /// Create the state together with the receiving end of the control
    /// channel, which belongs to the ingest loop
    pub fn new(store: Arc<dyn LapStore>) -> (Self, mpsc::Receiver<IngestControl>) {
        let (snapshot_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (errors_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);

        let state = Self {
            snapshot: Arc::new(RwLock::new(SessionState::default())),
            snapshot_tx,
            errors_tx,
            control_tx,
            store,
            stats: Arc::new(IngestStats::default()),
        };
        (state, control_rx)
    }

    /// Replace the polled snapshot and broadcast it to stream subscribers
    pub async fn publish(&self, snapshot: SessionState) {
        *self.snapshot.write().await = snapshot.clone();
        // Ignore error if no receivers (they'll get the next snapshot)
        let _ = self.snapshot_tx.send(snapshot);
    }

    /// Subscribe to published snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to persistence failures
    pub fn subscribe_errors(&self) -> broadcast::Receiver<PersistenceFailure> {
        self.errors_tx.subscribe()
    }
}

/// Datagram counters maintained by the ingest loop
#[derive(Debug, Default)]
pub struct IngestStats {
    pub datagrams: AtomicU64,
    pub decoded: AtomicU64,
    pub too_short: AtomicU64,
    pub unknown_kind: AtomicU64,
    pub truncated: AtomicU64,
    /// Lap data older than what was already applied
    pub stale_lap_data: AtomicU64,
    pub laps_completed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStatsSnapshot {
    pub datagrams: u64,
    pub decoded: u64,
    pub too_short: u64,
    pub unknown_kind: u64,
    pub truncated: u64,
    pub stale_lap_data: u64,
    pub laps_completed: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            too_short: self.too_short.load(Ordering::Relaxed),
            unknown_kind: self.unknown_kind.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            stale_lap_data: self.stale_lap_data.load(Ordering::Relaxed),
            laps_completed: self.laps_completed.load(Ordering::Relaxed),
        }
    }
}
