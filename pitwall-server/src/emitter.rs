//! Lap completion hand-off and the persistence worker
//!
//! The ingest loop never waits on storage: completed laps go through a
//! bounded queue to a worker that runs `LapStore::save` on the blocking
//! pool. Failures are logged and broadcast as [`PersistenceFailure`]s; the
//! in-memory session state is never rolled back.

use chrono::{DateTime, Utc};
use pitwall_core::{CompletedLapRecord, LapStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Default capacity of the lap queue
pub const LAP_QUEUE_CAPACITY: usize = 64;

/// A lap that could not be persisted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceFailure {
    pub record: CompletedLapRecord,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

impl PersistenceFailure {
    pub fn new(record: CompletedLapRecord, reason: impl Into<String>) -> Self {
        Self {
            record,
            reason: reason.into(),
            failed_at: Utc::now(),
        }
    }
}

fn report(errors: &broadcast::Sender<PersistenceFailure>, failure: PersistenceFailure) {
    error!(
        "Failed to persist lap {} ({}): {}",
        failure.record.lap_number, failure.record.lap_time_formatted, failure.reason
    );
    // No subscribers is fine, the failure is already logged
    let _ = errors.send(failure);
}

/// Sending half of the lap queue, held by the ingest loop
#[derive(Clone)]
pub struct LapEmitter {
    tx: mpsc::Sender<CompletedLapRecord>,
    errors: broadcast::Sender<PersistenceFailure>,
}

/// Create the lap queue. The receiver goes to [`spawn_persistence_worker`].
pub fn lap_channel(
    capacity: usize,
    errors: broadcast::Sender<PersistenceFailure>,
) -> (LapEmitter, mpsc::Receiver<CompletedLapRecord>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LapEmitter { tx, errors }, rx)
}

impl LapEmitter {
    /// Queue a completed lap without waiting. Returns false when the lap
    /// could not be queued; that is reported as a persistence failure.
    pub fn emit(&self, record: CompletedLapRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(record)) => {
                report(
                    &self.errors,
                    PersistenceFailure::new(record, "lap queue full"),
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                report(
                    &self.errors,
                    PersistenceFailure::new(record, "persistence worker stopped"),
                );
                false
            }
        }
    }
}

/// Save every queued lap until the queue closes and is empty. The task
/// resolves to the number of laps saved.
pub fn spawn_persistence_worker(
    store: Arc<dyn LapStore>,
    mut rx: mpsc::Receiver<CompletedLapRecord>,
    errors: broadcast::Sender<PersistenceFailure>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        info!("Persistence worker started ({} store)", store.name());
        let mut saved = 0;

        while let Some(record) = rx.recv().await {
            let task_store = store.clone();
            let task_record = record.clone();
            let result =
                tokio::task::spawn_blocking(move || task_store.save(&task_record)).await;

            match result {
                Ok(Ok(())) => {
                    saved += 1;
                    info!(
                        "Saved lap {} for {} ({}, valid: {})",
                        record.lap_number,
                        record.driver_name,
                        record.lap_time_formatted,
                        record.is_valid
                    );
                }
                Ok(Err(e)) => report(&errors, PersistenceFailure::new(record, e.to_string())),
                Err(e) => report(
                    &errors,
                    PersistenceFailure::new(record, format!("save task failed: {}", e)),
                ),
            }
        }

        info!("Persistence worker stopped after saving {} laps", saved);
        saved
    })
}

/// Wait up to `grace` for the worker to flush what is still queued. All
/// [`LapEmitter`] clones must be dropped first or the worker never finishes.
pub async fn drain(worker: JoinHandle<usize>, grace: Duration) -> Option<usize> {
    match tokio::time::timeout(grace, worker).await {
        Ok(Ok(saved)) => Some(saved),
        Ok(Err(e)) => {
            error!("Persistence worker panicked: {}", e);
            None
        }
        Err(_) => {
            warn!(
                "Persistence worker did not finish within {:?}, unsaved laps are lost",
                grace
            );
            None
        }
    }
}
