//! Lap store trait definition

use crate::model::CompletedLapRecord;
use thiserror::Error;

/// Errors a lap store can report
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lap store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lap record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("lap store rejected record: {0}")]
    Rejected(String),
}

/// Trait for completed-lap persistence backends
///
/// The decoding pipeline only ever calls [`LapStore::save`], and never from
/// the packet path itself: saves happen on the persistence worker so a slow
/// or failing store cannot stall ingestion.
pub trait LapStore: Send + Sync {
    /// Get the name of this store (e.g., "memory", "ndjson")
    fn name(&self) -> &str;

    /// Persist one completed lap
    fn save(&self, record: &CompletedLapRecord) -> Result<(), StoreError>;

    /// Most recently saved laps, newest first
    fn recent(&self, limit: usize) -> Result<Vec<CompletedLapRecord>, StoreError>;

    /// All laps of one session, ordered by lap number
    fn by_session(&self, session_id: &str) -> Result<Vec<CompletedLapRecord>, StoreError>;
}
