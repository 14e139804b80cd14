//! Lap store implementations
//!
//! Both stores keep records in arrival order; `recent` returns newest first
//! and `by_session` orders by lap number.

use pitwall_core::{CompletedLapRecord, LapStore, StoreError};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Rejected("store lock poisoned".to_string()))
}

fn newest_first(
    records: impl DoubleEndedIterator<Item = CompletedLapRecord>,
    limit: usize,
) -> Vec<CompletedLapRecord> {
    records.rev().take(limit).collect()
}

fn session_laps(
    records: impl Iterator<Item = CompletedLapRecord>,
    session_id: &str,
) -> Vec<CompletedLapRecord> {
    let mut laps: Vec<_> = records.filter(|r| r.session_id == session_id).collect();
    laps.sort_by_key(|r| r.lap_number);
    laps
}

/// Process-local store, lost on exit
#[derive(Default)]
pub struct MemoryLapStore {
    laps: Mutex<Vec<CompletedLapRecord>>,
}

impl MemoryLapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.laps.lock().map(|laps| laps.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LapStore for MemoryLapStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn save(&self, record: &CompletedLapRecord) -> Result<(), StoreError> {
        lock(&self.laps)?.push(record.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<CompletedLapRecord>, StoreError> {
        let laps = lock(&self.laps)?;
        Ok(newest_first(laps.iter().cloned(), limit))
    }

    fn by_session(&self, session_id: &str) -> Result<Vec<CompletedLapRecord>, StoreError> {
        let laps = lock(&self.laps)?;
        Ok(session_laps(laps.iter().cloned(), session_id))
    }
}

/// Append-only file with one JSON lap record per line
pub struct NdjsonLapStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl NdjsonLapStore {
    /// Open (or prepare to create) the store at `path`, creating parent
    /// directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every readable record in file order. Lines that fail to parse are
    /// skipped with a warning.
    fn read_all(&self) -> Result<Vec<CompletedLapRecord>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping unreadable lap record at {}:{}: {}",
                    self.path.display(),
                    idx + 1,
                    e
                ),
            }
        }
        Ok(records)
    }
}

impl LapStore for NdjsonLapStore {
    fn name(&self) -> &str {
        "ndjson"
    }

    fn save(&self, record: &CompletedLapRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let _guard = lock(&self.write_lock)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<CompletedLapRecord>, StoreError> {
        Ok(newest_first(self.read_all()?.into_iter(), limit))
    }

    fn by_session(&self, session_id: &str) -> Result<Vec<CompletedLapRecord>, StoreError> {
        Ok(session_laps(self.read_all()?.into_iter(), session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(session: &str, lap: u8, lap_time_ms: u32) -> CompletedLapRecord {
        CompletedLapRecord {
            session_id: session.to_string(),
            driver_name: "Driver".to_string(),
            track_name: "Monza".to_string(),
            session_type: "Race".to_string(),
            lap_number: lap,
            lap_time_ms,
            lap_time_formatted: pitwall_core::units::format_lap_time(lap_time_ms),
            sector1_ms: 26_000,
            sector2_ms: 27_000,
            sector3_ms: lap_time_ms.saturating_sub(53_000),
            is_valid: true,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_memory_recent_is_newest_first() {
        let store = MemoryLapStore::new();
        for lap in 1..=4 {
            store.save(&record("A", lap, 81_000 + u32::from(lap))).unwrap();
        }
        let recent = store.recent(2).unwrap();
        let laps: Vec<u8> = recent.iter().map(|r| r.lap_number).collect();
        assert_eq!(laps, vec![4, 3]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_memory_by_session_orders_by_lap() {
        let store = MemoryLapStore::new();
        store.save(&record("A", 2, 81_000)).unwrap();
        store.save(&record("B", 1, 82_000)).unwrap();
        store.save(&record("A", 1, 83_000)).unwrap();

        let laps: Vec<u8> = store
            .by_session("A")
            .unwrap()
            .iter()
            .map(|r| r.lap_number)
            .collect();
        assert_eq!(laps, vec![1, 2]);
        assert!(store.by_session("missing").unwrap().is_empty());
    }

    #[test]
    fn test_ndjson_appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = NdjsonLapStore::open(dir.path().join("nested/laps.ndjson")).unwrap();
        assert!(store.recent(10).unwrap().is_empty());

        let first = record("S1", 1, 90_100);
        store.save(&first).unwrap();
        store.save(&record("S1", 2, 89_900)).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);

        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].lap_number, 2);
        assert_eq!(recent[1], first);
    }

    #[test]
    fn test_ndjson_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laps.ndjson");
        let store = NdjsonLapStore::open(&path).unwrap();
        store.save(&record("S1", 1, 90_100)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{not json").unwrap();
        }
        store.save(&record("S1", 2, 89_900)).unwrap();

        assert_eq!(store.by_session("S1").unwrap().len(), 2);
    }
}
