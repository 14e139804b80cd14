//! Session state aggregation and lap completion detection
//!
//! The aggregator is owned by the ingest task and mutated from nowhere
//! else, so it needs no locking. Other tasks see it through the snapshots
//! published on the tick.

use chrono::{DateTime, Duration, Utc};
use pitwall_core::model::{Identity, LapPhase, PendingLapSectors};
use pitwall_core::units::{derive_sector3, format_lap_time};
use pitwall_core::{CompletedLapRecord, LapDataSample, SessionState, TelemetryEvent};
use pitwall_decoder::{decode, DecodeError, DecodedPacket, WireFormat};
use thiserror::Error;
use tracing::{debug, info};

/// Seconds without a decoded packet before the session counts as disconnected
pub const LIVENESS_TIMEOUT_SECS: i64 = 5;

/// Why a datagram was not folded into the session state
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("stale lap data: frame {frame} is older than applied frame {latest}")]
    StaleLapData { frame: u32, latest: u32 },
}

pub struct SessionAggregator {
    format: WireFormat,
    state: SessionState,
    liveness_timeout: Duration,
    /// Game session the lap bookkeeping belongs to
    session_uid: Option<u64>,
    /// Overall frame id of the newest lap data packet applied
    last_lap_frame: Option<u32>,
}

impl SessionAggregator {
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            state: SessionState::default(),
            liveness_timeout: Duration::seconds(LIVENESS_TIMEOUT_SECS),
            session_uid: None,
            last_lap_frame: None,
        }
    }

    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Clone of the current state for publishing
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    pub fn identity(&self) -> &Identity {
        &self.state.identity
    }

    /// Identity used for every lap completed from now on
    pub fn set_identity(&mut self, identity: Identity) {
        info!(
            driver = %identity.driver_name,
            session = %identity.session_id,
            "identity updated"
        );
        self.state.identity = identity;
    }

    /// Decode one datagram and fold it into the session state.
    ///
    /// A datagram that fails to decode leaves the state untouched.
    pub fn ingest(
        &mut self,
        datagram: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<CompletedLapRecord>, IngestError> {
        let packet = decode(datagram, &self.format)?;
        self.apply_packet(&packet, now)
    }

    /// Fold a decoded packet, using its header to order lap data.
    ///
    /// Lap data older than the newest applied lap data packet of the same
    /// game session is rejected without touching the state. A new session
    /// uid starts the lap bookkeeping over.
    pub fn apply_packet(
        &mut self,
        packet: &DecodedPacket,
        now: DateTime<Utc>,
    ) -> Result<Option<CompletedLapRecord>, IngestError> {
        let header = &packet.header;
        if self.session_uid != Some(header.session_uid) {
            if self.session_uid.is_some() {
                info!(session_uid = header.session_uid, "new game session, lap tracking reset");
                self.reset_lap_tracking();
            }
            self.session_uid = Some(header.session_uid);
        }

        if let TelemetryEvent::LapData(_) = packet.event {
            let frame = header.overall_frame_identifier;
            match self.last_lap_frame {
                Some(latest) if frame < latest => {
                    return Err(IngestError::StaleLapData { frame, latest });
                }
                _ => self.last_lap_frame = Some(frame),
            }
        }

        Ok(self.apply(&packet.event, now))
    }

    fn reset_lap_tracking(&mut self) {
        self.last_lap_frame = None;
        self.state.previous_last_lap_time_ms = 0;
        self.state.pending_lap_sectors = None;
        self.state.lap_phase = LapPhase::default();
    }

    /// Fold an already decoded event into the session state, returning the
    /// lap it completed, if any
    pub fn apply(&mut self, event: &TelemetryEvent, now: DateTime<Utc>) -> Option<CompletedLapRecord> {
        self.state.touch(now);
        match event {
            TelemetryEvent::CarTelemetry(sample) => {
                self.state.apply_car_telemetry(sample);
                None
            }
            TelemetryEvent::Motion(sample) => {
                self.state.apply_motion(sample);
                None
            }
            TelemetryEvent::Session(info) => {
                if self.state.track_id != Some(info.track_id)
                    || self.state.session_type_id != Some(info.session_type_id)
                {
                    info!(
                        track = %info.track_name,
                        session_type = %info.session_type_name,
                        "session info received"
                    );
                }
                self.state.apply_session(info);
                None
            }
            TelemetryEvent::LapData(sample) => self.fold_lap_data(sample, now),
        }
    }

    /// Advance the lap state machine with one lap data sample.
    ///
    /// A lap has completed when the reported last lap time changes to a new
    /// non-zero value. Its sectors are the ones captured from the previous
    /// sample: by the time the new last lap time shows up, the packet already
    /// carries the next lap's (reset) sectors.
    fn fold_lap_data(
        &mut self,
        sample: &LapDataSample,
        now: DateTime<Utc>,
    ) -> Option<CompletedLapRecord> {
        let mut completed = None;

        let last = sample.last_lap_time_ms;
        if last > 0 && last != self.state.previous_last_lap_time_ms {
            match self.state.pending_lap_sectors {
                Some(pending) => {
                    let record = self.completed_lap(&pending, last, now);
                    self.state.lap_phase = LapPhase::LapJustCompleted(pending.lap_number);
                    self.state.record_completed_lap(&record);
                    info!(
                        lap = record.lap_number,
                        time = %record.lap_time_formatted,
                        valid = record.is_valid,
                        "lap completed"
                    );
                    completed = Some(record);
                }
                None => {
                    debug!(last_lap_ms = last, "last lap time baseline recorded");
                    self.state.lap_phase = LapPhase::Driving(sample.current_lap_number);
                }
            }
            self.state.previous_last_lap_time_ms = last;
        } else {
            self.state.lap_phase = LapPhase::Driving(sample.current_lap_number);
        }

        self.state.pending_lap_sectors = Some(PendingLapSectors::capture(sample));
        self.state.apply_lap_display(sample);
        completed
    }

    fn completed_lap(
        &self,
        pending: &PendingLapSectors,
        lap_time_ms: u32,
        now: DateTime<Utc>,
    ) -> CompletedLapRecord {
        let sector3_ms =
            derive_sector3(lap_time_ms, pending.sector1_ms, pending.sector2_ms).unwrap_or(0);
        CompletedLapRecord {
            session_id: self.state.identity.session_id.clone(),
            driver_name: self.state.identity.driver_name.clone(),
            track_name: self.state.track_name.clone(),
            session_type: self.state.session_type.clone(),
            lap_number: pending.lap_number,
            lap_time_ms,
            lap_time_formatted: format_lap_time(lap_time_ms),
            sector1_ms: pending.sector1_ms,
            sector2_ms: pending.sector2_ms,
            sector3_ms,
            is_valid: pending.is_valid,
            recorded_at: now,
        }
    }

    /// Flip `connected` off once no packet has arrived for the liveness
    /// timeout. Returns whether the session is still connected.
    pub fn check_liveness(&mut self, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.state.last_update {
            if self.state.connected && now - last > self.liveness_timeout {
                info!("no telemetry for {}s, marking disconnected", self.liveness_timeout.num_seconds());
                self.state.connected = false;
            }
        }
        self.state.connected
    }
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new(WireFormat::f1_25())
    }
}
