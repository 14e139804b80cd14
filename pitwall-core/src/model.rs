//! Typed telemetry model
//!
//! Defines the samples each packet decoder produces, the live
//! [`SessionState`] the aggregator folds them into, and the
//! [`CompletedLapRecord`] handed to the lap store.
//!
//! Per-wheel arrays use the wire order: rear-left, rear-right, front-left,
//! front-right.

use crate::units::{self, format_lap_time, format_sector_time, round4};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Placeholder used for names that have not been received yet
pub const UNKNOWN: &str = "Unknown";

/// Placeholder session id used until one is supplied
pub const UNKNOWN_SESSION_ID: &str = "UNKNOWN";

// === Decoded samples ===

/// Player car inputs and thermals from a Car Telemetry packet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarTelemetrySample {
    pub speed_kph: u16,
    /// Throttle input (0.0 to 1.0)
    pub throttle: f32,
    /// Steering input (-1.0 = full left, 1.0 = full right)
    pub steering: f32,
    /// Brake input (0.0 to 1.0)
    pub brake: f32,
    /// Clutch input (0 to 100)
    pub clutch: u8,
    /// Current gear (-1 = reverse, 0 = neutral, 1+ = forward gears)
    pub gear: i8,
    pub engine_rpm: u16,
    pub drs_active: bool,
    pub rev_lights_percent: u8,
    /// Brake temperatures (°C)
    pub brake_temps: [u16; 4],
    /// Tyre surface temperatures (°C)
    pub tyre_temps: [u8; 4],
    /// Tyre carcass temperatures (°C)
    pub tyre_inner_temps: [u8; 4],
    /// Engine temperature (°C)
    pub engine_temp: u16,
    /// Tyre pressures (PSI)
    pub tyre_pressures: [f32; 4],
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    #[serde(serialize_with = "round4")]
    pub x: f32,
    #[serde(serialize_with = "round4")]
    pub y: f32,
    #[serde(serialize_with = "round4")]
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// G-forces acting on the car
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GForce {
    #[serde(serialize_with = "round4")]
    pub lateral: f32,
    #[serde(serialize_with = "round4")]
    pub longitudinal: f32,
    #[serde(serialize_with = "round4")]
    pub vertical: f32,
}

/// Orientation in radians
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    #[serde(serialize_with = "round4")]
    pub yaw: f32,
    #[serde(serialize_with = "round4")]
    pub pitch: f32,
    #[serde(serialize_with = "round4")]
    pub roll: f32,
}

/// Player car motion from a Motion packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionSample {
    /// World position (meters)
    pub position: Vector3,
    /// World velocity (m/s)
    pub velocity: Vector3,
    pub g_force: GForce,
    pub orientation: Orientation,
}

/// Player car lap timing from a Lap Data packet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapDataSample {
    pub last_lap_time_ms: u32,
    pub current_lap_time_ms: u32,
    /// Sector 1 of the lap in progress (0 until timed)
    pub sector1_ms: u32,
    /// Sector 2 of the lap in progress (0 until timed)
    pub sector2_ms: u32,
    pub lap_distance_m: f32,
    pub current_lap_number: u8,
    pub current_lap_invalid: bool,
    pub car_position: u8,
    /// 0 = none, 1 = pitting, 2 = in pit area
    pub pit_status: u8,
    /// Sector the car is currently in (0-based)
    pub sector: u8,
}

impl LapDataSample {
    /// Stored validity has the opposite sense of the wire's invalid flag
    pub fn is_valid(&self) -> bool {
        !self.current_lap_invalid
    }
}

/// Global session parameters from a Session packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub track_id: i8,
    pub track_name: String,
    pub session_type_id: u8,
    pub session_type_name: String,
    pub track_length_m: u16,
    pub weather: u8,
    pub track_temp_c: i8,
    pub air_temp_c: i8,
    pub total_laps: u8,
}

/// One decoded datagram, tagged by packet kind
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    Motion(MotionSample),
    Session(SessionInfo),
    LapData(LapDataSample),
    CarTelemetry(CarTelemetrySample),
}

// === Lap bookkeeping ===

/// Sector splits captured while a lap is still in progress.
///
/// When the lap ends these are the authoritative splits for it: the packet
/// that reveals the new last-lap time already carries the next lap's sectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLapSectors {
    pub sector1_ms: u32,
    pub sector2_ms: u32,
    pub lap_number: u8,
    pub is_valid: bool,
}

impl PendingLapSectors {
    pub fn capture(sample: &LapDataSample) -> Self {
        Self {
            sector1_ms: sample.sector1_ms,
            sector2_ms: sample.sector2_ms,
            lap_number: sample.current_lap_number,
            is_valid: sample.is_valid(),
        }
    }
}

/// Lap completion state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "lap", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LapPhase {
    Driving(u8),
    LapJustCompleted(u8),
}

impl Default for LapPhase {
    fn default() -> Self {
        LapPhase::Driving(0)
    }
}

/// Driver and session identity, supplied by an external actor at any time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub driver_name: String,
    pub session_id: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            driver_name: UNKNOWN.to_string(),
            session_id: UNKNOWN_SESSION_ID.to_string(),
        }
    }
}

/// A finished lap, normalized for persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLapRecord {
    pub session_id: String,
    pub driver_name: String,
    pub track_name: String,
    pub session_type: String,
    pub lap_number: u8,
    pub lap_time_ms: u32,
    pub lap_time_formatted: String,
    pub sector1_ms: u32,
    pub sector2_ms: u32,
    /// Derived; 0 when it cannot be derived
    pub sector3_ms: u32,
    pub is_valid: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Fastest valid lap seen by this process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestLap {
    pub track_name: String,
    pub lap_number: u8,
    pub lap_time_ms: u32,
    pub lap_time_formatted: String,
    pub sector1_ms: u32,
    pub sector2_ms: u32,
    pub sector3_ms: u32,
    pub recorded_at: DateTime<Utc>,
}

impl From<&CompletedLapRecord> for BestLap {
    fn from(record: &CompletedLapRecord) -> Self {
        Self {
            track_name: record.track_name.clone(),
            lap_number: record.lap_number,
            lap_time_ms: record.lap_time_ms,
            lap_time_formatted: record.lap_time_formatted.clone(),
            sector1_ms: record.sector1_ms,
            sector2_ms: record.sector2_ms,
            sector3_ms: record.sector3_ms,
            recorded_at: record.recorded_at,
        }
    }
}

// === Live session state ===

/// Continuously updated view of the player's session.
///
/// Display fields are overwritten by whichever packet kind carries them;
/// the bookkeeping fields at the bottom belong to the lap state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub connected: bool,
    /// When the last packet was folded in
    #[serde(rename = "timestamp")]
    pub last_update: Option<DateTime<Utc>>,
    pub packets_received: u64,
    pub identity: Identity,

    // === Car telemetry ===
    pub speed_kph: u16,
    #[serde(serialize_with = "round4")]
    pub throttle: f32,
    #[serde(serialize_with = "round4")]
    pub brake: f32,
    #[serde(serialize_with = "round4")]
    pub steering: f32,
    pub clutch: u8,
    pub gear: i8,
    pub engine_rpm: u16,
    pub drs_active: bool,
    pub rev_lights_percent: u8,
    pub engine_temp: u16,
    pub brake_temps: [u16; 4],
    pub tyre_temps: [u8; 4],
    pub tyre_inner_temps: [u8; 4],
    pub tyre_pressures: [f32; 4],

    // === Motion ===
    pub position: Vector3,
    pub velocity: Vector3,
    pub g_force: GForce,
    pub orientation: Orientation,

    // === Lap timing ===
    pub current_lap_time_ms: u32,
    pub current_lap_time_str: String,
    pub last_lap_time_ms: u32,
    pub last_lap_time_str: String,
    pub best_lap_time_ms: u32,
    pub best_lap_time_str: String,
    pub sector1_ms: u32,
    pub sector1_str: String,
    pub sector2_ms: u32,
    pub sector2_str: String,
    /// Sector 3 of the last completed lap
    pub sector3_ms: u32,
    pub sector3_str: String,
    pub lap_number: u8,
    #[serde(serialize_with = "round4")]
    pub lap_distance_m: f32,
    pub car_position: u8,
    pub pit_status: u8,
    pub current_sector: u8,
    pub current_lap_invalid: bool,

    // === Session ===
    pub track_id: Option<i8>,
    pub track_name: String,
    pub session_type_id: Option<u8>,
    pub session_type: String,
    pub track_length_m: u16,
    pub weather: u8,
    pub track_temp_c: i8,
    pub air_temp_c: i8,
    pub total_laps: u8,

    // === Lap state machine ===
    pub previous_last_lap_time_ms: u32,
    pub pending_lap_sectors: Option<PendingLapSectors>,
    pub lap_phase: LapPhase,
    pub best_lap: Option<BestLap>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            connected: false,
            last_update: None,
            packets_received: 0,
            identity: Identity::default(),
            speed_kph: 0,
            throttle: 0.0,
            brake: 0.0,
            steering: 0.0,
            clutch: 0,
            gear: 0,
            engine_rpm: 0,
            drs_active: false,
            rev_lights_percent: 0,
            engine_temp: 0,
            brake_temps: [0; 4],
            tyre_temps: [0; 4],
            tyre_inner_temps: [0; 4],
            tyre_pressures: [0.0; 4],
            position: Vector3::default(),
            velocity: Vector3::default(),
            g_force: GForce::default(),
            orientation: Orientation::default(),
            current_lap_time_ms: 0,
            current_lap_time_str: units::NO_LAP_TIME.to_string(),
            last_lap_time_ms: 0,
            last_lap_time_str: units::NO_LAP_TIME.to_string(),
            best_lap_time_ms: 0,
            best_lap_time_str: units::NO_LAP_TIME.to_string(),
            sector1_ms: 0,
            sector1_str: units::NO_SECTOR_TIME.to_string(),
            sector2_ms: 0,
            sector2_str: units::NO_SECTOR_TIME.to_string(),
            sector3_ms: 0,
            sector3_str: units::NO_SECTOR_TIME.to_string(),
            lap_number: 0,
            lap_distance_m: 0.0,
            car_position: 0,
            pit_status: 0,
            current_sector: 0,
            current_lap_invalid: false,
            track_id: None,
            track_name: UNKNOWN.to_string(),
            session_type_id: None,
            session_type: UNKNOWN.to_string(),
            track_length_m: 0,
            weather: 0,
            track_temp_c: 0,
            air_temp_c: 0,
            total_laps: 0,
            previous_last_lap_time_ms: 0,
            pending_lap_sectors: None,
            lap_phase: LapPhase::default(),
            best_lap: None,
        }
    }
}

impl SessionState {
    /// Record that a packet was folded in at `now`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.connected = true;
        self.last_update = Some(now);
        self.packets_received = self.packets_received.saturating_add(1);
    }

    pub fn apply_car_telemetry(&mut self, sample: &CarTelemetrySample) {
        self.speed_kph = sample.speed_kph;
        self.throttle = sample.throttle;
        self.brake = sample.brake;
        self.steering = sample.steering;
        self.clutch = sample.clutch;
        self.gear = sample.gear;
        self.engine_rpm = sample.engine_rpm;
        self.drs_active = sample.drs_active;
        self.rev_lights_percent = sample.rev_lights_percent;
        self.engine_temp = sample.engine_temp;
        self.brake_temps = sample.brake_temps;
        self.tyre_temps = sample.tyre_temps;
        self.tyre_inner_temps = sample.tyre_inner_temps;
        self.tyre_pressures = sample.tyre_pressures;
    }

    pub fn apply_motion(&mut self, sample: &MotionSample) {
        self.position = sample.position;
        self.velocity = sample.velocity;
        self.g_force = sample.g_force;
        self.orientation = sample.orientation;
    }

    pub fn apply_session(&mut self, info: &SessionInfo) {
        self.track_id = Some(info.track_id);
        self.track_name = info.track_name.clone();
        self.session_type_id = Some(info.session_type_id);
        self.session_type = info.session_type_name.clone();
        self.track_length_m = info.track_length_m;
        self.weather = info.weather;
        self.track_temp_c = info.track_temp_c;
        self.air_temp_c = info.air_temp_c;
        self.total_laps = info.total_laps;
    }

    /// Update the display-facing lap fields. Lap completion is decided by
    /// the aggregator, not here.
    pub fn apply_lap_display(&mut self, sample: &LapDataSample) {
        self.current_lap_time_ms = sample.current_lap_time_ms;
        self.current_lap_time_str = format_lap_time(sample.current_lap_time_ms);
        self.last_lap_time_ms = sample.last_lap_time_ms;
        self.last_lap_time_str = format_lap_time(sample.last_lap_time_ms);
        self.sector1_ms = sample.sector1_ms;
        self.sector1_str = format_sector_time(sample.sector1_ms);
        self.sector2_ms = sample.sector2_ms;
        self.sector2_str = format_sector_time(sample.sector2_ms);
        self.lap_number = sample.current_lap_number;
        self.lap_distance_m = sample.lap_distance_m;
        self.car_position = sample.car_position;
        self.pit_status = sample.pit_status;
        self.current_sector = sample.sector;
        self.current_lap_invalid = sample.current_lap_invalid;
    }

    /// Reflect a completed lap in the display fields, tracking the best lap
    pub fn record_completed_lap(&mut self, record: &CompletedLapRecord) {
        self.sector3_ms = record.sector3_ms;
        self.sector3_str = format_sector_time(record.sector3_ms);

        if !record.is_valid {
            return;
        }
        let is_best = self.best_lap_time_ms == 0 || record.lap_time_ms < self.best_lap_time_ms;
        if is_best {
            self.best_lap_time_ms = record.lap_time_ms;
            self.best_lap_time_str = record.lap_time_formatted.clone();
            self.best_lap = Some(BestLap::from(record));
        }
    }

    /// Serialize this snapshot respecting the given field mask
    ///
    /// `timestamp` and `connected` are always included.
    pub fn to_json_filtered(&self, mask: Option<&FieldMask>) -> serde_json::Result<String> {
        let mask = match mask {
            Some(m) if !m.is_all() => m,
            _ => return serde_json::to_string(self),
        };

        let serde_json::Value::Object(full) = serde_json::to_value(self)? else {
            return serde_json::to_string(self);
        };
        let filtered: serde_json::Map<String, serde_json::Value> = full
            .into_iter()
            .filter(|(key, _)| key == "timestamp" || key == "connected" || mask.includes(key))
            .collect();

        serde_json::to_string(&filtered)
    }
}

// === Field Masking for Selective Output ===

/// Specifies which snapshot fields to include in serialized output
#[derive(Debug, Clone, Default)]
pub struct FieldMask {
    fields: HashSet<String>,
    include_all: bool,
}

impl FieldMask {
    /// Create a mask that includes all fields
    pub fn all() -> Self {
        Self {
            fields: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of field names
    pub fn parse(fields: &str) -> Self {
        let fields: HashSet<String> = fields
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            fields,
            include_all: false,
        }
    }

    pub fn builder() -> FieldMaskBuilder {
        FieldMaskBuilder::default()
    }

    /// Check if a field should be included (case-insensitive)
    pub fn includes(&self, field: &str) -> bool {
        self.include_all || self.fields.contains(&field.to_lowercase())
    }

    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for FieldMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Builder for FieldMask
#[derive(Debug, Default)]
pub struct FieldMaskBuilder {
    fields: HashSet<String>,
}

impl FieldMaskBuilder {
    pub fn with_field(mut self, field: &str) -> Self {
        self.fields.insert(field.to_lowercase());
        self
    }

    pub fn speed(self) -> Self {
        self.with_field("speedKph")
    }

    pub fn rpm(self) -> Self {
        self.with_field("engineRpm")
    }

    pub fn g_force(self) -> Self {
        self.with_field("gForce")
    }

    pub fn build(self) -> FieldMask {
        FieldMask {
            fields: self.fields,
            include_all: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap_sample(last: u32, s1: u32, s2: u32, lap: u8, invalid: bool) -> LapDataSample {
        LapDataSample {
            last_lap_time_ms: last,
            current_lap_time_ms: 12_000,
            sector1_ms: s1,
            sector2_ms: s2,
            current_lap_number: lap,
            current_lap_invalid: invalid,
            ..Default::default()
        }
    }

    fn completed(lap_time_ms: u32, is_valid: bool) -> CompletedLapRecord {
        CompletedLapRecord {
            session_id: "S1".to_string(),
            driver_name: "Driver".to_string(),
            track_name: "Singapore".to_string(),
            session_type: "Time Trial".to_string(),
            lap_number: 3,
            lap_time_ms,
            lap_time_formatted: format_lap_time(lap_time_ms),
            sector1_ms: 28_000,
            sector2_ms: 31_000,
            sector3_ms: lap_time_ms - 59_000,
            is_valid,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_state_uses_placeholders() {
        let state = SessionState::default();
        assert!(!state.connected);
        assert_eq!(state.track_name, UNKNOWN);
        assert_eq!(state.session_type, UNKNOWN);
        assert_eq!(state.identity.session_id, UNKNOWN_SESSION_ID);
        assert_eq!(state.sector1_str, units::NO_SECTOR_TIME);
        assert!(state.pending_lap_sectors.is_none());
    }

    #[test]
    fn test_lap_sample_validity_is_inverted_flag() {
        assert!(lap_sample(0, 0, 0, 1, false).is_valid());
        assert!(!lap_sample(0, 0, 0, 1, true).is_valid());
    }

    #[test]
    fn test_pending_sectors_capture() {
        let pending = PendingLapSectors::capture(&lap_sample(0, 28_000, 31_000, 4, true));
        assert_eq!(pending.sector1_ms, 28_000);
        assert_eq!(pending.sector2_ms, 31_000);
        assert_eq!(pending.lap_number, 4);
        assert!(!pending.is_valid);
    }

    #[test]
    fn test_apply_lap_display_formats_times() {
        let mut state = SessionState::default();
        state.apply_lap_display(&lap_sample(92_345, 28_500, 0, 5, false));
        assert_eq!(state.last_lap_time_str, "1:32.345");
        assert_eq!(state.current_lap_time_str, "0:12.000");
        assert_eq!(state.sector1_str, "0:28.500");
        assert_eq!(state.sector2_str, units::NO_SECTOR_TIME);
        assert_eq!(state.lap_number, 5);
    }

    #[test]
    fn test_record_completed_lap_tracks_best_valid_lap() {
        let mut state = SessionState::default();
        state.record_completed_lap(&completed(92_000, true));
        assert_eq!(state.best_lap_time_ms, 92_000);

        // Invalid laps never count, however fast
        state.record_completed_lap(&completed(80_000, false));
        assert_eq!(state.best_lap_time_ms, 92_000);
        assert_eq!(state.sector3_ms, 21_000);

        state.record_completed_lap(&completed(90_500, true));
        assert_eq!(state.best_lap_time_ms, 90_500);
        assert_eq!(state.best_lap_time_str, "1:30.500");
        assert_eq!(state.best_lap.as_ref().map(|b| b.lap_time_ms), Some(90_500));
    }

    #[test]
    fn test_touch_marks_connected() {
        let mut state = SessionState::default();
        let now = Utc::now();
        state.touch(now);
        assert!(state.connected);
        assert_eq!(state.last_update, Some(now));
        assert_eq!(state.packets_received, 1);
    }

    #[test]
    fn test_field_mask_parse_case_insensitive() {
        let mask = FieldMask::parse("SpeedKph, engineRPM ,gear");
        assert!(mask.includes("speedKph"));
        assert!(mask.includes("engineRpm"));
        assert!(mask.includes("gear"));
        assert!(!mask.includes("throttle"));
    }

    #[test]
    fn test_field_mask_from_str_and_builder() {
        let parsed: FieldMask = "speedKph,engineRpm".parse().unwrap();
        let built = FieldMask::builder().speed().rpm().build();
        for mask in [parsed, built] {
            assert!(mask.includes("speedKph"));
            assert!(mask.includes("engineRpm"));
            assert!(!mask.includes("gear"));
        }
    }

    #[test]
    fn test_to_json_filtered_with_none_returns_full_snapshot() {
        let state = SessionState::default();
        let json = state.to_json_filtered(None).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("speedKph").is_some());
        assert!(parsed.get("trackName").is_some());
        assert!(parsed.get("lapPhase").is_some());
    }

    #[test]
    fn test_to_json_filtered_with_mask_returns_only_requested_fields() {
        let mut state = SessionState::default();
        state.touch(Utc::now());
        let mask = FieldMask::builder().speed().g_force().build();
        let json = state.to_json_filtered(Some(&mask)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(parsed.get("timestamp").is_some());
        assert!(parsed.get("connected").is_some());
        assert!(parsed.get("speedKph").is_some());
        assert!(parsed.get("gForce").is_some());
        assert!(parsed.get("engineRpm").is_none());
        assert!(parsed.get("trackName").is_none());
    }

    #[test]
    fn test_lap_phase_serialization() {
        let json = serde_json::to_string(&LapPhase::LapJustCompleted(3)).unwrap();
        assert_eq!(json, r#"{"state":"LAP_JUST_COMPLETED","lap":3}"#);
    }

    #[test]
    fn test_completed_lap_record_roundtrip() {
        let record = completed(91_345, true);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"lapTimeMs\":91345"));
        let back: CompletedLapRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
