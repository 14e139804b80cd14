//! Lap time units and display formatting
//!
//! Lap and sector times travel as whole milliseconds everywhere in the
//! pipeline. Float channels serialize with 4 decimal places to keep the
//! dashboard snapshot compact.

use serde::Serializer;

/// Display string for a lap time that has not been set yet
pub const NO_LAP_TIME: &str = "0:00.000";

/// Display string for a sector that has not been timed yet
pub const NO_SECTOR_TIME: &str = "--:--.---";

const MS_PER_MINUTE: u32 = 60_000;

/// Round f32 to 4 decimal places for compact JSON serialization
pub(crate) fn round4<S: Serializer>(val: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f32(round4_value(*val))
}

pub(crate) fn round4_value(val: f32) -> f32 {
    (val * 10000.0).round() / 10000.0
}

/// Format milliseconds as `M:SS.mmm`.
///
/// Zero formats as [`NO_LAP_TIME`].
pub fn format_lap_time(ms: u32) -> String {
    if ms == 0 {
        return NO_LAP_TIME.to_string();
    }
    let minutes = ms / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / 1000;
    let millis = ms % 1000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}

/// Format a sector time, using [`NO_SECTOR_TIME`] for an untimed sector
pub fn format_sector_time(ms: u32) -> String {
    if ms == 0 {
        NO_SECTOR_TIME.to_string()
    } else {
        format_lap_time(ms)
    }
}

/// Combine a split time sent as a whole-minutes part and a sub-minute
/// millisecond part.
pub fn combine_split_time(minutes_part: u8, ms_part: u16) -> u32 {
    u32::from(minutes_part) * MS_PER_MINUTE + u32::from(ms_part)
}

/// Sector 3 is never transmitted; it is what remains of the lap after the
/// first two sectors.
///
/// Returns `None` unless all three inputs are positive and the remainder is
/// positive too.
pub fn derive_sector3(lap_time_ms: u32, sector1_ms: u32, sector2_ms: u32) -> Option<u32> {
    if lap_time_ms == 0 || sector1_ms == 0 || sector2_ms == 0 {
        return None;
    }
    lap_time_ms
        .checked_sub(sector1_ms)
        .and_then(|rest| rest.checked_sub(sector2_ms))
        .filter(|s3| *s3 > 0)
}
