//! Lap Data packet (id 2)

use super::player_record;
use crate::classify::PacketKind;
use crate::error::DecodeError;
use crate::format::WireFormat;
use crate::header::PacketHeader;
use pitwall_core::model::LapDataSample;
use pitwall_core::units::combine_split_time;

// Bytes between sector 2 and lap distance: delta to car in front and delta
// to race leader, each as ms part + minutes part.
const DELTAS: usize = 6;
// Bytes between lap distance and car position: total distance f32,
// safety car delta f32, then car position.
const DISTANCE_TAIL: usize = 8;

pub fn decode_lap_data(
    buf: &[u8],
    header: &PacketHeader,
    format: &WireFormat,
) -> Result<LapDataSample, DecodeError> {
    let mut r = player_record(
        buf,
        header,
        format,
        PacketKind::LapData,
        format.records.lap_data,
    )?;

    let last_lap_time_ms = r.u32_le()?;
    let current_lap_time_ms = r.u32_le()?;
    let s1_ms_part = r.u16_le()?;
    let s1_minutes = r.u8()?;
    let s2_ms_part = r.u16_le()?;
    let s2_minutes = r.u8()?;
    r.skip(DELTAS)?;
    let lap_distance_m = r.f32_le()?;
    r.skip(DISTANCE_TAIL)?;
    let car_position = r.u8()?;
    let current_lap_number = r.u8()?;
    let pit_status = r.u8()?;
    let _num_pit_stops = r.u8()?;
    let sector = r.u8()?;
    let current_lap_invalid = r.u8()? != 0;

    Ok(LapDataSample {
        last_lap_time_ms,
        current_lap_time_ms,
        sector1_ms: combine_split_time(s1_minutes, s1_ms_part),
        sector2_ms: combine_split_time(s2_minutes, s2_ms_part),
        lap_distance_m,
        current_lap_number,
        current_lap_invalid,
        car_position,
        pit_status,
        sector,
    })
}
