//! Packet encoders
//!
//! Build wire-exact datagrams from typed samples. Used by the demo feed and
//! by tests; the live pipeline only decodes.
//!
//! Every encoder writes the sample into the record of the header's player car
//! slot and leaves the other 21 cars zeroed. The packet id and datagram length
//! come from the format's classification table, so the result classifies as
//! the intended kind.

use crate::classify::PacketKind;
use crate::format::WireFormat;
use crate::header::{write_header, PacketHeader, MAX_CARS};
use crate::packets::session::SESSION_FIELDS_LEN;
use pitwall_core::model::{CarTelemetrySample, LapDataSample, MotionSample, SessionInfo};

const MS_PER_MINUTE: u32 = 60_000;

struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    fn at(buf: &'a mut [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Writes past the end of the packet are dropped
    fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        if let Some(dst) = self.buf.get_mut(self.pos..self.pos + bytes.len()) {
            dst.copy_from_slice(bytes);
        }
        self.pos += bytes.len();
        self
    }

    fn u8(&mut self, v: u8) -> &mut Self {
        self.bytes(&[v])
    }

    fn i8(&mut self, v: i8) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    fn f32(&mut self, v: f32) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    fn skip(&mut self, n: usize) -> &mut Self {
        self.pos += n;
        self
    }
}

/// Split a sector time into the (ms part, minutes part) pair sent on the wire
pub fn split_sector_time(ms: u32) -> (u16, u8) {
    let minutes = (ms / MS_PER_MINUTE).min(u32::from(u8::MAX)) as u8;
    let ms_part = (ms % MS_PER_MINUTE) as u16;
    (ms_part, minutes)
}

/// Zeroed datagram of the right length with `header` written for `kind`.
///
/// Kinds missing from the table fall back to the length needed to hold all
/// car records (or the session fields).
fn packet_buffer(header: &PacketHeader, kind: PacketKind, format: &WireFormat) -> Vec<u8> {
    let mut header = *header;
    if let Some(id) = format.table.packet_id(kind) {
        header.packet_type_id = id;
    }
    let length = format.table.expected_length(kind).unwrap_or_else(|| {
        let body = format
            .records
            .for_kind(kind)
            .map(|record| record * MAX_CARS)
            .unwrap_or(SESSION_FIELDS_LEN);
        format.header.size + body
    });

    let mut buf = write_header(&header, &format.header);
    buf.resize(length.max(format.header.size), 0);
    buf
}

fn record_start(header: &PacketHeader, format: &WireFormat, record_size: usize) -> usize {
    format.record_offset(record_size, header.car_slot())
}

pub fn encode_motion(header: &PacketHeader, sample: &MotionSample, format: &WireFormat) -> Vec<u8> {
    let mut buf = packet_buffer(header, PacketKind::Motion, format);
    let start = record_start(header, format, format.records.motion);
    ByteWriter::at(&mut buf, start)
        .f32(sample.position.x)
        .f32(sample.position.y)
        .f32(sample.position.z)
        .f32(sample.velocity.x)
        .f32(sample.velocity.y)
        .f32(sample.velocity.z)
        .skip(12)
        .f32(sample.g_force.lateral)
        .f32(sample.g_force.longitudinal)
        .f32(sample.g_force.vertical)
        .f32(sample.orientation.yaw)
        .f32(sample.orientation.pitch)
        .f32(sample.orientation.roll);
    buf
}

/// Only the ids, temperatures, laps and length are written; names are
/// recomputed from the ids on decode.
pub fn encode_session(header: &PacketHeader, info: &SessionInfo, format: &WireFormat) -> Vec<u8> {
    let mut buf = packet_buffer(header, PacketKind::Session, format);
    ByteWriter::at(&mut buf, format.header.size)
        .u8(info.weather)
        .i8(info.track_temp_c)
        .i8(info.air_temp_c)
        .u8(info.total_laps)
        .u16(info.track_length_m)
        .u8(info.session_type_id)
        .i8(info.track_id);
    buf
}

pub fn encode_lap_data(
    header: &PacketHeader,
    sample: &LapDataSample,
    format: &WireFormat,
) -> Vec<u8> {
    let mut buf = packet_buffer(header, PacketKind::LapData, format);
    let start = record_start(header, format, format.records.lap_data);
    let (s1_ms, s1_min) = split_sector_time(sample.sector1_ms);
    let (s2_ms, s2_min) = split_sector_time(sample.sector2_ms);
    ByteWriter::at(&mut buf, start)
        .u32(sample.last_lap_time_ms)
        .u32(sample.current_lap_time_ms)
        .u16(s1_ms)
        .u8(s1_min)
        .u16(s2_ms)
        .u8(s2_min)
        .skip(6)
        .f32(sample.lap_distance_m)
        .skip(8)
        .u8(sample.car_position)
        .u8(sample.current_lap_number)
        .u8(sample.pit_status)
        .skip(1)
        .u8(sample.sector)
        .u8(u8::from(sample.current_lap_invalid));
    buf
}

pub fn encode_car_telemetry(
    header: &PacketHeader,
    sample: &CarTelemetrySample,
    format: &WireFormat,
) -> Vec<u8> {
    let mut buf = packet_buffer(header, PacketKind::CarTelemetry, format);
    let start = record_start(header, format, format.records.car_telemetry);
    let mut w = ByteWriter::at(&mut buf, start);
    w.u16(sample.speed_kph)
        .f32(sample.throttle)
        .f32(sample.steering)
        .f32(sample.brake)
        .u8(sample.clutch)
        .i8(sample.gear)
        .u16(sample.engine_rpm)
        .u8(u8::from(sample.drs_active))
        .u8(sample.rev_lights_percent)
        .skip(2);
    for t in sample.brake_temps {
        w.u16(t);
    }
    w.bytes(&sample.tyre_temps)
        .bytes(&sample.tyre_inner_temps)
        .u16(sample.engine_temp);
    for p in sample.tyre_pressures {
        w.f32(p);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use pitwall_core::TelemetryEvent;

    #[test]
    fn test_split_sector_time() {
        assert_eq!(split_sector_time(28_500), (28_500, 0));
        assert_eq!(split_sector_time(62_345), (2_345, 1));
        assert_eq!(split_sector_time(0), (0, 0));
    }

    #[test]
    fn test_encoded_lengths_match_table() {
        let format = WireFormat::f1_25();
        let header = PacketHeader::new(2025, 0, 0);
        assert_eq!(
            encode_motion(&header, &MotionSample::default(), &format).len(),
            1349
        );
        assert_eq!(
            encode_lap_data(&header, &LapDataSample::default(), &format).len(),
            1285
        );
        assert_eq!(
            encode_car_telemetry(&header, &CarTelemetrySample::default(), &format).len(),
            1352
        );
    }

    #[test]
    fn test_encoder_sets_packet_id() {
        let format = WireFormat::f1_25();
        // Header says motion, but the encoder knows better
        let header = PacketHeader::new(2025, 0, 3);
        let buf = encode_car_telemetry(&header, &CarTelemetrySample::default(), &format);
        assert_eq!(buf[6], 6);
        let decoded = decode(&buf, &format).unwrap();
        assert!(matches!(decoded.event, TelemetryEvent::CarTelemetry(_)));
    }

    #[test]
    fn test_other_slots_stay_zeroed() {
        let format = WireFormat::f1_25();
        let sample = CarTelemetrySample {
            speed_kph: 300,
            ..Default::default()
        };
        let buf = encode_car_telemetry(&PacketHeader::new(2025, 6, 1), &sample, &format);
        let slot0 = &buf[29..29 + 60];
        assert!(slot0.iter().all(|b| *b == 0));
        assert_eq!(u16::from_le_bytes([buf[89], buf[90]]), 300);
    }
}
