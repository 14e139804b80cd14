//! Decoding tests against hand-built datagrams

use pitwall_core::model::{CarTelemetrySample, LapDataSample, MotionSample, SessionInfo, Vector3};
use pitwall_core::TelemetryEvent;
use pitwall_decoder::encode::{encode_car_telemetry, encode_lap_data, encode_motion, encode_session};
use pitwall_decoder::header::write_header;
use pitwall_decoder::packets::{decode_car_telemetry, decode_lap_data};
use pitwall_decoder::{
    decode, read_header, ClassificationEntry, ClassificationTable, DecodeError, HeaderLayout,
    PacketHeader, PacketKind, WireFormat,
};

fn telemetry(speed_kph: u16) -> CarTelemetrySample {
    CarTelemetrySample {
        speed_kph,
        throttle: 0.85,
        steering: -0.25,
        brake: 0.0,
        clutch: 0,
        gear: 7,
        engine_rpm: 11_250,
        drs_active: true,
        rev_lights_percent: 80,
        brake_temps: [510, 515, 620, 625],
        tyre_temps: [92, 93, 96, 97],
        tyre_inner_temps: [101, 101, 104, 104],
        engine_temp: 108,
        tyre_pressures: [21.5, 21.6, 23.0, 23.1],
    }
}

fn session(track_id: i8) -> SessionInfo {
    SessionInfo {
        track_id,
        track_name: String::new(),
        session_type_id: 10,
        session_type_name: String::new(),
        track_length_m: 5412,
        weather: 1,
        track_temp_c: 35,
        air_temp_c: 27,
        total_laps: 57,
    }
}

// ==================== Header ====================

#[test]
fn test_header_roundtrip() {
    let header = PacketHeader::new(2025, 6, 19);
    let buf = write_header(&header, &HeaderLayout::F1_25);
    let read = read_header(&buf, &HeaderLayout::F1_25).unwrap();
    assert_eq!(read.format_version, 2025);
    assert_eq!(read.packet_type_id, 6);
    assert_eq!(read.player_car_index, 19);
}

#[test]
fn test_28_bytes_is_too_short() {
    let buf = vec![0u8; 28];
    assert_eq!(
        decode(&buf, &WireFormat::f1_25()),
        Err(DecodeError::TooShort { len: 28, min: 29 })
    );
}

#[test]
fn test_29_bytes_reads_header_but_no_record() {
    let format = WireFormat::f1_25();
    let buf = write_header(&PacketHeader::new(2025, 6, 0), &format.header);
    assert_eq!(buf.len(), 29);

    let header = read_header(&buf, &format.header).unwrap();
    assert_eq!(header.packet_type_id, 6);

    assert!(matches!(
        decode_car_telemetry(&buf, &header, &format),
        Err(DecodeError::TruncatedRecord {
            kind: PacketKind::CarTelemetry,
            ..
        })
    ));
    assert!(matches!(
        decode(&buf, &format),
        Err(DecodeError::UnknownPacketKind { packet_id: 6, len: 29 })
    ));
}

// ==================== Classification ====================

#[test]
fn test_classification_grid() {
    let table = ClassificationTable::f1_25();
    let lengths = [0usize, 29, 753, 1285, 1349, 1352, 1460, 2048];
    for id in 0u8..=15 {
        for len in lengths {
            let expected = table
                .entries()
                .iter()
                .find(|e| e.packet_id == id && e.length == len)
                .map(|e| e.kind)
                .unwrap_or(PacketKind::Unknown);
            assert_eq!(table.classify(id, len), expected, "id {id} len {len}");
        }
    }
}

#[test]
fn test_unknown_length_is_dropped() {
    let format = WireFormat::f1_25();
    let mut buf = encode_car_telemetry(&PacketHeader::new(2025, 6, 0), &telemetry(250), &format);
    buf.push(0);
    assert!(matches!(
        decode(&buf, &format),
        Err(DecodeError::UnknownPacketKind { packet_id: 6, len: 1353 })
    ));
}

// ==================== Car telemetry ====================

#[test]
fn test_car_telemetry_player_slot() {
    let format = WireFormat::f1_25();
    let sample = telemetry(287);
    let buf = encode_car_telemetry(&PacketHeader::new(2025, 6, 5), &sample, &format);

    let decoded = decode(&buf, &format).unwrap();
    assert_eq!(decoded.header.player_car_index, 5);
    assert_eq!(decoded.kind(), PacketKind::CarTelemetry);
    assert_eq!(decoded.event, TelemetryEvent::CarTelemetry(sample));
}

#[test]
fn test_player_index_sentinel_reads_slot_zero() {
    let format = WireFormat::f1_25();
    let sample = telemetry(199);
    let buf = encode_car_telemetry(&PacketHeader::new(2025, 6, 255), &sample, &format);

    // Record written at slot 0
    assert_eq!(u16::from_le_bytes([buf[29], buf[30]]), 199);
    match decode(&buf, &format).unwrap().event {
        TelemetryEvent::CarTelemetry(t) => assert_eq!(t.speed_kph, 199),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_truncated_telemetry_record() {
    // A table that accepts a short telemetry packet: header plus two records
    let mut format = WireFormat::f1_25();
    format.table = ClassificationTable::new(vec![ClassificationEntry::new(
        6,
        29 + 2 * 60,
        PacketKind::CarTelemetry,
    )]);
    let mut buf = write_header(&PacketHeader::new(2025, 6, 5), &format.header);
    buf.resize(29 + 2 * 60, 0);

    assert_eq!(
        decode(&buf, &format),
        Err(DecodeError::TruncatedRecord {
            kind: PacketKind::CarTelemetry,
            needed: 29 + 6 * 60,
            len: 149,
        })
    );
}

// ==================== Lap data ====================

#[test]
fn test_lap_data_sector_split_times() {
    let format = WireFormat::f1_25();
    let sample = LapDataSample {
        last_lap_time_ms: 91_345,
        current_lap_time_ms: 64_010,
        sector1_ms: 28_000,
        sector2_ms: 61_500,
        lap_distance_m: 3_120.5,
        current_lap_number: 4,
        current_lap_invalid: true,
        car_position: 3,
        pit_status: 0,
        sector: 2,
    };
    let buf = encode_lap_data(&PacketHeader::new(2025, 2, 0), &sample, &format);
    let player = 29;
    // Sector 2 crosses a minute: ms part then minutes part
    assert_eq!(u16::from_le_bytes([buf[player + 11], buf[player + 12]]), 1_500);
    assert_eq!(buf[player + 13], 1);

    let header = read_header(&buf, &format.header).unwrap();
    let decoded = decode_lap_data(&buf, &header, &format).unwrap();
    assert_eq!(decoded, sample);
    assert!(!decoded.is_valid());
}

// ==================== Session ====================

#[test]
fn test_session_fields_and_names() {
    let format = WireFormat::f1_25();
    let buf = encode_session(&PacketHeader::new(2025, 1, 0), &session(3), &format);
    assert_eq!(buf.len(), 753);
    assert_eq!(buf[36] as i8, 3);

    match decode(&buf, &format).unwrap().event {
        TelemetryEvent::Session(info) => {
            assert_eq!(info.track_name, "Bahrain");
            assert_eq!(info.session_type_name, "Race");
            assert_eq!(info.track_length_m, 5412);
            assert_eq!(info.track_temp_c, 35);
            assert_eq!(info.total_laps, 57);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_unknown_track_id_gets_label() {
    let format = WireFormat::f1_25();
    let buf = encode_session(&PacketHeader::new(2025, 1, 0), &session(40), &format);
    match decode(&buf, &format).unwrap().event {
        TelemetryEvent::Session(info) => assert_eq!(info.track_name, "Track 40"),
        other => panic!("unexpected event {other:?}"),
    }
}

// ==================== Motion ====================

#[test]
fn test_motion_fields() {
    let format = WireFormat::f1_25();
    let mut sample = MotionSample {
        position: Vector3::new(-120.5, 4.25, 880.0),
        velocity: Vector3::new(55.0, 0.0, -12.0),
        ..Default::default()
    };
    sample.g_force.lateral = 3.2;
    sample.g_force.longitudinal = -4.8;
    sample.g_force.vertical = 1.1;
    sample.orientation.yaw = 1.57;

    let buf = encode_motion(&PacketHeader::new(2025, 0, 21), &sample, &format);
    assert_eq!(buf.len(), 1349);
    assert_eq!(decode(&buf, &format).unwrap().event, TelemetryEvent::Motion(sample));
}

#[test]
fn test_non_finite_floats_read_as_zero() {
    let format = WireFormat::f1_25();
    let mut buf = encode_car_telemetry(&PacketHeader::new(2025, 6, 0), &telemetry(100), &format);
    buf[29 + 2..29 + 6].copy_from_slice(&f32::NAN.to_le_bytes());
    match decode(&buf, &format).unwrap().event {
        TelemetryEvent::CarTelemetry(t) => assert_eq!(t.throttle, 0.0),
        other => panic!("unexpected event {other:?}"),
    }
}
