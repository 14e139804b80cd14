//! Integration tests for the DemoFeed

use pitwall_core::TelemetryEvent;
use pitwall_decoder::{decode, DemoFeed, PacketKind, WireFormat};

const DT: f32 = 1.0 / 60.0;

#[test]
fn test_first_step_includes_session() {
    let mut feed = DemoFeed::new();
    let datagrams = feed.step(DT);
    let kinds: Vec<PacketKind> = datagrams
        .iter()
        .map(|d| decode(d, &WireFormat::f1_25()).unwrap().kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            PacketKind::Session,
            PacketKind::CarTelemetry,
            PacketKind::Motion,
            PacketKind::LapData,
        ]
    );
}

#[test]
fn test_every_datagram_decodes() {
    let format = WireFormat::f1_25();
    let mut feed = DemoFeed::new();
    for _ in 0..600 {
        for datagram in feed.step(DT) {
            decode(&datagram, &format).expect("demo datagram should decode");
        }
    }
}

#[test]
fn test_telemetry_values_in_range() {
    let format = WireFormat::f1_25();
    let mut feed = DemoFeed::new();
    for _ in 0..1200 {
        for datagram in feed.step(DT) {
            if let TelemetryEvent::CarTelemetry(t) = decode(&datagram, &format).unwrap().event {
                assert!((0.0..=1.0).contains(&t.throttle));
                assert!((0.0..=1.0).contains(&t.brake));
                assert!((-1.0..=1.0).contains(&t.steering));
                assert!((2..=8).contains(&t.gear));
                assert!(t.speed_kph > 50 && t.speed_kph < 360);
            }
        }
    }
}

#[test]
fn test_lap_rolls_over_with_sectors() {
    let format = WireFormat::f1_25();
    let mut feed = DemoFeed::new();
    let first_lap = feed.lap_duration();

    let mut before_rollover = None;
    let mut after_rollover = None;
    let steps = ((first_lap + 1.0) / DT) as usize;
    for _ in 0..steps {
        for datagram in feed.step(DT) {
            if let TelemetryEvent::LapData(lap) = decode(&datagram, &format).unwrap().event {
                if lap.current_lap_number == 1 {
                    before_rollover = Some(lap);
                } else if after_rollover.is_none() {
                    after_rollover = Some(lap);
                }
            }
        }
    }

    let before = before_rollover.expect("saw lap 1");
    let after = after_rollover.expect("saw lap 2");
    assert!(before.sector1_ms > 0 && before.sector2_ms > 0);
    assert_eq!(before.last_lap_time_ms, 0);
    assert_eq!(after.current_lap_number, 2);
    assert_eq!(after.sector1_ms, 0);
    assert_eq!(after.last_lap_time_ms, feed.last_lap_ms());
    assert!(after.last_lap_time_ms > before.sector1_ms + before.sector2_ms);
}

#[test]
fn test_player_car_index_is_honoured() {
    let format = WireFormat::f1_25();
    let mut feed = DemoFeed::new().with_player_car_index(9);
    for datagram in feed.step(DT) {
        let decoded = decode(&datagram, &format).unwrap();
        assert_eq!(decoded.header.player_car_index, 9);
    }
}
