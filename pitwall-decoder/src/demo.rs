//! Synthetic datagram feed
//!
//! Drives a car around a simple circuit of straights, braking zones, corners
//! and acceleration phases, and encodes what it would see as wire-exact
//! packets. Time only moves when [`DemoFeed::step`] is called, so the feed is
//! fully deterministic.

use crate::encode::{encode_car_telemetry, encode_lap_data, encode_motion, encode_session};
use crate::format::WireFormat;
use crate::header::PacketHeader;
use pitwall_core::model::{
    CarTelemetrySample, GForce, LapDataSample, MotionSample, Orientation, SessionInfo, Vector3,
};
use std::f32::consts::TAU;

const PACKET_FORMAT: u16 = 2025;
const SESSION_UID: u64 = 0x5049_5457_414c_4c00;

/// Silverstone, time trial
const TRACK_ID: i8 = 7;
const SESSION_TYPE: u8 = 13;
const TRACK_LENGTH_M: u16 = 5891;

/// Session packets go out once every this many steps
const SESSION_EVERY: u64 = 60;

/// Sector 1 and 2 as fractions of the lap time
const SECTOR1_SHARE: f32 = 0.31;
const SECTOR2_SHARE: f32 = 0.36;

/// Every `INVALID_EVERY`th lap exceeds track limits
const INVALID_EVERY: u8 = 4;

const MAX_STEER_RAD: f32 = 0.45;

#[derive(Clone, Copy)]
enum SegmentKind {
    Straight,
    Braking,
    Corner,
    Accel,
}

#[derive(Clone, Copy)]
struct TrackSegment {
    kind: SegmentKind,
    /// Seconds to traverse at reference pace
    duration: f32,
    /// m/s at the end of the segment
    target_speed: f32,
    /// Peak steering angle in radians, + is right
    steering: f32,
    lateral_g: f32,
}

const fn seg(
    kind: SegmentKind,
    duration: f32,
    target_speed: f32,
    steering: f32,
    lateral_g: f32,
) -> TrackSegment {
    TrackSegment {
        kind,
        duration,
        target_speed,
        steering,
        lateral_g,
    }
}

use self::SegmentKind::{Accel, Braking, Corner, Straight};

/// An 84 s reference lap
const CIRCUIT: [TrackSegment; 21] = [
    seg(Straight, 8.0, 82.0, 0.0, 0.0),
    seg(Braking, 3.0, 30.0, 0.02, 0.1),
    seg(Corner, 4.0, 27.0, 0.35, 2.4),
    seg(Accel, 3.5, 60.0, 0.1, 0.6),
    seg(Straight, 4.0, 70.0, 0.0, 0.0),
    seg(Braking, 2.0, 50.0, -0.02, -0.1),
    seg(Corner, 3.5, 47.0, -0.22, -3.1),
    seg(Accel, 3.0, 64.0, -0.05, -0.4),
    seg(Straight, 10.0, 88.0, 0.0, 0.0),
    seg(Braking, 2.5, 38.0, 0.05, 0.2),
    seg(Corner, 2.0, 35.0, 0.30, 2.2),
    seg(Corner, 2.0, 33.0, -0.32, -2.3),
    seg(Accel, 3.0, 56.0, -0.05, -0.2),
    seg(Straight, 6.0, 76.0, 0.0, 0.0),
    seg(Braking, 1.5, 58.0, 0.03, 0.1),
    seg(Corner, 5.0, 55.0, 0.18, 3.6),
    seg(Accel, 3.0, 66.0, 0.05, 0.4),
    seg(Braking, 3.5, 24.0, -0.03, -0.1),
    seg(Corner, 4.5, 22.0, -0.42, -1.6),
    seg(Accel, 4.0, 61.0, -0.1, -0.3),
    seg(Straight, 6.0, 80.0, 0.0, 0.0),
];

struct CarState {
    speed: f32,
    throttle: f32,
    brake: f32,
    steering: f32,
    lateral_g: f32,
    longitudinal_g: f32,
    gear: i8,
    rpm: f32,
}

fn reference_lap_secs() -> f32 {
    CIRCUIT.iter().map(|s| s.duration).sum()
}

/// Car state `t` seconds into a reference-pace lap
fn car_state_at(t: f32) -> CarState {
    let t = t.rem_euclid(reference_lap_secs());

    let mut elapsed = 0.0_f32;
    let mut idx = CIRCUIT.len() - 1;
    for (i, s) in CIRCUIT.iter().enumerate() {
        if elapsed + s.duration > t {
            idx = i;
            break;
        }
        elapsed += s.duration;
    }
    if idx == CIRCUIT.len() - 1 && elapsed > t {
        elapsed = reference_lap_secs() - CIRCUIT[idx].duration;
    }

    let s = CIRCUIT[idx];
    let prev = CIRCUIT[(idx + CIRCUIT.len() - 1) % CIRCUIT.len()];
    let seg_t = ((t - elapsed) / s.duration).clamp(0.0, 1.0);
    let eased = smoothstep(seg_t);
    let speed = lerp(prev.target_speed, s.target_speed, eased);

    let (throttle, brake) = match s.kind {
        Straight => (0.95 + 0.05 * (1.0 - seg_t), 0.0),
        Braking => (0.0, (1.0 - eased * 0.3).clamp(0.0, 1.0)),
        Corner => (0.2 + 0.3 * seg_t, 0.0),
        Accel => (0.5 + 0.5 * eased, 0.0),
    };

    // Steering ramps in over the first half of the segment and out over the second
    let envelope = if seg_t < 0.5 {
        smoothstep(seg_t * 2.0)
    } else {
        smoothstep((1.0 - seg_t) * 2.0)
    };

    let gear = speed_to_gear(speed);
    CarState {
        speed,
        throttle,
        brake,
        steering: s.steering * envelope,
        lateral_g: s.lateral_g * envelope,
        longitudinal_g: (s.target_speed - prev.target_speed) / s.duration / 9.81,
        gear,
        rpm: speed_to_rpm(speed, gear),
    }
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn speed_to_gear(speed_ms: f32) -> i8 {
    match speed_ms * 3.6 {
        x if x < 90.0 => 2,
        x if x < 130.0 => 3,
        x if x < 170.0 => 4,
        x if x < 210.0 => 5,
        x if x < 250.0 => 6,
        x if x < 285.0 => 7,
        _ => 8,
    }
}

fn speed_to_rpm(speed_ms: f32, gear: i8) -> f32 {
    let ratio = match gear {
        2 => 410.0,
        3 => 310.0,
        4 => 250.0,
        5 => 210.0,
        6 => 180.0,
        7 => 160.0,
        _ => 140.0,
    };
    (speed_ms * ratio + 4000.0).clamp(4000.0, 13_000.0)
}

/// Deterministic noise in [0, 1)
fn noise(seed: f32) -> f32 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

fn jitter(seed: f32, amplitude: f32) -> f32 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

/// Generates the datagrams a player would send while lapping
pub struct DemoFeed {
    format: WireFormat,
    player_car_index: u8,
    frame: u64,
    session_time: f32,
    lap_number: u8,
    lap_time: f32,
    lap_duration: f32,
    last_lap_ms: u32,
    sector1_ms: u32,
    sector2_ms: u32,
}

impl DemoFeed {
    pub fn new() -> Self {
        Self::with_format(WireFormat::f1_25())
    }

    pub fn with_format(format: WireFormat) -> Self {
        Self {
            format,
            player_car_index: 0,
            frame: 0,
            session_time: 0.0,
            lap_number: 1,
            lap_time: 0.0,
            lap_duration: lap_duration_for(1),
            last_lap_ms: 0,
            sector1_ms: 0,
            sector2_ms: 0,
        }
    }

    /// Put the player's car in another slot
    pub fn with_player_car_index(mut self, index: u8) -> Self {
        self.player_car_index = index;
        self
    }

    pub fn lap_number(&self) -> u8 {
        self.lap_number
    }

    /// Time of the lap currently being driven
    pub fn lap_duration(&self) -> f32 {
        self.lap_duration
    }

    pub fn last_lap_ms(&self) -> u32 {
        self.last_lap_ms
    }

    /// Advance the simulation by `dt` seconds and return the datagrams sent
    /// during this step: car telemetry, motion and lap data, preceded by a
    /// session packet every [`SESSION_EVERY`] steps.
    pub fn step(&mut self, dt: f32) -> Vec<Vec<u8>> {
        self.advance(dt.max(0.0));

        let mut datagrams = Vec::with_capacity(4);
        if self.frame % SESSION_EVERY == 0 {
            datagrams.push(encode_session(
                &self.header(1),
                &self.session_info(),
                &self.format,
            ));
        }

        let car = car_state_at(self.lap_time / self.lap_duration * reference_lap_secs());
        let n = self.frame as f32;

        datagrams.push(encode_car_telemetry(
            &self.header(6),
            &self.telemetry_sample(&car, n),
            &self.format,
        ));
        datagrams.push(encode_motion(
            &self.header(0),
            &self.motion_sample(&car, n),
            &self.format,
        ));
        datagrams.push(encode_lap_data(
            &self.header(2),
            &self.lap_sample(),
            &self.format,
        ));

        self.frame += 1;
        datagrams
    }

    fn advance(&mut self, dt: f32) {
        self.session_time += dt;
        self.lap_time += dt;

        while self.lap_time >= self.lap_duration {
            self.lap_time -= self.lap_duration;
            self.last_lap_ms = secs_to_ms(self.lap_duration);
            self.lap_number = self.lap_number.saturating_add(1);
            self.lap_duration = lap_duration_for(self.lap_number);
            self.sector1_ms = 0;
            self.sector2_ms = 0;
        }

        let (s1, s2) = sector_splits(self.lap_duration);
        let fraction = self.lap_time / self.lap_duration;
        if fraction >= SECTOR1_SHARE {
            self.sector1_ms = s1;
        }
        if fraction >= SECTOR1_SHARE + SECTOR2_SHARE {
            self.sector2_ms = s2;
        }
    }

    fn header(&self, packet_id: u8) -> PacketHeader {
        let mut header = PacketHeader::new(PACKET_FORMAT, packet_id, self.player_car_index);
        header.session_uid = SESSION_UID;
        header.session_time = self.session_time;
        header.frame_identifier = self.frame as u32;
        header.overall_frame_identifier = self.frame as u32;
        header
    }

    fn session_info(&self) -> SessionInfo {
        SessionInfo {
            track_id: TRACK_ID,
            track_name: String::new(),
            session_type_id: SESSION_TYPE,
            session_type_name: String::new(),
            track_length_m: TRACK_LENGTH_M,
            weather: 0,
            track_temp_c: 31,
            air_temp_c: 22,
            total_laps: 0,
        }
    }

    fn telemetry_sample(&self, car: &CarState, n: f32) -> CarTelemetrySample {
        let speed = (car.speed + jitter(n, 0.3)).max(0.0);
        let kph = speed * 3.6;
        let rpm = (car.rpm + jitter(n * 1.1, 40.0)).clamp(4000.0, 13_000.0);
        let heat = kph * 0.08 + car.lateral_g.abs() * 3.0;
        let brake_heat = 350.0 + car.brake * 550.0 + kph * 0.5;

        CarTelemetrySample {
            speed_kph: kph.round() as u16,
            throttle: (car.throttle + jitter(n * 1.2, 0.02)).clamp(0.0, 1.0),
            steering: (car.steering / MAX_STEER_RAD + jitter(n * 1.4, 0.005)).clamp(-1.0, 1.0),
            brake: (car.brake + jitter(n * 1.3, 0.02)).clamp(0.0, 1.0),
            clutch: 0,
            gear: car.gear,
            engine_rpm: rpm.round() as u16,
            drs_active: kph > 270.0 && car.brake == 0.0,
            rev_lights_percent: ((rpm - 4000.0) / 9000.0 * 100.0).clamp(0.0, 100.0) as u8,
            brake_temps: [brake_heat as u16; 4],
            tyre_temps: [
                (88.0 + heat) as u8,
                (88.0 + heat) as u8,
                (92.0 + heat) as u8,
                (92.0 + heat) as u8,
            ],
            tyre_inner_temps: [(98.0 + heat * 0.5) as u8; 4],
            engine_temp: 105,
            tyre_pressures: [
                21.5 + heat * 0.02,
                21.5 + heat * 0.02,
                23.0 + heat * 0.02,
                23.0 + heat * 0.02,
            ],
        }
    }

    fn motion_sample(&self, car: &CarState, n: f32) -> MotionSample {
        let radius = f32::from(TRACK_LENGTH_M) / TAU;
        let angle = self.lap_time / self.lap_duration * TAU;
        let (sin, cos) = angle.sin_cos();
        let lateral = car.lateral_g + jitter(n * 1.5, 0.05);
        let longitudinal = car.longitudinal_g + jitter(n * 1.6, 0.03);

        MotionSample {
            position: Vector3::new(radius * cos, 0.5, radius * sin),
            velocity: Vector3::new(-car.speed * sin, 0.0, car.speed * cos),
            g_force: GForce {
                lateral,
                longitudinal,
                vertical: 1.0 + jitter(n * 4.0, 0.02),
            },
            orientation: Orientation {
                yaw: angle,
                pitch: -longitudinal * 0.02,
                roll: lateral * 0.015,
            },
        }
    }

    fn lap_sample(&self) -> LapDataSample {
        let fraction = self.lap_time / self.lap_duration;
        LapDataSample {
            last_lap_time_ms: self.last_lap_ms,
            current_lap_time_ms: secs_to_ms(self.lap_time),
            sector1_ms: self.sector1_ms,
            sector2_ms: self.sector2_ms,
            lap_distance_m: fraction * f32::from(TRACK_LENGTH_M),
            current_lap_number: self.lap_number,
            current_lap_invalid: self.lap_number % INVALID_EVERY == 0,
            car_position: 1,
            pit_status: 0,
            sector: if self.sector2_ms > 0 {
                2
            } else if self.sector1_ms > 0 {
                1
            } else {
                0
            },
        }
    }
}

impl Default for DemoFeed {
    fn default() -> Self {
        Self::new()
    }
}

fn secs_to_ms(secs: f32) -> u32 {
    (secs * 1000.0).round() as u32
}

/// Lap time for lap `lap`, varied a little around the reference pace
fn lap_duration_for(lap: u8) -> f32 {
    reference_lap_secs() * (1.0 + jitter(f32::from(lap) * 7.31, 0.012))
}

/// (sector 1, sector 2) in ms for a lap of `lap_secs`
fn sector_splits(lap_secs: f32) -> (u32, u32) {
    let s1 = secs_to_ms(lap_secs * SECTOR1_SHARE);
    let s2 = secs_to_ms(lap_secs * (SECTOR1_SHARE + SECTOR2_SHARE)) - s1;
    (s1, s2)
}
