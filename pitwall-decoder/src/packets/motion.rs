//! Motion packet (id 0)

use super::player_record;
use crate::classify::PacketKind;
use crate::error::DecodeError;
use crate::format::WireFormat;
use crate::header::PacketHeader;
use pitwall_core::model::{GForce, MotionSample, Orientation, Vector3};

// Forward and right direction vectors, packed as i16 triples
const DIRECTION_VECTORS: usize = 12;

pub fn decode_motion(
    buf: &[u8],
    header: &PacketHeader,
    format: &WireFormat,
) -> Result<MotionSample, DecodeError> {
    let mut r = player_record(
        buf,
        header,
        format,
        PacketKind::Motion,
        format.records.motion,
    )?;

    let [px, py, pz] = r.f32_le_array::<3>()?;
    let [vx, vy, vz] = r.f32_le_array::<3>()?;
    r.skip(DIRECTION_VECTORS)?;
    let [lateral, longitudinal, vertical] = r.f32_le_array::<3>()?;
    let [yaw, pitch, roll] = r.f32_le_array::<3>()?;

    Ok(MotionSample {
        position: Vector3::new(px, py, pz),
        velocity: Vector3::new(vx, vy, vz),
        g_force: GForce {
            lateral,
            longitudinal,
            vertical,
        },
        orientation: Orientation { yaw, pitch, roll },
    })
}
