//! Field decoders, one per packet kind
//!
//! Per-car packets hold [`MAX_CARS`](crate::header::MAX_CARS) fixed-size
//! records after the header; only the player's record is read. The session
//! packet is global and read at absolute offsets.

pub mod car_telemetry;
pub mod lap_data;
pub mod motion;
pub mod session;

pub use car_telemetry::decode_car_telemetry;
pub use lap_data::decode_lap_data;
pub use motion::decode_motion;
pub use session::decode_session;

use crate::classify::PacketKind;
use crate::error::DecodeError;
use crate::format::WireFormat;
use crate::header::PacketHeader;
use crate::reader::ByteReader;

/// Position a reader at the player's record of a per-car packet.
///
/// The whole record must lie inside the datagram, otherwise the packet
/// carries no usable data for the player and [`DecodeError::TruncatedRecord`]
/// is returned.
pub(crate) fn player_record<'a>(
    buf: &'a [u8],
    header: &PacketHeader,
    format: &WireFormat,
    kind: PacketKind,
    record_size: usize,
) -> Result<ByteReader<'a>, DecodeError> {
    let offset = format.record_offset(record_size, header.car_slot());
    let needed = offset + record_size;
    if needed > buf.len() {
        return Err(DecodeError::TruncatedRecord {
            kind,
            needed,
            len: buf.len(),
        });
    }
    Ok(ByteReader::at(&buf[..needed], offset, kind))
}
