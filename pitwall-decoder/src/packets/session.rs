//! Session packet (id 1)
//!
//! Session data describes the whole session, not a car, so fields sit at
//! fixed offsets from the start of the datagram.

use crate::classify::PacketKind;
use crate::error::DecodeError;
use crate::format::WireFormat;
use crate::lookup::{session_type_name, track_name};
use crate::reader::ByteReader;
use pitwall_core::model::SessionInfo;

/// Bytes that must follow the header for a usable session packet: weather,
/// temperatures, total laps, track length, session type and track id
pub const SESSION_FIELDS_LEN: usize = 8;

pub fn decode_session(buf: &[u8], format: &WireFormat) -> Result<SessionInfo, DecodeError> {
    let base = format.header.size;
    let needed = base + SESSION_FIELDS_LEN;
    if buf.len() < needed {
        return Err(DecodeError::TruncatedRecord {
            kind: PacketKind::Session,
            needed,
            len: buf.len(),
        });
    }

    let mut r = ByteReader::at(buf, base, PacketKind::Session);
    let weather = r.u8()?;
    let track_temp_c = r.i8()?;
    let air_temp_c = r.i8()?;
    let total_laps = r.u8()?;
    let track_length_m = r.u16_le()?;
    let session_type_id = r.u8()?;
    let track_id = r.i8()?;

    Ok(SessionInfo {
        track_id,
        track_name: track_name(track_id),
        session_type_id,
        session_type_name: session_type_name(session_type_id).to_string(),
        track_length_m,
        weather,
        track_temp_c,
        air_temp_c,
        total_laps,
    })
}
