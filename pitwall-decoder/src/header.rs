//! Packet header common to every datagram
//!
//! The feed has gone through several header revisions and older capture
//! scripts disagree on where fields live. One layout is canonical here and
//! all offsets come from a [`HeaderLayout`] value, so a different upstream
//! revision is a new constant rather than a code change.

use crate::classify::PacketKind;
use crate::error::DecodeError;
use crate::reader::ByteReader;

/// Header size of the canonical layout
pub const MIN_HEADER_SIZE: usize = 29;

/// Number of car slots in every per-car packet
pub const MAX_CARS: usize = 22;

/// Player car index meaning "no player car" (spectating); slot 0 is used
pub const PLAYER_INDEX_SENTINEL: u8 = 255;

/// Byte offsets of every header field for one format revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    pub size: usize,
    pub packet_format: usize,
    pub game_year: usize,
    pub game_major_version: usize,
    pub game_minor_version: usize,
    pub packet_version: usize,
    pub packet_id: usize,
    pub session_uid: usize,
    pub session_time: usize,
    pub frame_identifier: usize,
    pub overall_frame_identifier: usize,
    pub secondary_player_car_index: usize,
    pub player_car_index: usize,
}

impl HeaderLayout {
    /// 29-byte header, packet id at 6, player car index in the last byte
    pub const F1_25: HeaderLayout = HeaderLayout {
        size: MIN_HEADER_SIZE,
        packet_format: 0,
        game_year: 2,
        game_major_version: 3,
        game_minor_version: 4,
        packet_version: 5,
        packet_id: 6,
        session_uid: 7,
        session_time: 15,
        frame_identifier: 19,
        overall_frame_identifier: 23,
        secondary_player_car_index: 27,
        player_car_index: 28,
    };
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self::F1_25
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketHeader {
    /// Packet format, e.g. 2025
    pub format_version: u16,
    pub game_year: u8,
    pub game_major_version: u8,
    pub game_minor_version: u8,
    pub packet_version: u8,
    pub packet_type_id: u8,
    pub session_uid: u64,
    pub session_time: f32,
    pub frame_identifier: u32,
    pub overall_frame_identifier: u32,
    pub player_car_index: u8,
    pub secondary_player_car_index: u8,
}

impl PacketHeader {
    /// Header for a packet of the given type with every derived field zeroed
    pub fn new(format_version: u16, packet_type_id: u8, player_car_index: u8) -> Self {
        Self {
            format_version,
            game_year: (format_version % 100) as u8,
            game_major_version: 1,
            game_minor_version: 0,
            packet_version: 1,
            packet_type_id,
            session_uid: 0,
            session_time: 0.0,
            frame_identifier: 0,
            overall_frame_identifier: 0,
            player_car_index,
            secondary_player_car_index: PLAYER_INDEX_SENTINEL,
        }
    }

    /// Car slot holding the player's record; the sentinel maps to slot 0
    pub fn car_slot(&self) -> usize {
        if self.player_car_index == PLAYER_INDEX_SENTINEL {
            0
        } else {
            usize::from(self.player_car_index)
        }
    }
}

/// Read the packet header of `buf` using `layout`.
///
/// Fails with [`DecodeError::TooShort`] when the datagram cannot hold a
/// full header.
pub fn read_header(buf: &[u8], layout: &HeaderLayout) -> Result<PacketHeader, DecodeError> {
    if buf.len() < layout.size {
        return Err(DecodeError::TooShort {
            len: buf.len(),
            min: layout.size,
        });
    }

    let field = |offset: usize| ByteReader::at(buf, offset, PacketKind::Unknown);

    Ok(PacketHeader {
        format_version: field(layout.packet_format).u16_le()?,
        game_year: field(layout.game_year).u8()?,
        game_major_version: field(layout.game_major_version).u8()?,
        game_minor_version: field(layout.game_minor_version).u8()?,
        packet_version: field(layout.packet_version).u8()?,
        packet_type_id: field(layout.packet_id).u8()?,
        session_uid: field(layout.session_uid).u64_le()?,
        session_time: field(layout.session_time).f32_le()?,
        frame_identifier: field(layout.frame_identifier).u32_le()?,
        overall_frame_identifier: field(layout.overall_frame_identifier).u32_le()?,
        player_car_index: field(layout.player_car_index).u8()?,
        secondary_player_car_index: field(layout.secondary_player_car_index).u8()?,
    })
}

/// Serialize `header` into the first `layout.size` bytes of a new buffer
pub fn write_header(header: &PacketHeader, layout: &HeaderLayout) -> Vec<u8> {
    let mut buf = vec![0u8; layout.size];
    let mut put = |offset: usize, bytes: &[u8]| {
        buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    };
    put(layout.packet_format, &header.format_version.to_le_bytes());
    put(layout.game_year, &[header.game_year]);
    put(layout.game_major_version, &[header.game_major_version]);
    put(layout.game_minor_version, &[header.game_minor_version]);
    put(layout.packet_version, &[header.packet_version]);
    put(layout.packet_id, &[header.packet_type_id]);
    put(layout.session_uid, &header.session_uid.to_le_bytes());
    put(layout.session_time, &header.session_time.to_le_bytes());
    put(layout.frame_identifier, &header.frame_identifier.to_le_bytes());
    put(
        layout.overall_frame_identifier,
        &header.overall_frame_identifier.to_le_bytes(),
    );
    put(
        layout.secondary_player_car_index,
        &[header.secondary_player_car_index],
    );
    put(layout.player_car_index, &[header.player_car_index]);
    buf
}
