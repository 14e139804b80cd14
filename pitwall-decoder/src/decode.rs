//! Datagram decoding pipeline: header, classification, field decoder

use crate::classify::PacketKind;
use crate::error::DecodeError;
use crate::format::WireFormat;
use crate::header::{read_header, PacketHeader};
use crate::packets::{decode_car_telemetry, decode_lap_data, decode_motion, decode_session};
use pitwall_core::TelemetryEvent;
use tracing::trace;

/// A datagram that was recognised and decoded for the player's car
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    pub header: PacketHeader,
    pub event: TelemetryEvent,
}

impl DecodedPacket {
    pub fn kind(&self) -> PacketKind {
        match self.event {
            TelemetryEvent::Motion(_) => PacketKind::Motion,
            TelemetryEvent::Session(_) => PacketKind::Session,
            TelemetryEvent::LapData(_) => PacketKind::LapData,
            TelemetryEvent::CarTelemetry(_) => PacketKind::CarTelemetry,
        }
    }
}

/// Decode one datagram.
///
/// Datagrams whose (packet id, length) is not in the format's table are
/// reported as [`DecodeError::UnknownPacketKind`]; nothing is guessed.
pub fn decode(buf: &[u8], format: &WireFormat) -> Result<DecodedPacket, DecodeError> {
    let header = read_header(buf, &format.header)?;
    let kind = format.table.classify(header.packet_type_id, buf.len());
    trace!(
        packet_id = header.packet_type_id,
        len = buf.len(),
        %kind,
        "classified datagram"
    );
    let event = decode_kind(buf, &header, kind, format)?;
    Ok(DecodedPacket { header, event })
}

/// Run the field decoder for an already classified datagram
pub fn decode_kind(
    buf: &[u8],
    header: &PacketHeader,
    kind: PacketKind,
    format: &WireFormat,
) -> Result<TelemetryEvent, DecodeError> {
    match kind {
        PacketKind::Motion => decode_motion(buf, header, format).map(TelemetryEvent::Motion),
        PacketKind::Session => decode_session(buf, format).map(TelemetryEvent::Session),
        PacketKind::LapData => decode_lap_data(buf, header, format).map(TelemetryEvent::LapData),
        PacketKind::CarTelemetry => {
            decode_car_telemetry(buf, header, format).map(TelemetryEvent::CarTelemetry)
        }
        PacketKind::Unknown => Err(DecodeError::UnknownPacketKind {
            packet_id: header.packet_type_id,
            len: buf.len(),
        }),
    }
}
