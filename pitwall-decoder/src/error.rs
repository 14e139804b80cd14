//! Decode-time error taxonomy
//!
//! None of these are fatal: the ingest loop drops the datagram and keeps
//! the previous session state.

use crate::classify::PacketKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Datagram is shorter than the packet header
    #[error("datagram too short: {len} bytes (header needs {min})")]
    TooShort { len: usize, min: usize },

    /// The (packet id, length) pair is not in the classification table
    #[error("unrecognised packet: id {packet_id} with {len} bytes")]
    UnknownPacketKind { packet_id: u8, len: usize },

    /// The player's record lies (partly) beyond the end of the datagram
    #[error("{kind} record truncated: needs {needed} bytes, datagram has {len}")]
    TruncatedRecord {
        kind: PacketKind,
        needed: usize,
        len: usize,
    },
}
