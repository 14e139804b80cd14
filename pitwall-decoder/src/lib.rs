//! Packet decoding for the F1 UDP telemetry feed
//!
//! A datagram goes through three stages: the header is read with a
//! [`HeaderLayout`], the (packet id, length) pair is classified against a
//! [`ClassificationTable`], and the matching field decoder extracts the
//! player car's record. [`decode`] runs all three.

pub mod classify;
pub mod decode;
pub mod demo;
pub mod encode;
pub mod error;
pub mod format;
pub mod header;
pub mod lookup;
pub mod packets;
mod reader;

pub use classify::{ClassificationEntry, ClassificationTable, PacketKind};
pub use decode::{decode, decode_kind, DecodedPacket};
pub use demo::DemoFeed;
pub use error::DecodeError;
pub use format::{RecordSizes, WireFormat};
pub use header::{read_header, HeaderLayout, PacketHeader, MAX_CARS, MIN_HEADER_SIZE};
