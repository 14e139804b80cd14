//! Wire format description: header layout, packet table and record sizes

use crate::classify::{ClassificationTable, PacketKind};
use crate::header::HeaderLayout;

/// Size in bytes of each car's record in the per-car packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSizes {
    pub motion: usize,
    pub lap_data: usize,
    pub car_telemetry: usize,
}

impl RecordSizes {
    pub const F1_25: RecordSizes = RecordSizes {
        motion: 60,
        lap_data: 57,
        car_telemetry: 60,
    };

    /// Record size of a per-car kind; `None` for global or unknown packets
    pub fn for_kind(&self, kind: PacketKind) -> Option<usize> {
        match kind {
            PacketKind::Motion => Some(self.motion),
            PacketKind::LapData => Some(self.lap_data),
            PacketKind::CarTelemetry => Some(self.car_telemetry),
            PacketKind::Session | PacketKind::Unknown => None,
        }
    }
}

/// Everything the decoder needs to know about one feed revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFormat {
    pub header: HeaderLayout,
    pub table: ClassificationTable,
    pub records: RecordSizes,
}

impl WireFormat {
    pub fn f1_25() -> Self {
        Self {
            header: HeaderLayout::F1_25,
            table: ClassificationTable::f1_25(),
            records: RecordSizes::F1_25,
        }
    }

    /// Byte offset of car `slot`'s record in a per-car packet
    pub fn record_offset(&self, record_size: usize, slot: usize) -> usize {
        self.header.size + slot * record_size
    }
}

impl Default for WireFormat {
    fn default() -> Self {
        Self::f1_25()
    }
}
