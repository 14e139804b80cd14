//! Packet classification by (packet id, datagram length)
//!
//! The feed reuses packet ids across format revisions, so the id alone is
//! not trusted: a datagram is only decoded when both its id and its exact
//! length match a known entry.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Motion,
    Session,
    LapData,
    CarTelemetry,
    Unknown,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketKind::Motion => "motion",
            PacketKind::Session => "session",
            PacketKind::LapData => "lap data",
            PacketKind::CarTelemetry => "car telemetry",
            PacketKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationEntry {
    pub packet_id: u8,
    pub length: usize,
    pub kind: PacketKind,
}

impl ClassificationEntry {
    pub const fn new(packet_id: u8, length: usize, kind: PacketKind) -> Self {
        Self {
            packet_id,
            length,
            kind,
        }
    }
}

/// Known packet shapes for one feed format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationTable {
    entries: Vec<ClassificationEntry>,
}

impl ClassificationTable {
    pub fn new(entries: Vec<ClassificationEntry>) -> Self {
        Self { entries }
    }

    /// Packet sizes of the 2025 feed
    pub fn f1_25() -> Self {
        Self::new(vec![
            ClassificationEntry::new(0, 1349, PacketKind::Motion),
            ClassificationEntry::new(1, 753, PacketKind::Session),
            ClassificationEntry::new(2, 1285, PacketKind::LapData),
            ClassificationEntry::new(6, 1352, PacketKind::CarTelemetry),
        ])
    }

    /// Exact match on both id and length, otherwise [`PacketKind::Unknown`]
    pub fn classify(&self, packet_id: u8, length: usize) -> PacketKind {
        self.entries
            .iter()
            .find(|e| e.packet_id == packet_id && e.length == length)
            .map(|e| e.kind)
            .unwrap_or(PacketKind::Unknown)
    }

    pub fn entries(&self) -> &[ClassificationEntry] {
        &self.entries
    }

    /// Datagram length registered for `kind`, if any
    pub fn expected_length(&self, kind: PacketKind) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.length)
    }

    /// Packet id registered for `kind`, if any
    pub fn packet_id(&self, kind: PacketKind) -> Option<u8> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.packet_id)
    }
}

impl Default for ClassificationTable {
    fn default() -> Self {
        Self::f1_25()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_shapes() {
        let table = ClassificationTable::f1_25();
        assert_eq!(table.classify(0, 1349), PacketKind::Motion);
        assert_eq!(table.classify(1, 753), PacketKind::Session);
        assert_eq!(table.classify(2, 1285), PacketKind::LapData);
        assert_eq!(table.classify(6, 1352), PacketKind::CarTelemetry);
    }

    #[test]
    fn test_length_must_match_exactly() {
        let table = ClassificationTable::f1_25();
        assert_eq!(table.classify(6, 1351), PacketKind::Unknown);
        assert_eq!(table.classify(6, 1353), PacketKind::Unknown);
        // Right length, wrong id
        assert_eq!(table.classify(3, 1349), PacketKind::Unknown);
    }

    #[test]
    fn test_expected_length_and_id() {
        let table = ClassificationTable::default();
        assert_eq!(table.expected_length(PacketKind::LapData), Some(1285));
        assert_eq!(table.packet_id(PacketKind::CarTelemetry), Some(6));
        assert_eq!(table.expected_length(PacketKind::Unknown), None);
    }

    #[test]
    fn test_custom_table() {
        let table = ClassificationTable::new(vec![ClassificationEntry::new(
            9,
            100,
            PacketKind::Session,
        )]);
        assert_eq!(table.classify(9, 100), PacketKind::Session);
        assert_eq!(table.classify(1, 753), PacketKind::Unknown);
        assert_eq!(table.entries().len(), 1);
    }
}
