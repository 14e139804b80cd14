//! Track and session type names

const TRACK_NAMES: [&str; 33] = [
    "Melbourne",
    "Paul Ricard",
    "Shanghai",
    "Bahrain",
    "Barcelona",
    "Monaco",
    "Montreal",
    "Silverstone",
    "Hockenheim",
    "Hungaroring",
    "Spa",
    "Monza",
    "Singapore",
    "Suzuka",
    "Abu Dhabi",
    "Texas",
    "Brazil",
    "Austria",
    "Sochi",
    "Mexico",
    "Baku",
    "Bahrain Short",
    "Silverstone Short",
    "Texas Short",
    "Suzuka Short",
    "Hanoi",
    "Zandvoort",
    "Imola",
    "Portimao",
    "Jeddah",
    "Miami",
    "Las Vegas",
    "Losail",
];

const SESSION_TYPE_NAMES: [&str; 14] = [
    "Unknown",
    "P1",
    "P2",
    "P3",
    "Short P",
    "Q1",
    "Q2",
    "Q3",
    "Short Q",
    "OSQ",
    "Race",
    "Race 2",
    "Race 3",
    "Time Trial",
];

/// Track name for a track id; unmapped ids render as `Track {id}`
pub fn track_name(track_id: i8) -> String {
    usize::try_from(track_id)
        .ok()
        .and_then(|i| TRACK_NAMES.get(i))
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("Track {}", track_id))
}

/// Session type name; unmapped ids render as `Unknown`
pub fn session_type_name(session_type: u8) -> &'static str {
    SESSION_TYPE_NAMES
        .get(usize::from(session_type))
        .copied()
        .unwrap_or(SESSION_TYPE_NAMES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_names() {
        assert_eq!(track_name(0), "Melbourne");
        assert_eq!(track_name(12), "Singapore");
        assert_eq!(track_name(32), "Losail");
    }

    #[test]
    fn test_unmapped_track() {
        assert_eq!(track_name(40), "Track 40");
        assert_eq!(track_name(-1), "Track -1");
    }

    #[test]
    fn test_session_type_names() {
        assert_eq!(session_type_name(0), "Unknown");
        assert_eq!(session_type_name(10), "Race");
        assert_eq!(session_type_name(13), "Time Trial");
        assert_eq!(session_type_name(99), "Unknown");
    }
}
