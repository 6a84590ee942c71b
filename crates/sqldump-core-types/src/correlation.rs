//! Correlation identifier for dump runs
//!
//! Every dump gets one `DumpId`; it is attached to the start/end events so
//! the log lines of one run can be grouped even when several dumps share a
//! process.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single dump run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DumpId(String);

impl DumpId {
    /// Generate a new DumpId using UUIDv7 (time ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for DumpId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DumpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_id_unique() {
        let a = DumpId::new();
        let b = DumpId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_dump_id_display_matches_as_str() {
        let id = DumpId::from_string("dump-1".to_string());
        assert_eq!(id.to_string(), "dump-1");
        assert_eq!(id.as_str(), "dump-1");
    }

    #[test]
    fn test_dump_id_serde_round_trip() {
        let id = DumpId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: DumpId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
