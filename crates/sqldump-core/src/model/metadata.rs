//! Banner metadata and run summary

use chrono::{DateTime, Utc};

/// Format version written into the dump banner
pub const DUMP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Values rendered into the header and footer
///
/// Version strings are captured before any data is copied; the completion
/// time is set only after the last object has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpMetadata {
    pub dump_version: String,
    pub server_version: String,
    pub complete_time: Option<String>,
}

impl DumpMetadata {
    pub fn new(server_version: impl Into<String>) -> Self {
        Self {
            dump_version: DUMP_VERSION.to_string(),
            server_version: server_version.into(),
            complete_time: None,
        }
    }

    /// Record the completion timestamp
    pub fn mark_complete(&mut self, at: DateTime<Utc>) {
        self.complete_time = Some(at.format("%Y-%m-%d %H:%M:%S").to_string());
    }
}

/// Counters for a finished dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub objects: usize,
    pub tables: usize,
    pub views: usize,
    pub rows: u64,
    pub statements: u64,
}
