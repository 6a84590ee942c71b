//! Dump configuration

use serde::Deserialize;

use crate::errors::{DumpError, DumpErrorKind, Result};

/// Largest statement size used when the caller leaves it unset (4 MiB)
pub const DEFAULT_MAX_ALLOWED_PACKET: usize = 4_194_304;

/// Options controlling one dump call
///
/// The output sink and the database handle are passed next to the config
/// rather than stored in it, so a config can be loaded from a file and
/// reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpConfig {
    /// Object names (tables or views) left out of the dump entirely
    pub ignore_tables: Vec<String>,
    /// Upper bound in bytes for one INSERT statement
    pub max_allowed_packet: Option<usize>,
    /// Lock every dumped object for read for the duration of the dump
    pub lock_tables: bool,
}

impl DumpConfig {
    /// Statement size bound, with the default applied when unset
    pub fn effective_max_allowed_packet(&self) -> usize {
        self.max_allowed_packet.unwrap_or(DEFAULT_MAX_ALLOWED_PACKET)
    }

    /// Whether `name` is in the ignore set
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore_tables.iter().any(|item| item == name)
    }

    /// Reject values the engine cannot work with
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: `max_allowed_packet` is zero
    pub fn validate(&self) -> Result<()> {
        if self.max_allowed_packet == Some(0) {
            return Err(DumpError::new(DumpErrorKind::InvalidInput)
                .with_op("validate_config")
                .with_message("max_allowed_packet must be greater than zero"));
        }
        Ok(())
    }
}
