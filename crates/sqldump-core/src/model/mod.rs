//! Data model for a dump run
//!
//! - `DumpConfig`: caller supplied, read-only for one dump
//! - `SchemaObject`: one table or view discovered in the catalog
//! - `DumpMetadata`: banner values for the header and footer

pub mod config;
pub mod metadata;
pub mod object;

pub use config::{DumpConfig, DEFAULT_MAX_ALLOWED_PACKET};
pub use metadata::{DumpMetadata, DumpSummary};
pub use object::{ObjectKind, SchemaObject};
