//! sqldump core - consistent logical dumps of a live database
//!
//! This crate holds everything that does not depend on a particular driver:
//! - The structured error facility and logging facility
//! - The dump model (configuration, schema objects, banner metadata)
//! - The `DumpSource` driver seam plus a scripted in-memory source
//! - Column type resolution, value decoding and per-dialect SQL literal encoding
//! - Row streaming, INSERT batching and the mysqldump-style templates
//! - The `Dumper`, which ties them together inside one read-only snapshot

pub mod batch;
pub mod decode;
pub mod dialect;
pub mod dump;
pub mod encode;
pub mod errors;
pub mod introspect;
pub mod logging_facility;
pub mod model;
pub mod render;
pub mod snapshot;
pub mod source;
pub mod stream;

// Re-export commonly used types
pub use dialect::Dialect;
pub use dump::Dumper;
pub use errors::{DumpError, DumpErrorKind, Result};
pub use model::{DumpConfig, DumpMetadata, DumpSummary, ObjectKind, SchemaObject};
pub use source::{DumpSource, RowVisitor, SourceRow};
