//! sqldump store - SQLite backend
//!
//! Provides:
//! - Connection helpers (`db`)
//! - rusqlite error mapping onto the dump error taxonomy (`errors`)
//! - `SqliteSource`, a `DumpSource` over one `rusqlite::Connection`

pub mod db;
pub mod errors;
pub mod sqlite_source;

// Re-export key types
pub use errors::Result;
pub use sqlite_source::SqliteSource;
