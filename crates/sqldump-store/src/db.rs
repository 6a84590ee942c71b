//! Database connection management
//!
//! Provides utilities for opening SQLite connections to dump from

use crate::errors::{connection_error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

/// How long a statement waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open an existing SQLite database at the given path
///
/// The file must already exist; a dump never creates one.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|e| connection_error("open", e))?;
    configure(&conn)?;
    Ok(conn)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(|e| connection_error("open", e))?;
    configure(&conn)?;
    Ok(conn)
}

/// Configure a connection for dumping
///
/// Nothing here changes the database file: the journal mode is left as it
/// is.
pub fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| connection_error("configure", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = open(dir.path().join("absent.db")).unwrap_err();
        assert_eq!(err.code(), "ERR_CONNECTION");
        assert!(!dir.path().join("absent.db").exists());
    }

    #[test]
    fn test_open_in_memory() {
        let conn = open_in_memory().unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |r| r.get(0)).unwrap();
        assert_eq!(one, 1);
    }
}
