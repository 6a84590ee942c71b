//! Error handling for sqldump-store
//!
//! Maps rusqlite failures onto the core `DumpError` taxonomy

use sqldump_core::errors::{DumpError, DumpErrorKind};

/// Result type alias using DumpError
pub type Result<T> = std::result::Result<T, DumpError>;

/// Create a query error from rusqlite::Error
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> DumpError {
    DumpError::new(DumpErrorKind::Query)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

/// Create a connection error from rusqlite::Error
pub fn connection_error(op: &str, err: rusqlite::Error) -> DumpError {
    DumpError::new(DumpErrorKind::Connection)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

/// Create a scan error for a value that could not be read from a row
pub fn scan_error(op: &str, err: rusqlite::Error) -> DumpError {
    DumpError::new(DumpErrorKind::Scan)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = from_rusqlite("list_objects", rusqlite::Error::InvalidQuery);
        assert_eq!(err.kind(), DumpErrorKind::Query);
        assert_eq!(err.op(), Some("list_objects"));

        let err = connection_error("open", rusqlite::Error::InvalidQuery);
        assert_eq!(err.code(), "ERR_CONNECTION");
    }
}
