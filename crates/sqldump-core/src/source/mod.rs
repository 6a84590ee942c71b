//! Database driver seam
//!
//! Every round-trip a dump makes goes through [`DumpSource`]. The engine
//! never builds dialect SQL for introspection itself; a source answers the
//! catalog questions (object listing, create statement, column metadata) in
//! the shape a MySQL-family server would, and streams rows to a
//! [`RowVisitor`] from its native cursor.

pub mod memory;

use crate::dialect::Dialect;
use crate::errors::Result;

/// Generic kind a driver reports for a result column, independent of the
/// dialect's type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Integer,
    Float,
    String,
    /// The driver has no generic kind for this column
    Dynamic,
}

/// Type information for one column of a live row cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    pub name: String,
    pub scan_kind: ScanKind,
    /// Dialect type name as reported by the database (`VARCHAR`, `BLOB`, ...)
    pub database_type_name: String,
}

impl ColumnType {
    pub fn new(
        name: impl Into<String>,
        scan_kind: ScanKind,
        database_type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            scan_kind,
            database_type_name: database_type_name.into(),
        }
    }
}

/// One value of the current cursor row, borrowed from the driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Null,
    Integer(i64),
    Float(f64),
    Text(&'a [u8]),
    Blob(&'a [u8]),
}

impl RawValue<'_> {
    /// Storage class name used in decode error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Text(_) => "text",
            RawValue::Blob(_) => "blob",
        }
    }
}

/// The current row of a cursor
pub trait SourceRow {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`
    ///
    /// # Errors
    ///
    /// Driver-level failures reading the value (reported as `Scan`).
    fn value(&self, index: usize) -> Result<RawValue<'_>>;
}

/// Receives the rows of one `select_rows` call
///
/// Returning an error from either method stops the cursor; the source
/// releases it and returns that same error.
pub trait RowVisitor {
    /// Called once, before the first row, with the cursor's column types
    fn start(&mut self, columns: &[ColumnType]) -> Result<()>;

    /// Called once per row, in cursor order
    fn row(&mut self, row: &dyn SourceRow) -> Result<()>;
}

/// One row of the object catalog (`SHOW FULL TABLES` shape)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: Option<String>,
    pub table_type: Option<String>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, table_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            table_type: Some(table_type.into()),
        }
    }
}

/// A small, fully materialized metadata result (show-create, show-columns)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; values beyond the column count are kept as-is
    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    /// Index of the first column whose name is one of `names`
    pub fn column_index(&self, names: &[&str]) -> Option<usize> {
        self.columns
            .iter()
            .position(|col| names.iter().any(|n| n == col))
    }
}

/// A database handle that can serve one dump
///
/// Implementations must keep every call after `begin_snapshot` inside the
/// same read-only, repeatable-read transaction and must never write.
pub trait DumpSource: Send {
    /// SQL dialect the dump is written in, so it replays into this kind of server
    fn dialect(&self) -> Dialect;

    /// Begin the read-only, repeatable-read snapshot transaction
    fn begin_snapshot(&mut self) -> Result<()>;

    /// Make `name` the current database for the rest of the snapshot
    fn use_database(&mut self, name: &str) -> Result<()>;

    /// Server version string, `None` when the server reports NULL
    fn server_version(&mut self) -> Result<Option<String>>;

    /// Every table and view, in catalog order
    fn list_objects(&mut self) -> Result<Vec<CatalogEntry>>;

    /// The "show create" response for `object`: name first, statement second
    fn show_create(&mut self, object: &str) -> Result<ResultSet>;

    /// The "show columns" response for `object` (`Field`, ..., `Extra`)
    fn show_columns(&mut self, object: &str) -> Result<ResultSet>;

    /// Run `SELECT <columns> FROM <object>` and feed the cursor to `visitor`
    fn select_rows(
        &mut self,
        object: &str,
        columns: &[String],
        visitor: &mut dyn RowVisitor,
    ) -> Result<()>;

    /// Take a read lock on every named object
    fn lock_tables(&mut self, objects: &[String]) -> Result<()>;

    /// Release locks taken by `lock_tables`
    fn unlock_tables(&mut self) -> Result<()>;

    /// Roll back the snapshot; a no-op when none is active
    fn rollback(&mut self) -> Result<()>;
}
