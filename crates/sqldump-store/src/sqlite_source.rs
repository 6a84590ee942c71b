//! SQLite implementation of the dump driver seam
//!
//! The snapshot is a deferred read transaction on a `query_only` connection.
//! A catalog read right after `BEGIN` takes the read lock, so every later
//! query sees the same database state. SQLite has no `SHOW` statements; the
//! catalog answers are built from `sqlite_master` and `pragma_table_xinfo`
//! in the shape the core expects.
//!
//! A declared column type is only an affinity: any cell may hold any storage
//! class. Row cursors therefore report every column as dynamic, and each
//! value is dumped in the storage class it actually has.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Row};
use sqldump_core::errors::{DumpError, DumpErrorKind};
use sqldump_core::Dialect;
use sqldump_core::source::{
    CatalogEntry, ColumnType, DumpSource, RawValue, ResultSet, RowVisitor, ScanKind, SourceRow,
};
use std::path::Path;

use crate::db;
use crate::errors::{connection_error, from_rusqlite, scan_error, Result};

const MAIN_SCHEMA: &str = "main";

/// `DumpSource` over a single SQLite connection
pub struct SqliteSource {
    conn: Connection,
    schema: String,
}

impl SqliteSource {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            schema: MAIN_SCHEMA.to_string(),
        }
    }

    /// Open the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(db::open(path)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Schema name later catalog and row queries are scoped to
    pub fn schema(&self) -> &str {
        &self.schema
    }

    fn master_table(&self) -> String {
        format!("{}.sqlite_master", quote(&self.schema))
    }

    /// Take the read lock on the current schema's file
    fn pin_snapshot(&self, op: &str) -> Result<()> {
        let sql = format!("SELECT count(*) FROM {}", self.master_table());
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map_err(|e| from_rusqlite(op, e))?;
        Ok(())
    }
}

impl DumpSource for SqliteSource {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn begin_snapshot(&mut self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA query_only = ON; BEGIN DEFERRED;")
            .map_err(|e| connection_error("begin_snapshot", e))?;
        self.pin_snapshot("begin_snapshot")?;
        tracing::debug!(schema = %self.schema, "Began read-only snapshot");
        Ok(())
    }

    fn use_database(&mut self, name: &str) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_database_list")
            .map_err(|e| from_rusqlite("use_database", e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| from_rusqlite("use_database", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| from_rusqlite("use_database", e))?;

        if !names.iter().any(|n| n == name) {
            return Err(DumpError::new(DumpErrorKind::Connection)
                .with_op("use_database")
                .with_message(format!("unknown database '{}'", name)));
        }
        self.schema = name.to_string();
        self.pin_snapshot("use_database")
    }

    fn server_version(&mut self) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|e| from_rusqlite("server_version", e))
    }

    fn list_objects(&mut self) -> Result<Vec<CatalogEntry>> {
        let sql = format!(
            "SELECT name, CASE type WHEN 'view' THEN 'VIEW' ELSE 'BASE TABLE' END
             FROM {}
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
             ORDER BY rowid",
            self.master_table()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| from_rusqlite("list_objects", e))?;
        let entries = stmt
            .query_map([], |row| {
                Ok(CatalogEntry {
                    name: row.get(0)?,
                    table_type: row.get(1)?,
                })
            })
            .map_err(|e| from_rusqlite("list_objects", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| from_rusqlite("list_objects", e))?;
        Ok(entries)
    }

    fn show_create(&mut self, object: &str) -> Result<ResultSet> {
        let sql = format!(
            "SELECT name, sql FROM {} WHERE name = ?1 AND type IN ('table', 'view')",
            self.master_table()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| from_rusqlite("show_create", e))?;
        let rows = stmt
            .query_map([object], |row| {
                Ok(vec![row.get::<_, Option<String>>(0)?, row.get(1)?])
            })
            .map_err(|e| from_rusqlite("show_create", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| from_rusqlite("show_create", e))?;

        let mut rs = ResultSet::new(vec!["Table".to_string(), "Create Table".to_string()]);
        for row in rows {
            rs.push_row(row);
        }
        Ok(rs)
    }

    fn show_columns(&mut self, object: &str) -> Result<ResultSet> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name, type, \"notnull\", dflt_value, pk, hidden
                 FROM pragma_table_xinfo(?1, ?2)
                 ORDER BY cid",
            )
            .map_err(|e| from_rusqlite("show_columns", e))?;
        let rows = stmt
            .query_map([object, self.schema.as_str()], column_metadata_row)
            .map_err(|e| from_rusqlite("show_columns", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| from_rusqlite("show_columns", e))?;

        let mut rs = ResultSet::new(
            ["Field", "Type", "Null", "Key", "Default", "Extra"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        for row in rows {
            rs.push_row(row);
        }
        Ok(rs)
    }

    fn select_rows(
        &mut self,
        object: &str,
        columns: &[String],
        visitor: &mut dyn RowVisitor,
    ) -> Result<()> {
        let column_list = columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {}.{}",
            column_list,
            quote(&self.schema),
            quote(object)
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| from_rusqlite("select_rows", e).with_object(object))?;

        let types: Vec<ColumnType> = stmt
            .column_names()
            .into_iter()
            .map(|name| ColumnType::new(name, ScanKind::Dynamic, ""))
            .collect();
        visitor.start(&types)?;

        let len = types.len();
        let mut rows = stmt
            .query([])
            .map_err(|e| from_rusqlite("select_rows", e).with_object(object))?;
        while let Some(row) = rows
            .next()
            .map_err(|e| from_rusqlite("select_rows", e).with_object(object))?
        {
            visitor.row(&SqliteRow { row, len })?;
        }
        Ok(())
    }

    fn lock_tables(&mut self, objects: &[String]) -> Result<()> {
        // The snapshot's read lock already covers every object; touching
        // each one fails early if it disappeared since the listing.
        for object in objects {
            let sql = format!(
                "SELECT 1 FROM {}.{} LIMIT 0",
                quote(&self.schema),
                quote(object)
            );
            self.conn
                .execute_batch(&sql)
                .map_err(|e| from_rusqlite("lock_tables", e).with_object(object.clone()))?;
        }
        tracing::debug!(object_count = objects.len(), "Objects locked for read");
        Ok(())
    }

    fn unlock_tables(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let rolled_back = if self.conn.is_autocommit() {
            Ok(())
        } else {
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(|e| from_rusqlite("rollback", e))
        };
        let restored = self
            .conn
            .execute_batch("PRAGMA query_only = OFF")
            .map_err(|e| from_rusqlite("rollback", e));
        self.schema = MAIN_SCHEMA.to_string();
        rolled_back.and(restored)
    }
}

/// One `pragma_table_xinfo` row in show-columns shape
fn column_metadata_row(row: &Row<'_>) -> rusqlite::Result<Vec<Option<String>>> {
    let not_null: i64 = row.get(2)?;
    let pk: i64 = row.get(4)?;
    let hidden: i64 = row.get(5)?;
    let extra = match hidden {
        1 => "VIRTUAL HIDDEN",
        2 => "VIRTUAL GENERATED",
        3 => "STORED GENERATED",
        _ => "",
    };
    Ok(vec![
        row.get(0)?,
        row.get(1)?,
        Some(if not_null != 0 { "NO" } else { "YES" }.to_string()),
        Some(if pk > 0 { "PRI" } else { "" }.to_string()),
        row.get(3)?,
        Some(extra.to_string()),
    ])
}

struct SqliteRow<'a, 'stmt> {
    row: &'a Row<'stmt>,
    len: usize,
}

impl SourceRow for SqliteRow<'_, '_> {
    fn len(&self) -> usize {
        self.len
    }

    fn value(&self, index: usize) -> Result<RawValue<'_>> {
        let value = self
            .row
            .get_ref(index)
            .map_err(|e| scan_error("read_value", e))?;
        Ok(match value {
            ValueRef::Null => RawValue::Null,
            ValueRef::Integer(i) => RawValue::Integer(i),
            ValueRef::Real(f) => RawValue::Float(f),
            ValueRef::Text(t) => RawValue::Text(t),
            ValueRef::Blob(b) => RawValue::Blob(b),
        })
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SqliteSource {
        let conn = db::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL,
                             twice INT GENERATED ALWAYS AS (id * 2) VIRTUAL);
             CREATE VIEW v AS SELECT id FROM t;
             INSERT INTO t (id, name) VALUES (1, 'a');",
        )
        .unwrap();
        SqliteSource::new(conn)
    }

    #[test]
    fn test_catalog_lists_tables_and_views_in_creation_order() {
        let mut src = source();
        src.begin_snapshot().unwrap();
        let entries = src.list_objects().unwrap();
        assert_eq!(
            entries,
            vec![CatalogEntry::new("t", "BASE TABLE"), CatalogEntry::new("v", "VIEW")]
        );
        src.rollback().unwrap();
    }

    #[test]
    fn test_show_columns_marks_virtual_generated() {
        let mut src = source();
        src.begin_snapshot().unwrap();
        let rs = src.show_columns("t").unwrap();
        let extra = rs.column_index(&["Extra"]).unwrap();
        let key = rs.column_index(&["Key"]).unwrap();
        assert_eq!(rs.rows.len(), 3);
        assert_eq!(rs.rows[0][key].as_deref(), Some("PRI"));
        assert_eq!(rs.rows[2][extra].as_deref(), Some("VIRTUAL GENERATED"));
        src.rollback().unwrap();
    }

    struct Types(Vec<ColumnType>);

    impl RowVisitor for Types {
        fn start(&mut self, columns: &[ColumnType]) -> Result<()> {
            self.0 = columns.to_vec();
            Ok(())
        }

        fn row(&mut self, _row: &dyn SourceRow) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_row_cursor_columns_are_dynamic() {
        let mut src = source();
        src.begin_snapshot().unwrap();
        let mut types = Types(Vec::new());
        src.select_rows("t", &["id".to_string(), "name".to_string()], &mut types)
            .unwrap();
        assert_eq!(
            types.0,
            vec![
                ColumnType::new("id", ScanKind::Dynamic, ""),
                ColumnType::new("name", ScanKind::Dynamic, ""),
            ]
        );
        assert_eq!(src.dialect(), Dialect::Sqlite);
        src.rollback().unwrap();
    }

    #[test]
    fn test_show_create_unknown_object_is_empty() {
        let mut src = source();
        src.begin_snapshot().unwrap();
        let rs = src.show_create("missing").unwrap();
        assert!(rs.rows.is_empty());
        src.rollback().unwrap();
    }

    #[test]
    fn test_rollback_without_transaction_is_noop() {
        let mut src = source();
        src.rollback().unwrap();
        assert!(src.connection().is_autocommit());
    }

    #[test]
    fn test_use_database_rejects_unknown_schema() {
        let mut src = source();
        src.begin_snapshot().unwrap();
        let err = src.use_database("nope").unwrap_err();
        assert_eq!(err.kind(), DumpErrorKind::Connection);
        assert_eq!(src.schema(), "main");
        src.rollback().unwrap();
    }
}
