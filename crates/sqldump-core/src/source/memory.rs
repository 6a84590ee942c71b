//! Scripted in-memory source
//!
//! Answers the catalog questions from a fixed description of tables and
//! views and records every call it receives, so tests can assert on the
//! exact sequence of round-trips a dump makes. Failures can be injected at
//! any call.

use std::collections::HashMap;

use crate::dialect::Dialect;
use crate::errors::{DumpError, DumpErrorKind, Result};
use crate::source::{
    CatalogEntry, ColumnType, DumpSource, RawValue, ResultSet, RowVisitor, ScanKind, SourceRow,
};

/// Owned cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn as_raw(&self) -> RawValue<'_> {
        match self {
            Value::Null => RawValue::Null,
            Value::Integer(i) => RawValue::Integer(*i),
            Value::Float(f) => RawValue::Float(*f),
            Value::Text(s) => RawValue::Text(s.as_bytes()),
            Value::Blob(b) => RawValue::Blob(b),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A column of a scripted table
#[derive(Debug, Clone)]
pub struct MemoryColumn {
    pub name: String,
    pub scan_kind: ScanKind,
    pub type_name: String,
    /// `Extra` metadata, e.g. `VIRTUAL GENERATED`
    pub extra: Option<String>,
}

/// A scripted table or view
#[derive(Debug, Clone)]
pub struct MemoryObject {
    name: String,
    catalog_type: String,
    create_sql: Option<String>,
    create_response: Option<ResultSet>,
    columns_response: Option<ResultSet>,
    columns: Vec<MemoryColumn>,
    rows: Vec<Vec<Value>>,
}

impl MemoryObject {
    /// A base table with no columns yet
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            catalog_type: "BASE TABLE".to_string(),
            create_sql: None,
            create_response: None,
            columns_response: None,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// A view defined by `create_sql`
    pub fn view(name: impl Into<String>, create_sql: impl Into<String>) -> Self {
        Self {
            catalog_type: "VIEW".to_string(),
            create_sql: Some(create_sql.into()),
            ..Self::table(name)
        }
    }

    pub fn column(
        mut self,
        name: impl Into<String>,
        scan_kind: ScanKind,
        type_name: impl Into<String>,
    ) -> Self {
        self.columns.push(MemoryColumn {
            name: name.into(),
            scan_kind,
            type_name: type_name.into(),
            extra: None,
        });
        self
    }

    /// A computed, non-stored column
    pub fn virtual_column(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.columns.push(MemoryColumn {
            name: name.into(),
            scan_kind: ScanKind::Dynamic,
            type_name: type_name.into(),
            extra: Some("VIRTUAL GENERATED".to_string()),
        });
        self
    }

    /// Append a row holding one value per declared column, virtual ones included
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Override the catalog type flag
    pub fn catalog_type(mut self, table_type: impl Into<String>) -> Self {
        self.catalog_type = table_type.into();
        self
    }

    /// Override the create statement
    pub fn create_sql(mut self, sql: impl Into<String>) -> Self {
        self.create_sql = Some(sql.into());
        self
    }

    /// Replace the whole show-create response
    pub fn create_response(mut self, response: ResultSet) -> Self {
        self.create_response = Some(response);
        self
    }

    /// Replace the whole show-columns response
    pub fn columns_response(mut self, response: ResultSet) -> Self {
        self.columns_response = Some(response);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn render_create(&self) -> String {
        if let Some(sql) = &self.create_sql {
            return sql.clone();
        }
        let body: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("  `{}` {}", c.name, c.type_name))
            .collect();
        format!("CREATE TABLE `{}` (\n{}\n)", self.name, body.join(",\n"))
    }
}

/// A call received by [`MemorySource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    BeginSnapshot,
    UseDatabase(String),
    ServerVersion,
    ListObjects,
    ShowCreate(String),
    ShowColumns(String),
    SelectRows { object: String, columns: Vec<String> },
    LockTables(Vec<String>),
    UnlockTables,
    Rollback,
}

/// Where an injected failure fires
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    BeginSnapshot,
    UseDatabase,
    ServerVersion,
    ListObjects,
    ShowCreate(String),
    ShowColumns(String),
    /// Fail the cursor after this many rows of `object` were delivered
    SelectRows { object: String, after_rows: usize },
    LockTables,
    Rollback,
}

/// In-memory [`DumpSource`]
#[derive(Debug, Default)]
pub struct MemorySource {
    server_version: Option<String>,
    databases: Vec<String>,
    objects: Vec<MemoryObject>,
    extra_catalog: Vec<CatalogEntry>,
    failures: HashMap<FailPoint, DumpError>,
    calls: Vec<SourceCall>,
    in_snapshot: bool,
    dialect: Dialect,
}

impl MemorySource {
    pub fn new(server_version: impl Into<String>) -> Self {
        Self {
            server_version: Some(server_version.into()),
            databases: vec!["main".to_string()],
            ..Default::default()
        }
    }

    pub fn with_object(mut self, object: MemoryObject) -> Self {
        self.objects.push(object);
        self
    }

    /// Add a database name accepted by `use_database`
    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.databases.push(name.into());
        self
    }

    /// Report NULL as the server version
    pub fn without_server_version(mut self) -> Self {
        self.server_version = None;
        self
    }

    /// Append a raw catalog row that has no scripted object behind it
    pub fn with_catalog_entry(mut self, entry: CatalogEntry) -> Self {
        self.extra_catalog.push(entry);
        self
    }

    /// Write dumps of this source in `dialect` instead of MySQL
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn fail_on(mut self, point: FailPoint, err: DumpError) -> Self {
        self.failures.insert(point, err);
        self
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> &[SourceCall] {
        &self.calls
    }

    /// Whether a snapshot is currently open
    pub fn in_snapshot(&self) -> bool {
        self.in_snapshot
    }

    fn injected(&self, point: &FailPoint) -> Result<()> {
        match self.failures.get(point) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn require_snapshot(&self, op: &str) -> Result<()> {
        if self.in_snapshot {
            Ok(())
        } else {
            Err(DumpError::new(DumpErrorKind::InvalidState)
                .with_op(op.to_string())
                .with_message("no snapshot open"))
        }
    }

    fn find(&self, op: &str, name: &str) -> Result<&MemoryObject> {
        self.objects.iter().find(|o| o.name == name).ok_or_else(|| {
            DumpError::new(DumpErrorKind::Query)
                .with_op(op.to_string())
                .with_object(name)
                .with_message("object does not exist")
        })
    }
}

struct MemoryRow<'a> {
    values: &'a [Value],
    projection: &'a [usize],
}

impl SourceRow for MemoryRow<'_> {
    fn len(&self) -> usize {
        self.projection.len()
    }

    fn value(&self, index: usize) -> Result<RawValue<'_>> {
        self.projection
            .get(index)
            .and_then(|&i| self.values.get(i))
            .map(Value::as_raw)
            .ok_or_else(|| {
                DumpError::new(DumpErrorKind::Scan)
                    .with_op("memory_row")
                    .with_message(format!("no value at index {}", index))
            })
    }
}

impl DumpSource for MemorySource {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn begin_snapshot(&mut self) -> Result<()> {
        self.calls.push(SourceCall::BeginSnapshot);
        self.injected(&FailPoint::BeginSnapshot)?;
        if self.in_snapshot {
            return Err(DumpError::new(DumpErrorKind::Connection)
                .with_op("begin_snapshot")
                .with_message("snapshot already open"));
        }
        self.in_snapshot = true;
        Ok(())
    }

    fn use_database(&mut self, name: &str) -> Result<()> {
        self.calls.push(SourceCall::UseDatabase(name.to_string()));
        self.require_snapshot("use_database")?;
        self.injected(&FailPoint::UseDatabase)?;
        if !self.databases.iter().any(|d| d == name) {
            return Err(DumpError::new(DumpErrorKind::Connection)
                .with_op("use_database")
                .with_message(format!("unknown database '{}'", name)));
        }
        Ok(())
    }

    fn server_version(&mut self) -> Result<Option<String>> {
        self.calls.push(SourceCall::ServerVersion);
        self.require_snapshot("server_version")?;
        self.injected(&FailPoint::ServerVersion)?;
        Ok(self.server_version.clone())
    }

    fn list_objects(&mut self) -> Result<Vec<CatalogEntry>> {
        self.calls.push(SourceCall::ListObjects);
        self.require_snapshot("list_objects")?;
        self.injected(&FailPoint::ListObjects)?;
        let mut entries: Vec<CatalogEntry> = self
            .objects
            .iter()
            .map(|o| CatalogEntry::new(o.name.clone(), o.catalog_type.clone()))
            .collect();
        entries.extend(self.extra_catalog.iter().cloned());
        Ok(entries)
    }

    fn show_create(&mut self, object: &str) -> Result<ResultSet> {
        self.calls.push(SourceCall::ShowCreate(object.to_string()));
        self.require_snapshot("show_create")?;
        self.injected(&FailPoint::ShowCreate(object.to_string()))?;
        let found = self.find("show_create", object)?;
        if let Some(response) = &found.create_response {
            return Ok(response.clone());
        }
        let mut rs = ResultSet::new(vec!["Table".into(), "Create Table".into()]);
        rs.push_row(vec![Some(found.name.clone()), Some(found.render_create())]);
        Ok(rs)
    }

    fn show_columns(&mut self, object: &str) -> Result<ResultSet> {
        self.calls.push(SourceCall::ShowColumns(object.to_string()));
        self.require_snapshot("show_columns")?;
        self.injected(&FailPoint::ShowColumns(object.to_string()))?;
        let found = self.find("show_columns", object)?;
        if let Some(response) = &found.columns_response {
            return Ok(response.clone());
        }
        let mut rs = ResultSet::new(
            ["Field", "Type", "Null", "Key", "Default", "Extra"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        for col in &found.columns {
            rs.push_row(vec![
                Some(col.name.clone()),
                Some(col.type_name.clone()),
                Some("YES".to_string()),
                Some(String::new()),
                None,
                Some(col.extra.clone().unwrap_or_default()),
            ]);
        }
        Ok(rs)
    }

    fn select_rows(
        &mut self,
        object: &str,
        columns: &[String],
        visitor: &mut dyn RowVisitor,
    ) -> Result<()> {
        self.calls.push(SourceCall::SelectRows {
            object: object.to_string(),
            columns: columns.to_vec(),
        });
        self.require_snapshot("select_rows")?;
        let found = self.find("select_rows", object)?;

        let mut projection = Vec::with_capacity(columns.len());
        let mut types = Vec::with_capacity(columns.len());
        for name in columns {
            let index = found
                .columns
                .iter()
                .position(|c| &c.name == name)
                .ok_or_else(|| {
                    DumpError::new(DumpErrorKind::Query)
                        .with_op("select_rows")
                        .with_object(object)
                        .with_column(name.clone())
                        .with_message("unknown column")
                })?;
            let col = &found.columns[index];
            projection.push(index);
            types.push(ColumnType::new(
                col.name.clone(),
                col.scan_kind,
                col.type_name.clone(),
            ));
        }

        let fail_after = self.failures.iter().find_map(|(point, err)| match point {
            FailPoint::SelectRows { object: o, after_rows } if o == object => {
                Some((*after_rows, err.clone()))
            }
            _ => None,
        });

        visitor.start(&types)?;
        for (delivered, values) in found.rows.iter().enumerate() {
            if let Some((after_rows, err)) = &fail_after {
                if delivered == *after_rows {
                    return Err(err.clone());
                }
            }
            visitor.row(&MemoryRow {
                values,
                projection: &projection,
            })?;
        }
        if let Some((after_rows, err)) = fail_after {
            if after_rows >= found.rows.len() {
                return Err(err);
            }
        }
        Ok(())
    }

    fn lock_tables(&mut self, objects: &[String]) -> Result<()> {
        self.calls.push(SourceCall::LockTables(objects.to_vec()));
        self.injected(&FailPoint::LockTables)
    }

    fn unlock_tables(&mut self) -> Result<()> {
        self.calls.push(SourceCall::UnlockTables);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.calls.push(SourceCall::Rollback);
        self.in_snapshot = false;
        self.injected(&FailPoint::Rollback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collect {
        types: Vec<ColumnType>,
        rows: Vec<Vec<String>>,
    }

    impl RowVisitor for Collect {
        fn start(&mut self, columns: &[ColumnType]) -> Result<()> {
            self.types = columns.to_vec();
            Ok(())
        }

        fn row(&mut self, row: &dyn SourceRow) -> Result<()> {
            let mut out = Vec::new();
            for i in 0..row.len() {
                out.push(row.value(i)?.type_name().to_string());
            }
            self.rows.push(out);
            Ok(())
        }
    }

    fn source() -> MemorySource {
        MemorySource::new("8.0.36").with_object(
            MemoryObject::table("t")
                .column("a", ScanKind::Integer, "INT")
                .virtual_column("v", "INT")
                .column("b", ScanKind::String, "VARCHAR(10)")
                .row(vec![1.into(), Value::Null, "x".into()]),
        )
    }

    #[test]
    fn test_select_projects_requested_columns() {
        let mut src = source();
        src.begin_snapshot().unwrap();
        let mut collect = Collect {
            types: Vec::new(),
            rows: Vec::new(),
        };
        src.select_rows("t", &["b".into(), "a".into()], &mut collect)
            .unwrap();

        assert_eq!(collect.types.len(), 2);
        assert_eq!(collect.types[0].database_type_name, "VARCHAR(10)");
        assert_eq!(collect.rows, vec![vec!["text".to_string(), "integer".to_string()]]);
    }

    #[test]
    fn test_queries_require_snapshot() {
        let mut src = source();
        let err = src.list_objects().unwrap_err();
        assert_eq!(err.kind(), DumpErrorKind::InvalidState);
    }

    #[test]
    fn test_show_columns_reports_extra() {
        let mut src = source();
        src.begin_snapshot().unwrap();
        let rs = src.show_columns("t").unwrap();
        let extra = rs.column_index(&["Extra"]).unwrap();
        assert_eq!(rs.rows[1][extra].as_deref(), Some("VIRTUAL GENERATED"));
    }
}
