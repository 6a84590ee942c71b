//! Schema object descriptor

use crate::errors::{invalid_state, DumpError, Result};

/// Whether a schema object is a base table or a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    /// Classify a catalog type flag (`BASE TABLE`, `VIEW`, `table`, `view`, ...)
    pub fn from_catalog_type(table_type: &str) -> Self {
        if table_type.eq_ignore_ascii_case("VIEW") {
            ObjectKind::View
        } else {
            ObjectKind::Table
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
        }
    }
}

/// One table or view being dumped
///
/// Created from the catalog listing. The kind is provisional until the
/// creation statement has been fetched; the column list is filled in once,
/// when the object's rows are first streamed. After any step on the object
/// fails, the first error is kept and later work on it short-circuits.
#[derive(Debug, Clone)]
pub struct SchemaObject {
    name: String,
    kind: ObjectKind,
    columns: Option<Vec<String>>,
    error: Option<DumpError>,
}

impl SchemaObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            columns: None,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_view(&self) -> bool {
        self.kind == ObjectKind::View
    }

    pub(crate) fn set_kind(&mut self, kind: ObjectKind) {
        self.kind = kind;
    }

    /// Non-virtual column names, once discovered
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Record the non-virtual column list
    ///
    /// # Errors
    ///
    /// - `InvalidState`: the column list was already initialized
    pub fn init_columns(&mut self, columns: Vec<String>) -> Result<()> {
        if self.columns.is_some() {
            return Err(invalid_state("init_columns", "can't init twice").with_object(&self.name));
        }
        self.columns = Some(columns);
        Ok(())
    }

    /// Record a terminal error; only the first one is kept
    pub fn fail(&mut self, err: DumpError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn error(&self) -> Option<&DumpError> {
        self.error.as_ref()
    }

    /// Return the stored terminal error, if any
    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
