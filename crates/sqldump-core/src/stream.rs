//! Row streaming for one table
//!
//! A `RowStream` owns the streaming state of a single object: the filtered
//! column list, one decode slot per cursor column and the encoded tuple of
//! the current row. The object descriptor itself only records the column
//! list and any terminal error.

use crate::decode::{allocate_slots, decode_row, DecodeSlot};
use crate::dialect::Dialect;
use crate::encode::encode_row;
use crate::errors::{invalid_state, malformed_metadata, Result};
use crate::model::SchemaObject;
use crate::source::{ColumnType, DumpSource, ResultSet, RowVisitor, SourceRow};

/// Forward-only cursor state over one object's rows
#[derive(Debug)]
pub struct RowStream {
    name: String,
    dialect: Dialect,
    columns: Vec<String>,
    types: Vec<ColumnType>,
    slots: Option<Vec<DecodeSlot>>,
    tuple: Vec<u8>,
    rows: u64,
}

impl RowStream {
    /// Discover `object`'s insertable columns and prepare a stream over them
    ///
    /// Any failure is also recorded on the object.
    ///
    /// # Errors
    ///
    /// - `MalformedMetadata`: the column metadata lacks a field or extra column
    /// - `InvalidState`: the object's columns were already initialized
    pub fn initialize(source: &mut dyn DumpSource, object: &mut SchemaObject) -> Result<Self> {
        match Self::discover(source, object) {
            Ok(stream) => Ok(stream),
            Err(err) => {
                object.fail(err.clone());
                Err(err)
            }
        }
    }

    fn discover(source: &mut dyn DumpSource, object: &mut SchemaObject) -> Result<Self> {
        let metadata = source
            .show_columns(object.name())
            .map_err(|err| err.with_object(object.name()))?;
        let dialect = source.dialect();
        let columns = non_virtual_columns(object.name(), dialect, &metadata)?;
        object.init_columns(columns.clone())?;
        Ok(Self {
            name: object.name().to_string(),
            dialect,
            columns,
            types: Vec::new(),
            slots: None,
            tuple: Vec::new(),
            rows: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dialect the tuples are encoded in
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True when every column is skipped and there is nothing to select
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Rows decoded so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Accept the cursor's column types and allocate the decode slots
    pub fn open(&mut self, types: &[ColumnType]) -> Result<()> {
        if self.slots.is_some() {
            return Err(invalid_state("open_stream", "can't init twice").with_object(&self.name));
        }
        if types.len() != self.columns.len() {
            return Err(malformed_metadata(
                "open_stream",
                &self.name,
                &format!(
                    "cursor returned {} columns, expected {}",
                    types.len(),
                    self.columns.len()
                ),
            ));
        }
        self.types = types.to_vec();
        self.slots = Some(allocate_slots(types));
        Ok(())
    }

    /// Decode `row` into the slots and encode it as the current tuple
    pub fn advance(&mut self, row: &dyn SourceRow) -> Result<()> {
        let Some(slots) = self.slots.as_mut() else {
            return Err(invalid_state("advance", "stream not opened").with_object(&self.name));
        };
        if row.len() != slots.len() {
            return Err(malformed_metadata(
                "advance",
                &self.name,
                &format!("row has {} values, expected {}", row.len(), slots.len()),
            ));
        }
        decode_row(slots, &self.types, |index| row.value(index))
            .map_err(|err| err.with_object(&self.name))?;
        encode_row(self.dialect, slots, &mut self.tuple);
        self.rows += 1;
        Ok(())
    }

    /// The encoded tuple of the last row passed to `advance`
    pub fn encode_current_row(&self) -> &[u8] {
        &self.tuple
    }

    /// Select the rows and hand each encoded tuple to `on_tuple`
    ///
    /// No query is issued for an object without columns. Returns the number
    /// of rows streamed. The cursor is released when this returns.
    pub fn drain<F>(mut self, source: &mut dyn DumpSource, on_tuple: F) -> Result<u64>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        if self.is_empty() {
            return Ok(0);
        }
        let name = self.name.clone();
        let columns = self.columns.clone();
        {
            let mut visitor = StreamVisitor {
                stream: &mut self,
                on_tuple,
            };
            source
                .select_rows(&name, &columns, &mut visitor)
                .map_err(|err| match err.object() {
                    Some(_) => err,
                    None => err.with_object(name.clone()),
                })?;
        }
        Ok(self.rows)
    }
}

struct StreamVisitor<'a, F> {
    stream: &'a mut RowStream,
    on_tuple: F,
}

impl<F> RowVisitor for StreamVisitor<'_, F>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    fn start(&mut self, columns: &[ColumnType]) -> Result<()> {
        self.stream.open(columns)
    }

    fn row(&mut self, row: &dyn SourceRow) -> Result<()> {
        self.stream.advance(row)?;
        (self.on_tuple)(self.stream.encode_current_row())
    }
}

/// Column names from a show-columns response, minus the columns `dialect`
/// can't insert into
///
/// A NULL `Extra` keeps the column.
pub fn non_virtual_columns(
    object: &str,
    dialect: Dialect,
    metadata: &ResultSet,
) -> Result<Vec<String>> {
    let field = metadata.column_index(&["Field", "field"]);
    let extra = metadata.column_index(&["Extra", "extra"]);
    let (Some(field), Some(extra)) = (field, extra) else {
        return Err(malformed_metadata(
            "non_virtual_columns",
            object,
            "database column information is malformed",
        ));
    };

    let mut columns = Vec::with_capacity(metadata.rows.len());
    for row in &metadata.rows {
        let skipped = row
            .get(extra)
            .and_then(|v| v.as_deref())
            .is_some_and(|v| dialect.skips_column(v));
        if skipped {
            continue;
        }
        let name = row.get(field).cloned().flatten().unwrap_or_default();
        columns.push(name);
    }
    Ok(columns)
}
