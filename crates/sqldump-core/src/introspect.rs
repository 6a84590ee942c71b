//! Schema introspection
//!
//! Lists the dumpable objects, fetches their creation statements and reads
//! the server version. All queries run inside the caller's snapshot.

use crate::errors::{malformed_metadata, DumpError, DumpErrorKind, Result};
use crate::model::{DumpConfig, ObjectKind, SchemaObject};
use crate::source::DumpSource;

/// Server version string; NULL becomes the empty string
pub fn server_version(source: &mut dyn DumpSource) -> Result<String> {
    Ok(source.server_version()?.unwrap_or_default())
}

/// Every table and view not in the ignore set, in catalog order
///
/// Catalog rows without a name are skipped.
pub fn list_objects(source: &mut dyn DumpSource, config: &DumpConfig) -> Result<Vec<SchemaObject>> {
    let entries = source.list_objects()?;
    let mut objects = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(name) = entry.name else {
            continue;
        };
        if config.is_ignored(&name) {
            tracing::debug!(object = %name, "Skipping ignored object");
            continue;
        }
        let kind = ObjectKind::from_catalog_type(entry.table_type.as_deref().unwrap_or_default());
        objects.push(SchemaObject::new(name, kind));
    }
    Ok(objects)
}

/// Fetch the creation statement for `object`
///
/// The object's kind is re-derived from the statement text and overwrites
/// the kind reported by the catalog listing.
///
/// # Errors
///
/// - `MalformedMetadata`: the response has fewer than two columns
/// - `SchemaMismatch`: the response is empty or names a different object
pub fn fetch_create_statement(
    source: &mut dyn DumpSource,
    object: &mut SchemaObject,
) -> Result<String> {
    let response = source
        .show_create(object.name())
        .map_err(|err| err.with_object(object.name()))?;

    if response.columns.len() < 2 {
        return Err(malformed_metadata(
            "fetch_create_statement",
            object.name(),
            "database column information is malformed",
        ));
    }

    let Some(row) = response.rows.first() else {
        return Err(schema_mismatch(object.name(), "no create statement returned"));
    };
    let returned_name = row.first().cloned().flatten().unwrap_or_default();
    if returned_name != object.name() {
        return Err(schema_mismatch(
            object.name(),
            &format!(
                "returned object '{}' is not the same as requested object",
                returned_name
            ),
        ));
    }

    let create_sql = row.get(1).cloned().flatten().unwrap_or_default();
    let kind = kind_from_create_statement(&create_sql);
    if kind != object.kind() {
        tracing::warn!(
            object = %object.name(),
            catalog_kind = object.kind().as_str(),
            statement_kind = kind.as_str(),
            "Catalog and create statement disagree on object kind; using the statement"
        );
    }
    object.set_kind(kind);
    Ok(create_sql)
}

/// Classify a creation statement as a view or a table
///
/// Only the leading keywords are inspected, so a table that merely has a
/// column called `view` stays a table.
pub fn kind_from_create_statement(sql: &str) -> ObjectKind {
    let mut tokens = sql.split_whitespace().map(str::to_ascii_uppercase);
    if tokens.next().as_deref() != Some("CREATE") {
        return ObjectKind::Table;
    }

    let mut skip_next = false;
    for token in tokens {
        if skip_next {
            skip_next = false;
            continue;
        }
        match token.as_str() {
            "VIEW" => return ObjectKind::View,
            "OR" | "REPLACE" | "TEMP" | "TEMPORARY" | "SQL" => {}
            "SECURITY" => skip_next = true,
            t if t.starts_with("ALGORITHM=") || t.starts_with("DEFINER=") => {}
            _ => return ObjectKind::Table,
        }
    }
    ObjectKind::Table
}

fn schema_mismatch(object: &str, reason: &str) -> DumpError {
    DumpError::new(DumpErrorKind::SchemaMismatch)
        .with_op("fetch_create_statement")
        .with_object(object)
        .with_message(reason.to_string())
}
