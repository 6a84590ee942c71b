//! Dump composition
//!
//! [`Dumper`] drives one dump end to end:
//!
//! 1. open the read-only snapshot (and select a database if asked to)
//! 2. write the header with the server version
//! 3. list objects, optionally read-lock all of them
//! 4. per object: fetch its create statement, write its block and, for
//!    tables, stream its rows as INSERT statements
//! 5. write the footer with the completion time
//!
//! The snapshot is rolled back on every path. Output already written is not
//! retracted when a later step fails, so a failed dump's output must be
//! discarded by the caller.

use std::io::Write;
use std::time::Instant;

use chrono::Utc;
use sqldump_core_types::DumpId;

use crate::batch::stream_statements;
use crate::dialect::Dialect;
use crate::errors::{render_error, DumpError, Result};
use crate::introspect;
use crate::model::{DumpConfig, DumpMetadata, DumpSummary, SchemaObject};
use crate::render;
use crate::snapshot::SnapshotTransaction;
use crate::source::DumpSource;
use crate::stream::RowStream;
use crate::{log_op_end, log_op_error, log_op_start};

/// Writes a SQL dump of a database to an output sink
#[derive(Debug, Clone, Default)]
pub struct Dumper {
    config: DumpConfig,
}

impl Dumper {
    pub fn new(config: DumpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    /// Dump the database the source is connected to
    ///
    /// # Errors
    ///
    /// The first error hit by any step. The snapshot has been rolled back
    /// by the time this returns.
    pub fn dump(&self, source: &mut dyn DumpSource, out: &mut dyn Write) -> Result<DumpSummary> {
        self.run(source, out, None)
    }

    /// Select `database` inside the snapshot, then dump it
    pub fn dump_database(
        &self,
        source: &mut dyn DumpSource,
        out: &mut dyn Write,
        database: &str,
    ) -> Result<DumpSummary> {
        self.run(source, out, Some(database))
    }

    fn run(
        &self,
        source: &mut dyn DumpSource,
        out: &mut dyn Write,
        database: Option<&str>,
    ) -> Result<DumpSummary> {
        let dump_id = DumpId::new();
        log_op_start!(
            "dump",
            dump_id = %dump_id,
            database = database.unwrap_or_default()
        );
        let start = Instant::now();

        let summary = self.run_impl(source, out, database).map_err(|e| {
            log_op_error!(
                "dump",
                &e,
                duration_ms = start.elapsed().as_millis() as u64,
                dump_id = %dump_id,
                database = database.unwrap_or_default()
            );
            e
        })?;

        log_op_end!(
            "dump",
            duration_ms = start.elapsed().as_millis() as u64,
            dump_id = %dump_id,
            database = database.unwrap_or_default(),
            object_count = summary.objects,
            row_count = summary.rows,
            statement_count = summary.statements
        );
        Ok(summary)
    }

    fn run_impl(
        &self,
        source: &mut dyn DumpSource,
        out: &mut dyn Write,
        database: Option<&str>,
    ) -> Result<DumpSummary> {
        self.config.validate()?;
        let max_size = self.config.effective_max_allowed_packet();

        let mut snapshot = SnapshotTransaction::new(source);
        snapshot.open()?;
        if let Some(name) = database {
            snapshot.select_database(name)?;
        }

        let dialect = snapshot.source().dialect();
        let mut meta = DumpMetadata::new(introspect::server_version(snapshot.source())?);
        render::write_header(out, dialect, &meta)?;

        let mut objects = introspect::list_objects(snapshot.source(), &self.config)?;
        if self.config.lock_tables && !objects.is_empty() {
            let names: Vec<String> = objects.iter().map(|o| o.name().to_string()).collect();
            snapshot.lock_tables(&names)?;
        }

        let mut summary = DumpSummary::default();
        for object in &mut objects {
            dump_object(snapshot.source(), out, dialect, object, max_size, &mut summary)?;
        }

        meta.mark_complete(Utc::now());
        render::write_footer(out, dialect, &meta)?;
        out.flush().map_err(|err| render_error("flush", err))?;

        snapshot.close()?;
        Ok(summary)
    }
}

fn dump_object(
    source: &mut dyn DumpSource,
    out: &mut dyn Write,
    dialect: Dialect,
    object: &mut SchemaObject,
    max_size: usize,
    summary: &mut DumpSummary,
) -> Result<()> {
    object.check()?;

    // The statement decides whether this is a view, so fetch it first
    let create_sql =
        introspect::fetch_create_statement(source, object).map_err(|err| record(object, err))?;

    if object.is_view() {
        render::write_view(out, dialect, object.name(), &create_sql)
            .map_err(|err| record(object, err))?;
        summary.objects += 1;
        summary.views += 1;
        tracing::debug!(object = %object.name(), object_kind = "view", "Dumped object");
        return Ok(());
    }

    let name = object.name().to_string();
    render::write_table_structure(out, dialect, &name, &create_sql)
        .map_err(|err| record(object, err))?;
    render::write_data_open(out, dialect, &name).map_err(|err| record(object, err))?;

    let stream = RowStream::initialize(source, object)?;
    let stats = stream_statements(source, stream, max_size, |statement| {
        render::write_statement(out, statement)
    })
    .map_err(|err| record(object, err))?;

    render::write_data_close(out, dialect, &name).map_err(|err| record(object, err))?;

    summary.objects += 1;
    summary.tables += 1;
    summary.rows += stats.rows;
    summary.statements += stats.statements;
    tracing::debug!(
        object = %name,
        object_kind = "table",
        row_count = stats.rows,
        statement_count = stats.statements,
        "Dumped object"
    );
    object.check()
}

fn record(object: &mut SchemaObject, err: DumpError) -> DumpError {
    object.fail(err.clone());
    err
}
