//! Dump command

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use sqldump_core::{DumpConfig, DumpSummary, Dumper};
use sqldump_store::SqliteSource;
use tempfile::NamedTempFile;

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// SQLite database file to dump
    #[arg(long)]
    pub db: PathBuf,

    /// Attached schema to dump instead of `main`
    #[arg(long)]
    pub database: Option<String>,

    /// Table or view to leave out (repeatable)
    #[arg(long = "ignore-table", value_name = "NAME")]
    pub ignore_tables: Vec<String>,

    /// Upper bound in bytes for one INSERT statement
    #[arg(long, value_name = "BYTES")]
    pub max_allowed_packet: Option<usize>,

    /// Read-lock every dumped object for the duration of the dump
    #[arg(long)]
    pub lock_tables: bool,

    /// YAML file with dump options; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the dump here instead of stdout
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

pub fn execute(args: DumpArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    let mut source = SqliteSource::open(&args.db)?;
    let dumper = Dumper::new(config);

    let summary = match &args.out {
        Some(path) => dump_to_file(&dumper, &mut source, args.database.as_deref(), path)?,
        None => {
            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            run(&dumper, &mut source, args.database.as_deref(), &mut out)?
        }
    };

    tracing::info!(
        objects = summary.objects,
        rows = summary.rows,
        statements = summary.statements,
        "Dump finished"
    );
    Ok(())
}

/// Config file values first, then command-line flags on top
fn build_config(args: &DumpArgs) -> Result<DumpConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => DumpConfig::default(),
    };

    if !args.ignore_tables.is_empty() {
        config.ignore_tables = args.ignore_tables.clone();
    }
    if args.max_allowed_packet.is_some() {
        config.max_allowed_packet = args.max_allowed_packet;
    }
    if args.lock_tables {
        config.lock_tables = true;
    }
    Ok(config)
}

fn load_config(path: &Path) -> Result<DumpConfig, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    let config = serde_yaml::from_str(&text)
        .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

/// Dump into a temporary file next to `path`, then rename it over `path`
///
/// On failure the temporary file is removed and whatever was at `path`
/// before is left untouched.
fn dump_to_file(
    dumper: &Dumper,
    source: &mut SqliteSource,
    database: Option<&str>,
    path: &Path,
) -> Result<DumpSummary, Box<dyn std::error::Error>> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| format!("cannot create temporary file in {}: {}", dir.display(), e))?;

    let summary = {
        let mut out = BufWriter::new(tmp.as_file_mut());
        let summary = run(dumper, source, database, &mut out)?;
        out.flush()?;
        summary
    };
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| format!("cannot write {}: {}", path.display(), e.error))?;
    Ok(summary)
}

fn run(
    dumper: &Dumper,
    source: &mut SqliteSource,
    database: Option<&str>,
    out: &mut dyn Write,
) -> Result<DumpSummary, Box<dyn std::error::Error>> {
    let summary = match database {
        Some(name) => dumper.dump_database(source, out, name)?,
        None => dumper.dump(source, out)?,
    };
    Ok(summary)
}
