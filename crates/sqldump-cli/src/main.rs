//! sqldump CLI
//!
//! Writes a consistent SQL dump of a SQLite database

use clap::{Parser, ValueEnum};
use sqldump_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "sqldump")]
#[command(about = "sqldump - Consistent SQL dumps of SQLite databases", long_about = None)]
struct Cli {
    #[command(flatten)]
    dump: commands::dump::DumpArgs,

    /// Log output format (logs always go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

fn main() {
    let cli = Cli::parse();

    init(match cli.log_format {
        LogFormat::Pretty => Profile::Development,
        LogFormat::Json => Profile::Production,
    });

    if let Err(e) = commands::dump::execute(cli.dump) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
