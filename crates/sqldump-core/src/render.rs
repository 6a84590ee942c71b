//! Output templates
//!
//! MySQL output follows the mysqldump layout: a header that saves and
//! overrides session settings, one block per object, and a footer that
//! restores them. SQLite output keeps the same comment banners and wraps
//! every statement in a single transaction instead.

use std::io::Write;

use crate::dialect::Dialect;
use crate::encode::quote_identifier;
use crate::errors::{render_error, Result};
use crate::model::DumpMetadata;

fn io(op: &str, result: std::io::Result<()>) -> Result<()> {
    result.map_err(|err| render_error(op, err))
}

pub fn write_header(out: &mut dyn Write, dialect: Dialect, meta: &DumpMetadata) -> Result<()> {
    io(
        "write_header",
        write!(
            out,
            "-- sqldump {}\n\
             --\n\
             -- ------------------------------------------------------\n\
             -- Server version\t{}\n\
             \n",
            meta.dump_version, meta.server_version
        ),
    )?;
    let settings = match dialect {
        Dialect::MySql => {
            "/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;\n\
             /*!40101 SET @OLD_CHARACTER_SET_RESULTS=@@CHARACTER_SET_RESULTS */;\n\
             /*!40101 SET @OLD_COLLATION_CONNECTION=@@COLLATION_CONNECTION */;\n\
             \x20SET NAMES utf8mb4 ;\n\
             /*!40103 SET @OLD_TIME_ZONE=@@TIME_ZONE */;\n\
             /*!40103 SET TIME_ZONE='+00:00' */;\n\
             /*!40014 SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0 */;\n\
             /*!40014 SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0 */;\n\
             /*!40101 SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='NO_AUTO_VALUE_ON_ZERO' */;\n\
             /*!40111 SET @OLD_SQL_NOTES=@@SQL_NOTES, SQL_NOTES=0 */;\n"
        }
        // The whole replay is one transaction; constraints are checked
        // against the finished data, not table by table.
        Dialect::Sqlite => {
            "PRAGMA foreign_keys=OFF;\n\
             BEGIN TRANSACTION;\n"
        }
    };
    io("write_header", out.write_all(settings.as_bytes()))
}

pub fn write_footer(out: &mut dyn Write, dialect: Dialect, meta: &DumpMetadata) -> Result<()> {
    let settings = match dialect {
        Dialect::MySql => {
            "/*!40103 SET TIME_ZONE=@OLD_TIME_ZONE */;\n\
             \n\
             /*!40101 SET SQL_MODE=@OLD_SQL_MODE */;\n\
             /*!40014 SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS */;\n\
             /*!40014 SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS */;\n\
             /*!40101 SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT */;\n\
             /*!40101 SET CHARACTER_SET_RESULTS=@OLD_CHARACTER_SET_RESULTS */;\n\
             /*!40101 SET COLLATION_CONNECTION=@OLD_COLLATION_CONNECTION */;\n\
             /*!40111 SET SQL_NOTES=@OLD_SQL_NOTES */;\n"
        }
        Dialect::Sqlite => "COMMIT;\n",
    };
    io("write_footer", out.write_all(settings.as_bytes()))?;
    io(
        "write_footer",
        write!(
            out,
            "\n-- Dump completed on {}\n",
            meta.complete_time.as_deref().unwrap_or_default()
        ),
    )
}

/// Drop-and-recreate block for a view
pub fn write_view(
    out: &mut dyn Write,
    dialect: Dialect,
    name: &str,
    create_sql: &str,
) -> Result<()> {
    write_structure(out, dialect, "write_view", "View structure for view", "VIEW", name, create_sql)
}

/// Drop-and-recreate block for a table
pub fn write_table_structure(
    out: &mut dyn Write,
    dialect: Dialect,
    name: &str,
    create_sql: &str,
) -> Result<()> {
    write_structure(
        out,
        dialect,
        "write_table_structure",
        "Table structure for table",
        "TABLE",
        name,
        create_sql,
    )
}

fn write_structure(
    out: &mut dyn Write,
    dialect: Dialect,
    op: &str,
    title: &str,
    object_type: &str,
    name: &str,
    create_sql: &str,
) -> Result<()> {
    let name = quote_identifier(dialect, name);
    let written = match dialect {
        Dialect::MySql => write!(
            out,
            "\n\
             --\n\
             -- {title} {name}\n\
             --\n\
             \n\
             DROP {object_type} IF EXISTS {name};\n\
             /*!40101 SET @saved_cs_client     = @@character_set_client */;\n\
             \x20SET character_set_client = utf8mb4 ;\n\
             {create_sql};\n\
             /*!40101 SET character_set_client = @saved_cs_client */;\n"
        ),
        Dialect::Sqlite => write!(
            out,
            "\n\
             --\n\
             -- {title} {name}\n\
             --\n\
             \n\
             DROP {object_type} IF EXISTS {name};\n\
             {create_sql};\n"
        ),
    };
    io(op, written)
}

/// Opening of a table's data block, up to the first INSERT
pub fn write_data_open(out: &mut dyn Write, dialect: Dialect, name: &str) -> Result<()> {
    let name = quote_identifier(dialect, name);
    io(
        "write_data_open",
        write!(
            out,
            "\n\
             --\n\
             -- Dumping data for table {name}\n\
             --\n\
             \n"
        ),
    )?;
    match dialect {
        Dialect::MySql => io(
            "write_data_open",
            write!(
                out,
                "LOCK TABLES {name} WRITE;\n\
                 /*!40000 ALTER TABLE {name} DISABLE KEYS */;\n"
            ),
        ),
        Dialect::Sqlite => Ok(()),
    }
}

/// One INSERT statement on its own line
pub fn write_statement(out: &mut dyn Write, statement: &[u8]) -> Result<()> {
    io("write_statement", out.write_all(statement))?;
    io("write_statement", out.write_all(b"\n"))
}

pub fn write_data_close(out: &mut dyn Write, dialect: Dialect, name: &str) -> Result<()> {
    match dialect {
        Dialect::MySql => {
            let name = quote_identifier(dialect, name);
            io(
                "write_data_close",
                write!(
                    out,
                    "/*!40000 ALTER TABLE {name} ENABLE KEYS */;\n\
                     UNLOCK TABLES;\n"
                ),
            )
        }
        Dialect::Sqlite => Ok(()),
    }
}
