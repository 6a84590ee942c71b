//! Target SQL dialect of a dump
//!
//! The dialect comes from the source: a dump replays into the same kind of
//! database it was taken from. It decides identifier quoting, literal
//! syntax, the statement templates and which columns are insertable.

/// SQL flavour a dump is written in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// mysqldump layout, backslash-escaped literals, `_binary` byte strings
    #[default]
    MySql,
    /// One transaction, `''`-doubled literals, `X'..'` blobs
    Sqlite,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Whether a column with this show-columns `Extra` value stays out of
    /// the SELECT and INSERT column lists
    ///
    /// SQLite refuses explicit values for any generated column, stored or
    /// not.
    pub fn skips_column(self, extra: &str) -> bool {
        match self {
            Dialect::MySql => extra.contains("VIRTUAL"),
            Dialect::Sqlite => extra.contains("VIRTUAL") || extra.contains("GENERATED"),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mysql() {
        assert_eq!(Dialect::default(), Dialect::MySql);
        assert_eq!(Dialect::Sqlite.to_string(), "sqlite");
    }

    #[test]
    fn test_stored_generated_columns_per_dialect() {
        assert!(!Dialect::MySql.skips_column("STORED GENERATED"));
        assert!(Dialect::MySql.skips_column("VIRTUAL GENERATED"));
        assert!(Dialect::Sqlite.skips_column("STORED GENERATED"));
        assert!(Dialect::Sqlite.skips_column("VIRTUAL HIDDEN"));
        assert!(!Dialect::Sqlite.skips_column(""));
        assert!(!Dialect::MySql.skips_column("auto_increment"));
    }
}
