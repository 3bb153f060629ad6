//! SQLite SQL dialect (Strategy pattern).

use crate::core::identifier::{escape_single_quotes, flatten, quote_double};
use crate::core::traits::{contains_any, Dialect};

use super::DialectKind;

/// SQLite dialect implementation.
///
/// A SQLite file has no schemas, so tables are flattened to `Schema_Table`.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn qualify(&self, schema: &str, table: &str) -> String {
        quote_double(&flatten(schema, table))
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", escape_single_quotes(value))
    }

    fn hex_literal(&self, hex_digits: &str) -> String {
        format!("X'{}'", hex_digits)
    }

    fn is_conflict_error(&self, message: &str) -> bool {
        contains_any(
            message,
            &["constraint failed", "unique constraint", "duplicate"],
        )
    }

    /// SQLite only allows AUTOINCREMENT on `INTEGER PRIMARY KEY`, so the
    /// mapped type is ignored.
    fn autoincrement_key_definition(&self, quoted_name: &str, _target_type: &str) -> String {
        format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quoted_name)
    }

    fn create_namespace(&self, _schema: &str) -> Option<String> {
        None
    }

    fn table_exists_query(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{}';",
            escape_single_quotes(&flatten(schema, table))
        )
    }
}
