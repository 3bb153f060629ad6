//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! MySQL has no schemas inside a database, so `Schema.Table` is flattened to
//! `Schema_Table` and qualified with the target database.

use crate::core::identifier::{escape_single_quotes, flatten, quote_backtick};
use crate::core::traits::{contains_any, Dialect};

use super::DialectKind;

/// InnoDB index entry limit for COMPACT row formats.
const INDEX_KEY_BUDGET: usize = 767;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+ using `utf8mb4`.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect {
    database: Option<String>,
}

impl MysqlDialect {
    /// Create a new MySQL dialect instance that leaves tables unqualified.
    pub fn new() -> Self {
        Self { database: None }
    }

    /// Create a dialect that qualifies every table with `database`.
    pub fn with_database(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
        }
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn qualify(&self, schema: &str, table: &str) -> String {
        let flat = quote_backtick(&flatten(schema, table));
        match &self.database {
            Some(db) => format!("{}.{}", quote_backtick(db), flat),
            None => flat,
        }
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn hex_literal(&self, hex_digits: &str) -> String {
        format!("UNHEX('{}')", hex_digits)
    }

    fn is_conflict_error(&self, message: &str) -> bool {
        contains_any(message, &["duplicate", "constraint"])
    }

    fn autoincrement_key_definition(&self, quoted_name: &str, target_type: &str) -> String {
        format!(
            "{} {} NOT NULL AUTO_INCREMENT PRIMARY KEY",
            quoted_name, target_type
        )
    }

    fn create_namespace(&self, _schema: &str) -> Option<String> {
        self.database.as_ref().map(|db| {
            format!(
                "CREATE DATABASE IF NOT EXISTS {} CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;",
                quote_backtick(db)
            )
        })
    }

    fn index_key_budget(&self) -> Option<usize> {
        Some(INDEX_KEY_BUDGET)
    }

    fn bytes_per_char(&self) -> usize {
        4
    }

    fn table_exists_query(&self, schema: &str, table: &str) -> String {
        let db = match &self.database {
            Some(db) => format!("'{}'", escape_single_quotes(db)),
            None => "DATABASE()".to_string(),
        };
        format!(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = {} AND TABLE_NAME = '{}';",
            db,
            escape_single_quotes(&flatten(schema, table))
        )
    }

    fn clear_statements(&self, table_ref: &str) -> Vec<String> {
        vec![
            format!("DELETE FROM {};", table_ref),
            format!("TRUNCATE TABLE {};", table_ref),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse a rendered literal back under MySQL's default escaping.
    fn unquote(literal: &str) -> String {
        let inner: Vec<char> = literal[1..literal.len() - 1].chars().collect();
        let mut out = String::new();
        let mut i = 0;
        while i < inner.len() {
            match inner[i] {
                '\\' => {
                    out.push(inner[i + 1]);
                    i += 2;
                }
                '\'' => {
                    out.push('\'');
                    i += 2;
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }

    #[test]
    fn test_quote_ident() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("name"), "`name`");
        assert_eq!(dialect.quote_ident("table`name"), "`table``name`");
    }

    #[test]
    fn test_qualify_flattens_schema() {
        assert_eq!(
            MysqlDialect::new().qualify("Production", "Product"),
            "`Production_Product`"
        );
        assert_eq!(
            MysqlDialect::with_database("inventorymanagement").qualify("Production", "Product"),
            "`inventorymanagement`.`Production_Product`"
        );
    }

    #[test]
    fn test_string_literal_round_trip() {
        let dialect = MysqlDialect::new();
        let original = r"it's a \ path";
        let literal = dialect.string_literal(original);
        assert_eq!(literal, r"'it''s a \\ path'");
        assert_eq!(unquote(&literal), original);
    }

    #[test]
    fn test_literals() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.hex_literal("0A1B"), "UNHEX('0A1B')");
        assert_eq!(dialect.bool_literal(true), "1");
        assert_eq!(dialect.bool_literal(false), "0");
        assert_eq!(dialect.conflict_clause(&["ID".into()]), "");
        assert!(dialect.identity_override_clause().is_none());
    }

    #[test]
    fn test_conflict_error_detection() {
        let dialect = MysqlDialect::new();
        assert!(dialect.is_conflict_error(
            "ERROR 1062 (23000) at line 1: Duplicate entry '1' for key 'PRIMARY'"
        ));
        assert!(dialect.is_conflict_error("Cannot add or update a child row: a foreign key constraint fails"));
        assert!(!dialect.is_conflict_error("ERROR 1146 (42S02): Table doesn't exist"));
    }

    #[test]
    fn test_namespace_and_exists() {
        let dialect = MysqlDialect::with_database("inv");
        assert_eq!(
            dialect.create_namespace("Production").unwrap(),
            "CREATE DATABASE IF NOT EXISTS `inv` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;"
        );
        assert!(MysqlDialect::new().create_namespace("Production").is_none());
        assert_eq!(
            dialect.table_exists_query("Production", "Product"),
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = 'inv' AND TABLE_NAME = 'Production_Product';"
        );
    }

    #[test]
    fn test_index_budget() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.index_key_budget(), Some(767));
        assert_eq!(dialect.bytes_per_char(), 4);
    }
}
