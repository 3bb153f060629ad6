//! Microsoft SQL Server SQL dialect (Strategy pattern).
//!
//! Used when the target is a second SQL Server instance or database.

use crate::core::identifier::{escape_single_quotes, quote_bracket};
use crate::core::traits::{contains_any, Dialect};

use super::DialectKind;

/// SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new SQL Server dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Mssql
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_bracket(name)
    }

    fn qualify(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", quote_bracket(schema), quote_bracket(table))
    }

    fn string_literal(&self, value: &str) -> String {
        format!("N'{}'", escape_single_quotes(value))
    }

    fn hex_literal(&self, hex_digits: &str) -> String {
        format!("0x{}", hex_digits)
    }

    fn identity_scope(&self, table_ref: &str) -> Option<(String, String)> {
        Some((
            format!("SET IDENTITY_INSERT {} ON;", table_ref),
            format!("SET IDENTITY_INSERT {} OFF;", table_ref),
        ))
    }

    // Table value constructor limit.
    fn max_insert_rows(&self) -> Option<usize> {
        Some(1000)
    }

    fn is_conflict_error(&self, message: &str) -> bool {
        contains_any(
            message,
            &["duplicate key", "violation of primary key", "constraint"],
        )
    }

    fn autoincrement_key_definition(&self, quoted_name: &str, target_type: &str) -> String {
        format!(
            "{} {} IDENTITY(1,1) NOT NULL PRIMARY KEY",
            quoted_name, target_type
        )
    }

    fn identity_column_suffix(&self) -> Option<&'static str> {
        Some("IDENTITY(1,1)")
    }

    fn create_namespace(&self, schema: &str) -> Option<String> {
        Some(format!(
            "IF NOT EXISTS (SELECT 1 FROM sys.schemas WHERE name = N'{}') EXEC('CREATE SCHEMA {}');",
            escape_single_quotes(schema),
            escape_single_quotes(&quote_bracket(schema))
        ))
    }

    fn drop_table(&self, table_ref: &str) -> String {
        format!(
            "IF OBJECT_ID(N'{}', N'U') IS NOT NULL DROP TABLE {};",
            escape_single_quotes(table_ref),
            table_ref
        )
    }

    fn table_exists_query(&self, schema: &str, table: &str) -> String {
        format!(
            "SET NOCOUNT ON; SELECT COUNT(*) FROM sys.objects WHERE object_id = OBJECT_ID(N'{}') AND type = N'U';",
            escape_single_quotes(&self.qualify(schema, table))
        )
    }

    fn count_query(&self, table_ref: &str) -> String {
        format!("SET NOCOUNT ON; SELECT COUNT(*) FROM {};", table_ref)
    }

    fn clear_statements(&self, table_ref: &str) -> Vec<String> {
        vec![
            format!("DELETE FROM {};", table_ref),
            format!("TRUNCATE TABLE {};", table_ref),
        ]
    }
}
