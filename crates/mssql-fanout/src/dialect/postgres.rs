//! PostgreSQL SQL dialect (Strategy pattern).

use crate::core::identifier::{escape_single_quotes, quote_double};
use crate::core::traits::{contains_any, Dialect};

use super::DialectKind;

/// PostgreSQL dialect implementation.
///
/// Literals assume `standard_conforming_strings = on`, so backslashes are
/// ordinary characters and only the quote is doubled.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn qualify(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", quote_double(schema), quote_double(table))
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", escape_single_quotes(value))
    }

    fn hex_literal(&self, hex_digits: &str) -> String {
        format!("decode('{}', 'hex')", hex_digits)
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn conflict_clause(&self, pk_columns: &[String]) -> String {
        if pk_columns.is_empty() {
            return String::new();
        }
        let cols: Vec<String> = pk_columns.iter().map(|c| quote_double(c)).collect();
        format!(" ON CONFLICT ({}) DO NOTHING", cols.join(", "))
    }

    fn identity_override_clause(&self) -> Option<&'static str> {
        Some("OVERRIDING SYSTEM VALUE")
    }

    fn is_conflict_error(&self, message: &str) -> bool {
        contains_any(message, &["duplicate key", "conflict", "unique constraint"])
    }

    fn autoincrement_key_definition(&self, quoted_name: &str, target_type: &str) -> String {
        format!(
            "{} {} GENERATED ALWAYS AS IDENTITY PRIMARY KEY",
            quoted_name, target_type
        )
    }

    fn identity_column_suffix(&self) -> Option<&'static str> {
        Some("GENERATED ALWAYS AS IDENTITY")
    }

    fn create_namespace(&self, schema: &str) -> Option<String> {
        Some(format!("CREATE SCHEMA IF NOT EXISTS {};", quote_double(schema)))
    }

    fn drop_table(&self, table_ref: &str) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE;", table_ref)
    }

    fn table_exists_query(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}';",
            escape_single_quotes(schema),
            escape_single_quotes(table)
        )
    }

    fn clear_statements(&self, table_ref: &str) -> Vec<String> {
        vec![
            format!("DELETE FROM {};", table_ref),
            format!("TRUNCATE TABLE {} CASCADE;", table_ref),
        ]
    }
}
