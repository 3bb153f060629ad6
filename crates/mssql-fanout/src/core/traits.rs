//! Core traits for dialect-agnostic schema translation and loading.
//!
//! - [`Dialect`]: SQL syntax strategy for a target engine
//! - [`TypeMapper`]: maps source column types onto one target engine
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` and `TypeMapper` provide interchangeable rules
//!   per target, selected once per job and never consulted through global state.

use super::schema::ColumnDefinition;
use crate::dialect::DialectKind;
use crate::typemap::TargetTypeDecl;

/// SQL syntax strategy for different target engines.
///
/// Every method is a pure function of its arguments, so a dialect value can be
/// shared freely between jobs.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "postgres", "mysql").
    fn name(&self) -> &str;

    /// Which engine this dialect renders for.
    fn kind(&self) -> DialectKind;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_ident(&self, name: &str) -> String;

    /// Render the target reference for a source `schema.table`.
    ///
    /// Engines without schemas flatten the pair into one name.
    fn qualify(&self, schema: &str, table: &str) -> String;

    /// Escape and quote a string value.
    fn string_literal(&self, value: &str) -> String;

    /// Render a binary value given as hexadecimal digits.
    fn hex_literal(&self, hex_digits: &str) -> String;

    /// NULL literal.
    fn null_literal(&self) -> &'static str {
        "NULL"
    }

    /// Boolean literal for `bit` values.
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    /// Clause appended to an INSERT that skips rows colliding on the primary
    /// key. Empty when the engine has no such clause.
    fn conflict_clause(&self, _pk_columns: &[String]) -> String {
        String::new()
    }

    /// Clause placed between the column list and `VALUES` that allows explicit
    /// values for identity columns.
    fn identity_override_clause(&self) -> Option<&'static str> {
        None
    }

    /// Statements that open and close an "explicit identity values" scope
    /// around an INSERT.
    fn identity_scope(&self, _table_ref: &str) -> Option<(String, String)> {
        None
    }

    /// Largest row count one multi-row `VALUES` list may carry.
    fn max_insert_rows(&self) -> Option<usize> {
        None
    }

    /// Whether a failed INSERT's diagnostic text describes a key collision or
    /// other constraint conflict.
    fn is_conflict_error(&self, message: &str) -> bool;

    // ===== DDL =====

    /// Column definition for the single auto-increment primary key.
    fn autoincrement_key_definition(&self, quoted_name: &str, target_type: &str) -> String;

    /// Suffix for identity columns that are not a single auto-increment key.
    fn identity_column_suffix(&self) -> Option<&'static str> {
        None
    }

    /// Idempotent namespace creation, if the engine has namespaces.
    fn create_namespace(&self, schema: &str) -> Option<String>;

    /// Idempotent drop of a table.
    fn drop_table(&self, table_ref: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", table_ref)
    }

    /// Byte budget for one index entry, when the engine bounds it.
    fn index_key_budget(&self) -> Option<usize> {
        None
    }

    /// Worst-case bytes per character in the target character set.
    fn bytes_per_char(&self) -> usize {
        1
    }

    // ===== Catalog queries =====

    /// Query returning a single count: 1 if the table exists, 0 otherwise.
    fn table_exists_query(&self, schema: &str, table: &str) -> String;

    /// Query returning the row count of a table.
    fn count_query(&self, table_ref: &str) -> String {
        format!("SELECT COUNT(*) FROM {};", table_ref)
    }

    /// Statements that empty a table, tried in order until one succeeds.
    fn clear_statements(&self, table_ref: &str) -> Vec<String> {
        vec![format!("DELETE FROM {};", table_ref)]
    }
}

/// Maps source column types onto one target dialect.
pub trait TypeMapper: Send + Sync {
    /// Get the target dialect.
    fn target(&self) -> DialectKind;

    /// Map a column definition to a target type declaration.
    fn map_column(&self, col: &ColumnDefinition) -> TargetTypeDecl;
}

/// Case-insensitive check for any of the given markers.
pub(crate) fn contains_any(message: &str, markers: &[&str]) -> bool {
    let lower = message.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}
