//! Identifier validation and quoting.
//!
//! Identifiers cannot travel as statement parameters, and the whole pipeline
//! talks to the databases through statement text, so every table, schema and
//! column name is validated once when it enters the system and quoted with
//! the dialect's escaping whenever it is rendered.

use crate::error::{FanoutError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier.
///
/// Rejects empty identifiers, identifiers containing null bytes or line
/// breaks, and identifiers exceeding [`MAX_IDENTIFIER_LENGTH`].
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FanoutError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') || name.contains('\n') || name.contains('\r') {
        return Err(FanoutError::Config(format!(
            "Identifier contains control characters: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(FanoutError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Double-quote an identifier (PostgreSQL, SQLite).
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Backtick-quote an identifier (MySQL).
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Bracket-quote an identifier (SQL Server).
pub fn quote_bracket(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Flattened table name for targets without schemas: `Schema_Table`.
pub fn flatten(schema: &str, table: &str) -> String {
    format!("{}_{}", schema, table)
}

/// Escape a value for use inside a single-quoted string in catalog queries.
pub fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "''")
}
