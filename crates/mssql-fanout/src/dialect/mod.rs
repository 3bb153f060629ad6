//! Target dialect adapters.
//!
//! - [`postgres`]: PostgreSQL
//! - [`mysql`]: MySQL/MariaDB (schemas flattened into one database)
//! - [`sqlite`]: SQLite file databases
//! - [`mssql`]: a second SQL Server instance
//!
//! Each adapter implements [`Dialect`] as a set of pure functions. Jobs hold
//! a [`DialectImpl`], which forwards to the concrete adapter with a `match`
//! instead of a vtable.

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::traits::Dialect;
use crate::error::{FanoutError, Result};

/// Identity of a database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(alias = "mariadb")]
    Mysql,
    #[serde(alias = "sqlite3")]
    Sqlite,
    #[serde(alias = "sqlserver", alias = "sql_server")]
    Mssql,
}

impl DialectKind {
    /// All target dialects, in the order they are usually reported.
    pub const ALL: [DialectKind; 4] = [
        DialectKind::Postgres,
        DialectKind::Mysql,
        DialectKind::Sqlite,
        DialectKind::Mssql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectKind::Postgres => "postgres",
            DialectKind::Mysql => "mysql",
            DialectKind::Sqlite => "sqlite",
            DialectKind::Mssql => "mssql",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = FanoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            "sqlite" | "sqlite3" => Ok(DialectKind::Sqlite),
            "mssql" | "sqlserver" | "sql_server" => Ok(DialectKind::Mssql),
            other => Err(FanoutError::Config(format!(
                "Unknown database type: '{}'. Supported types: postgres, mysql, sqlite, mssql",
                other
            ))),
        }
    }
}

/// Enum-based static dispatch for dialects.
///
/// We use a manual impl that forwards through [`DialectImpl::as_dialect`]
/// so each trait method is one line.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Postgres(PostgresDialect),
    Mysql(MysqlDialect),
    Sqlite(SqliteDialect),
    Mssql(MssqlDialect),
}

impl DialectImpl {
    /// Build the adapter for an engine.
    ///
    /// `database` is only used by MySQL, which qualifies every table with
    /// its database name.
    pub fn new(kind: DialectKind, database: Option<&str>) -> Self {
        match kind {
            DialectKind::Postgres => DialectImpl::Postgres(PostgresDialect::new()),
            DialectKind::Mysql => DialectImpl::Mysql(match database {
                Some(db) => MysqlDialect::with_database(db),
                None => MysqlDialect::new(),
            }),
            DialectKind::Sqlite => DialectImpl::Sqlite(SqliteDialect::new()),
            DialectKind::Mssql => DialectImpl::Mssql(MssqlDialect::new()),
        }
    }

    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        Ok(Self::new(db_type.parse()?, None))
    }

    fn as_dialect(&self) -> &dyn Dialect {
        match self {
            DialectImpl::Postgres(d) => d,
            DialectImpl::Mysql(d) => d,
            DialectImpl::Sqlite(d) => d,
            DialectImpl::Mssql(d) => d,
        }
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        self.as_dialect().name()
    }

    fn kind(&self) -> DialectKind {
        self.as_dialect().kind()
    }

    fn quote_ident(&self, name: &str) -> String {
        self.as_dialect().quote_ident(name)
    }

    fn qualify(&self, schema: &str, table: &str) -> String {
        self.as_dialect().qualify(schema, table)
    }

    fn string_literal(&self, value: &str) -> String {
        self.as_dialect().string_literal(value)
    }

    fn hex_literal(&self, hex_digits: &str) -> String {
        self.as_dialect().hex_literal(hex_digits)
    }

    fn null_literal(&self) -> &'static str {
        self.as_dialect().null_literal()
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        self.as_dialect().bool_literal(value)
    }

    fn conflict_clause(&self, pk_columns: &[String]) -> String {
        self.as_dialect().conflict_clause(pk_columns)
    }

    fn identity_override_clause(&self) -> Option<&'static str> {
        self.as_dialect().identity_override_clause()
    }

    fn identity_scope(&self, table_ref: &str) -> Option<(String, String)> {
        self.as_dialect().identity_scope(table_ref)
    }

    fn max_insert_rows(&self) -> Option<usize> {
        self.as_dialect().max_insert_rows()
    }

    fn is_conflict_error(&self, message: &str) -> bool {
        self.as_dialect().is_conflict_error(message)
    }

    fn autoincrement_key_definition(&self, quoted_name: &str, target_type: &str) -> String {
        self.as_dialect()
            .autoincrement_key_definition(quoted_name, target_type)
    }

    fn identity_column_suffix(&self) -> Option<&'static str> {
        self.as_dialect().identity_column_suffix()
    }

    fn create_namespace(&self, schema: &str) -> Option<String> {
        self.as_dialect().create_namespace(schema)
    }

    fn drop_table(&self, table_ref: &str) -> String {
        self.as_dialect().drop_table(table_ref)
    }

    fn index_key_budget(&self) -> Option<usize> {
        self.as_dialect().index_key_budget()
    }

    fn bytes_per_char(&self) -> usize {
        self.as_dialect().bytes_per_char()
    }

    fn table_exists_query(&self, schema: &str, table: &str) -> String {
        self.as_dialect().table_exists_query(schema, table)
    }

    fn count_query(&self, table_ref: &str) -> String {
        self.as_dialect().count_query(table_ref)
    }

    fn clear_statements(&self, table_ref: &str) -> Vec<String> {
        self.as_dialect().clear_statements(table_ref)
    }
}
