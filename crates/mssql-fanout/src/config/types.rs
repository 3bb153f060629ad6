//! Configuration type definitions.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name of the source endpoint (must be an mssql endpoint).
    pub source: String,

    /// Every database the run talks to, keyed by name.
    pub endpoints: BTreeMap<String, EndpointConfig>,

    /// Transfer behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Which source schemas go to which target endpoint.
    #[serde(default)]
    pub plans: Vec<PlanConfig>,
}

/// One database endpoint, reached through its command-line client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Engine behind this endpoint.
    pub dialect: DialectKind,

    /// Database host (not used by sqlite).
    #[serde(default)]
    pub host: Option<String>,

    /// Database port (default: the engine's standard port).
    #[serde(default)]
    pub port: Option<u16>,

    /// Database name, or the database file path for sqlite.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: Option<String>,

    /// Password.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Command prefix, e.g. `[docker, exec, -i, my-container]`.
    #[serde(default)]
    pub wrapper: Vec<String>,

    /// Client executable override (default: sqlcmd, psql, mysql, sqlite3).
    #[serde(default)]
    pub program: Option<String>,

    /// Full argument template override. Supports `{database}`, `{query}`
    /// and `{delimiter}` placeholders.
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

impl EndpointConfig {
    /// Configured port, or the engine's standard port.
    pub fn port_or_default(&self) -> Option<u16> {
        self.port.or(match self.dialect {
            DialectKind::Postgres => Some(5432),
            DialectKind::Mysql => Some(3306),
            DialectKind::Mssql => Some(1433),
            DialectKind::Sqlite => None,
        })
    }

    /// Client executable for this endpoint.
    pub fn program(&self) -> &str {
        match &self.program {
            Some(p) => p,
            None => match self.dialect {
                DialectKind::Postgres => "psql",
                DialectKind::Mysql => "mysql",
                DialectKind::Sqlite => "sqlite3",
                DialectKind::Mssql => "sqlcmd",
            },
        }
    }
}

/// Transfer behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows per extraction window (default: 1000).
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Rows per INSERT statement (default: 200).
    #[serde(default = "default_insert_chunk_size")]
    pub insert_chunk_size: usize,

    /// Timeout for metadata and catalog queries, in seconds (default: 120).
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,

    /// Timeout for data queries and statements, in seconds (default: 300).
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// How existing target tables are handled.
    #[serde(default)]
    pub provision_mode: ProvisionMode,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            insert_chunk_size: default_insert_chunk_size(),
            metadata_timeout_secs: default_metadata_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            provision_mode: ProvisionMode::default(),
        }
    }
}

impl MigrationConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Provisioning mode for target tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionMode {
    /// Skip tables whose row counts already match, clear and re-copy the
    /// others, create missing tables.
    #[default]
    Resume,

    /// Drop and recreate every target table before copying.
    Recreate,
}

/// A set of source schemas copied to one target endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Target endpoint name.
    pub target: String,

    /// Schemas to copy.
    pub schemas: Vec<SchemaMapping>,

    /// Copy with one `INSERT ... SELECT` across databases (mssql targets on
    /// the source instance only).
    #[serde(default)]
    pub direct_copy: bool,
}

/// One source schema and its table filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaMapping {
    /// Source schema name.
    pub source: String,

    /// Target schema name (default: same as source).
    #[serde(default)]
    pub target: Option<String>,

    /// Tables to copy. Empty means every table in the schema.
    #[serde(default)]
    pub include: Vec<String>,

    /// Tables to leave out.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl SchemaMapping {
    pub fn target_schema(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.source)
    }

    /// Whether a source table passes the include/exclude filter.
    pub fn selects(&self, table: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|t| t.eq_ignore_ascii_case(table));
        included && !self.exclude.iter().any(|t| t.eq_ignore_ascii_case(table))
    }
}

// Default value functions for serde
fn default_page_size() -> usize {
    1000
}

fn default_insert_chunk_size() -> usize {
    200
}

fn default_metadata_timeout_secs() -> u64 {
    120
}

fn default_query_timeout_secs() -> u64 {
    300
}
