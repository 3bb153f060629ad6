//! # mssql-fanout
//!
//! Schema translation and resumable batch transfer from Microsoft SQL Server
//! to PostgreSQL, MySQL, SQLite and SQL Server.
//!
//! This library provides:
//!
//! - **Type mapping** from every SQL Server column type to each target dialect
//! - **Schema introspection** of source tables into [`TableSpec`]s
//! - **DDL generation** per target dialect, including auto-increment keys
//! - **Resumable transfers**: tables whose row counts already match are skipped
//! - **Command-line clients** (`sqlcmd`, `psql`, `mysql`, `sqlite3`) as the
//!   only database access, behind the [`DataSource`] trait
//!
//! ## Example
//!
//! ```rust,no_run
//! use mssql_fanout::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mssql_fanout::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(config)?;
//!     let result = orchestrator.run(None).await?;
//!     println!("Copied {} rows", result.rows_copied);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod introspect;
pub mod orchestrator;
pub mod source;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use crate::config::{Config, EndpointConfig, MigrationConfig, PlanConfig, ProvisionMode, SchemaMapping};
pub use crate::core::{ColumnDefinition, Dialect, SourceType, TableSpec, TypeFamily, TypeMapper};
pub use crate::dialect::{DialectImpl, DialectKind};
pub use crate::error::{FanoutError, Result};
pub use crate::introspect::{DropReporter, SchemaIntrospector, TracingReporter};
pub use crate::orchestrator::{MigrationResult, Orchestrator, PlanResult, PlannedTable};
pub use crate::source::{CommandDataSource, ConnectionTarget, DataSource, ExecOptions, QueryOutput};
pub use crate::transfer::{JobState, TransferEngine, TransferJob, TransferOutcome};
pub use crate::typemap::{TargetTypeDecl, TypeCatalog};
