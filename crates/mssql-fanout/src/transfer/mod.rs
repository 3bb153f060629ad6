//! Resumable batch transfer of one table.
//!
//! A job starts by comparing source and target row counts. Equal counts
//! mean the table was already copied and the job is skipped without any
//! further reads or writes. Otherwise the target is provisioned (absent
//! table) or emptied (present table), and source rows are copied page by
//! page, each page flushed as one or more bounded INSERT statements.
//!
//! Failures never escape as `Err`: every outcome, including a failed one, is
//! reported as a [`TransferOutcome`].

pub mod extract;
pub mod literal;
pub mod rows;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{MigrationConfig, ProvisionMode};
use crate::core::identifier::quote_bracket;
use crate::core::schema::TableSpec;
use crate::core::traits::Dialect;
use crate::ddl;
use crate::dialect::{DialectImpl, DialectKind};
use crate::error::{FanoutError, Result};
use crate::introspect::SchemaIntrospector;
use crate::source::output::{parse_count, total_rows_affected};
use crate::source::{ConnectionTarget, DataSource, ExecOptions, QueryOutput};

use self::extract::build_page_query;
use self::literal::render_row;
use self::rows::parse_page;

/// Field delimiter for extracted pages.
const PAGE_DELIMITER: char = '\t';

/// Copy of one source table into one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub source_schema: String,
    pub source_table: String,
    pub target_schema: String,
    pub target_table: String,

    /// Target endpoint; its dialect decides every rendering choice.
    pub target: ConnectionTarget,

    /// Copy with one cross-database `INSERT ... SELECT` (mssql targets only).
    pub direct_copy: bool,
}

impl TransferJob {
    pub fn new(
        source_schema: impl Into<String>,
        table: impl Into<String>,
        target_schema: impl Into<String>,
        target: ConnectionTarget,
    ) -> Self {
        let table = table.into();
        Self {
            source_schema: source_schema.into(),
            source_table: table.clone(),
            target_schema: target_schema.into(),
            target_table: table,
            target,
            direct_copy: false,
        }
    }

    pub fn with_direct_copy(mut self, direct_copy: bool) -> Self {
        self.direct_copy = direct_copy;
        self
    }

    pub fn target_dialect(&self) -> DialectKind {
        self.target.dialect
    }

    /// `schema.table` on the source.
    pub fn source_name(&self) -> String {
        format!("{}.{}", self.source_schema, self.source_table)
    }

    /// Dialect adapter for the target endpoint.
    pub fn dialect(&self) -> DialectImpl {
        DialectImpl::new(self.target.dialect, Some(&self.target.database))
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    SchemaCreated,
    Copying,
    Skipped,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Skipped | JobState::Completed | JobState::Failed)
    }
}

/// Result of one transfer job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Source `schema.table`.
    pub table: String,

    /// Target endpoint name.
    pub target: String,

    pub state: JobState,

    /// Source row count at job start.
    pub source_rows: u64,

    /// Rows the engine believes it loaded.
    pub rows_copied: u64,

    /// Target row count after the copy, when it could be read.
    pub verified_rows: Option<u64>,

    /// The target table was (re)created by this job.
    pub schema_created: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,
}

impl TransferOutcome {
    fn new(job: &TransferJob) -> Self {
        Self {
            table: job.source_name(),
            target: job.target.name.clone(),
            state: JobState::Pending,
            source_rows: 0,
            rows_copied: 0,
            verified_rows: None,
            schema_created: false,
            error: None,
            duration_ms: 0,
        }
    }

    fn advance(&mut self, state: JobState) {
        debug!("{}: {:?} -> {:?}", self.table, self.state, state);
        self.state = state;
    }

    /// Skipped and completed jobs both count as success.
    pub fn success(&self) -> bool {
        matches!(self.state, JobState::Skipped | JobState::Completed)
    }
}

/// Executes transfer jobs one at a time.
pub struct TransferEngine {
    source: Arc<dyn DataSource>,
    source_target: ConnectionTarget,
    introspector: SchemaIntrospector,
    config: MigrationConfig,
}

impl TransferEngine {
    /// Create an engine reading from `source_target`. The same data source
    /// serves both the source and every target endpoint.
    pub fn new(
        source: Arc<dyn DataSource>,
        source_target: ConnectionTarget,
        config: MigrationConfig,
    ) -> Self {
        let introspector =
            SchemaIntrospector::new(source.clone(), ExecOptions::new(config.metadata_timeout()));
        Self {
            source,
            source_target,
            introspector,
            config,
        }
    }

    /// Replace the default introspector (e.g. to inject a drop reporter).
    pub fn with_introspector(mut self, introspector: SchemaIntrospector) -> Self {
        self.introspector = introspector;
        self
    }

    pub fn introspector(&self) -> &SchemaIntrospector {
        &self.introspector
    }

    /// Run one job to a terminal state.
    pub async fn transfer(&self, job: &TransferJob) -> TransferOutcome {
        let start = Instant::now();
        let mut outcome = TransferOutcome::new(job);

        info!(
            "Starting transfer for {} -> {} ({})",
            job.source_name(),
            job.target.name,
            job.target.dialect
        );

        if let Err(e) = self.run(job, &mut outcome).await {
            error!("{}: {}", job.source_name(), e);
            outcome.advance(JobState::Failed);
            outcome.error = Some(e.to_string());
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "{}: {:?}, {} of {} rows in {}ms",
            job.source_name(),
            outcome.state,
            outcome.rows_copied,
            outcome.source_rows,
            outcome.duration_ms
        );
        outcome
    }

    async fn run(&self, job: &TransferJob, outcome: &mut TransferOutcome) -> Result<()> {
        let name = job.source_name();
        let dialect = job.dialect();
        let table_ref = dialect.qualify(&job.target_schema, &job.target_table);
        let resume = self.config.provision_mode == ProvisionMode::Resume;

        let source_rows = self
            .introspector
            .row_count(&self.source_target, &job.source_schema, &job.source_table)
            .await?;
        outcome.source_rows = source_rows;

        let exists = self.target_exists(job, &dialect).await?;
        if resume && exists {
            match self.target_count(job, &dialect, &table_ref).await {
                Some(n) if n == source_rows => {
                    info!("{}: target already holds {} rows, skipping", name, n);
                    outcome.advance(JobState::Skipped);
                    return Ok(());
                }
                Some(n) => info!(
                    "{}: target holds {} of {} rows, copying again",
                    name, n, source_rows
                ),
                None => warn!("{}: could not count target rows, copying again", name),
            }
        }

        let spec = self
            .introspector
            .describe_table(&self.source_target, &job.source_schema, &job.source_table)
            .await?;
        if spec.columns.is_empty() {
            return Err(FanoutError::introspection(&name, "no visible columns"));
        }
        let target_spec = TableSpec::new(
            job.target_schema.clone(),
            job.target_table.clone(),
            spec.columns.clone(),
        );

        for (column, warning) in ddl::lossy_columns(&target_spec, &dialect) {
            debug!("{}.{}: {}", name, column, warning);
        }

        if !exists || !resume {
            self.provision(job, &target_spec, &dialect).await?;
            outcome.schema_created = true;
            outcome.advance(JobState::SchemaCreated);
        } else {
            self.clear(job, &dialect, &table_ref).await?;
        }

        outcome.advance(JobState::Copying);
        if source_rows > 0 {
            if job.direct_copy && job.target.dialect == DialectKind::Mssql {
                outcome.rows_copied = self.direct_copy(job, &spec, &dialect, &table_ref).await?;
            } else {
                self.copy_pages(job, &spec, &target_spec, &dialect, &table_ref, outcome)
                    .await?;
            }
        }

        outcome.verified_rows = self.target_count(job, &dialect, &table_ref).await;
        match outcome.verified_rows {
            Some(n) if n != source_rows => warn!(
                "{}: target holds {} rows after copy, source has {}",
                name, n, source_rows
            ),
            None if source_rows > 0 => warn!("{}: could not verify target row count", name),
            _ => {}
        }

        outcome.advance(JobState::Completed);
        Ok(())
    }

    /// Copy every page of `spec` into the target.
    async fn copy_pages(
        &self,
        job: &TransferJob,
        spec: &TableSpec,
        target_spec: &TableSpec,
        dialect: &DialectImpl,
        table_ref: &str,
        outcome: &mut TransferOutcome,
    ) -> Result<()> {
        let name = job.source_name();
        let page_size = self.config.page_size.max(1);
        let mut chunk_size = self.config.insert_chunk_size.max(1);
        if let Some(max) = dialect.max_insert_rows() {
            chunk_size = chunk_size.min(max);
        }
        let options =
            ExecOptions::new(self.config.query_timeout()).with_delimiter(PAGE_DELIMITER);
        let mut offset: u64 = 0;

        while offset < outcome.source_rows {
            let query = build_page_query(spec, offset, page_size);
            let page = self.source.execute(&self.source_target, &query, &options).await;
            if !page.is_success() {
                return Err(FanoutError::extraction(
                    &name,
                    format!("page at offset {}: {}", offset, page.diagnostic()),
                ));
            }

            let batch = parse_page(&page.text, spec.columns.len(), PAGE_DELIMITER);
            if batch.is_empty() {
                debug!("{}: empty page at offset {}, stopping", name, offset);
                break;
            }

            for chunk in batch.rows.chunks(chunk_size) {
                let statement = build_insert(target_spec, table_ref, chunk, dialect);
                let result = self.exec_target(job, &statement).await;
                if result.is_success() {
                    outcome.rows_copied += chunk.len() as u64;
                } else if dialect.is_conflict_error(&result.text) {
                    debug!(
                        "{}: conflict while loading {} rows, continuing: {}",
                        name,
                        chunk.len(),
                        result.diagnostic()
                    );
                    outcome.rows_copied += chunk.len() as u64;
                } else {
                    warn!(
                        "{}: insert failed at offset {}, skipping rest of page: {}",
                        name,
                        offset,
                        result.diagnostic()
                    );
                    break;
                }
            }

            offset += page_size as u64;
            debug!(
                "{}: {}/{} rows",
                name, outcome.rows_copied, outcome.source_rows
            );
        }
        Ok(())
    }

    /// Cross-database copy on the same mssql instance.
    async fn direct_copy(
        &self,
        job: &TransferJob,
        spec: &TableSpec,
        dialect: &DialectImpl,
        table_ref: &str,
    ) -> Result<u64> {
        let columns: Vec<String> = spec.columns.iter().map(|c| quote_bracket(&c.name)).collect();
        let columns = columns.join(", ");
        let statement = format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}.{}.{};",
            table_ref,
            columns,
            columns,
            quote_bracket(&self.source_target.database),
            quote_bracket(&job.source_schema),
            quote_bracket(&job.source_table)
        );
        let statement = wrap_identity_scope(spec, table_ref, statement, dialect);

        let result = self.exec_target(job, &statement).await;
        if !result.is_success() {
            return Err(FanoutError::execution(&job.target.name, result.diagnostic()));
        }
        let affected = total_rows_affected(&result.text).unwrap_or(0);
        Ok(match self.target_count(job, dialect, table_ref).await {
            Some(n) if n > 0 => n,
            _ => affected,
        })
    }

    async fn provision(
        &self,
        job: &TransferJob,
        spec: &TableSpec,
        dialect: &DialectImpl,
    ) -> Result<()> {
        for statement in ddl::build_provision(spec, dialect) {
            let result = self.exec_target(job, &statement).await;
            if !result.is_success() {
                return Err(FanoutError::provisioning(
                    job.source_name(),
                    result.diagnostic(),
                ));
            }
        }
        debug!("{}: provisioned {}", job.source_name(), spec.full_name());
        Ok(())
    }

    /// Empty the target table, falling back through the dialect's clear
    /// statements.
    async fn clear(&self, job: &TransferJob, dialect: &DialectImpl, table_ref: &str) -> Result<()> {
        let mut last = String::new();
        for statement in dialect.clear_statements(table_ref) {
            let result = self.exec_target(job, &statement).await;
            if result.is_success() {
                return Ok(());
            }
            last = result.diagnostic();
            warn!("{}: {} failed: {}", job.source_name(), statement, last);
        }
        Err(FanoutError::provisioning(
            job.source_name(),
            format!("could not clear target table: {}", last),
        ))
    }

    async fn target_exists(&self, job: &TransferJob, dialect: &DialectImpl) -> Result<bool> {
        let query = dialect.table_exists_query(&job.target_schema, &job.target_table);
        let result = self.exec_target(job, &query).await;
        if !result.is_success() {
            return Err(FanoutError::provisioning(
                job.source_name(),
                format!("could not check target table: {}", result.diagnostic()),
            ));
        }
        Ok(parse_count(&result.text).unwrap_or(0) > 0)
    }

    async fn target_count(
        &self,
        job: &TransferJob,
        dialect: &DialectImpl,
        table_ref: &str,
    ) -> Option<u64> {
        let result = self.exec_target(job, &dialect.count_query(table_ref)).await;
        if result.is_success() {
            parse_count(&result.text)
        } else {
            None
        }
    }

    async fn exec_target(&self, job: &TransferJob, statement: &str) -> QueryOutput {
        let options = ExecOptions::new(self.config.query_timeout());
        self.source.execute(&job.target, statement, &options).await
    }
}

/// One multi-row INSERT for `rows`, with the dialect's identity handling
/// and conflict clause.
pub fn build_insert(
    spec: &TableSpec,
    table_ref: &str,
    rows: &[Vec<String>],
    dialect: &DialectImpl,
) -> String {
    let columns: Vec<String> = spec.columns.iter().map(|c| dialect.quote_ident(&c.name)).collect();
    let tuples: Vec<String> = rows
        .iter()
        .map(|row| render_row(row, &spec.columns, dialect))
        .collect();

    let override_clause = match dialect.identity_override_clause() {
        Some(clause) if spec.has_identity() => format!(" {}", clause),
        _ => String::new(),
    };
    let pk: Vec<String> = spec
        .primary_key_columns()
        .into_iter()
        .map(|c| c.name.clone())
        .collect();

    let statement = format!(
        "INSERT INTO {} ({}){} VALUES {}{};",
        table_ref,
        columns.join(", "),
        override_clause,
        tuples.join(", "),
        dialect.conflict_clause(&pk)
    );
    wrap_identity_scope(spec, table_ref, statement, dialect)
}

/// Surround `statement` with the dialect's explicit-identity scope when the
/// table has an identity column.
fn wrap_identity_scope(
    spec: &TableSpec,
    table_ref: &str,
    statement: String,
    dialect: &DialectImpl,
) -> String {
    if !spec.has_identity() {
        return statement;
    }
    match dialect.identity_scope(table_ref) {
        Some((on, off)) => format!("{}\n{}\n{}", on, statement, off),
        None => statement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnDefinition, SourceType};
    use crate::source::testing::ScriptedSource;

    const DEMO_COLUMNS: &str = "ID,int,NO,NULL,10,0\nName,nvarchar,NO,50,NULL,NULL\nFlag,bit,YES,NULL,NULL,NULL\n";

    fn source_target() -> ConnectionTarget {
        ConnectionTarget::new("src", DialectKind::Mssql, "AdventureWorks2022")
    }

    fn people() -> ConnectionTarget {
        ConnectionTarget::new("people", DialectKind::Postgres, "personmanagement")
    }

    fn inventory() -> ConnectionTarget {
        ConnectionTarget::new("inventory", DialectKind::Mysql, "inventory")
    }

    fn config(page_size: usize, insert_chunk_size: usize) -> MigrationConfig {
        MigrationConfig {
            page_size,
            insert_chunk_size,
            ..MigrationConfig::default()
        }
    }

    /// Source side of `dbo.Demo` with the given count and page text.
    fn demo_source(count: usize, page: String) -> ScriptedSource {
        ScriptedSource::new()
            .on("src", "COUNT(*) FROM [dbo].[Demo]", &count.to_string())
            .on("src", "c.DATA_TYPE", DEMO_COLUMNS)
            .on("src", "KEY_COLUMN_USAGE", "ID\n")
            .on("src", "IsIdentity", "ID\n")
            .on("src", "IsComputed", "")
            .on("src", "OFFSET 0 ROWS", &page)
    }

    fn engine(source: Arc<ScriptedSource>, config: MigrationConfig) -> TransferEngine {
        TransferEngine::new(source, source_target(), config)
    }

    fn demo_rows(n: usize) -> String {
        (1..=n)
            .map(|i| format!("{}\tName{}\t{}\n", i, i, i % 2))
            .collect()
    }

    fn inserts(source: &ScriptedSource, endpoint: &str) -> Vec<String> {
        source
            .queries_to(endpoint)
            .into_iter()
            .filter(|q| q.contains("INSERT INTO"))
            .collect()
    }

    #[tokio::test]
    async fn test_equal_counts_skip_without_further_work() {
        let source = Arc::new(
            demo_source(701, demo_rows(3))
                .on("people", "information_schema.tables", "1\n")
                .on("people", "COUNT(*) FROM \"dbo\".\"Demo\"", "701\n"),
        );
        let outcome = engine(source.clone(), config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", people()))
            .await;

        assert_eq!(outcome.state, JobState::Skipped);
        assert!(outcome.success());
        assert_eq!(outcome.rows_copied, 0);
        assert_eq!(source.queries_to("src").len(), 1);
        assert_eq!(source.queries_to("people").len(), 2);
    }

    #[tokio::test]
    async fn test_absent_table_is_provisioned_and_chunked() {
        let source = Arc::new(
            demo_source(1000, demo_rows(1000))
                .on("people", "information_schema.tables", "0\n")
                .on("people", "COUNT(*) FROM \"dbo\".\"Demo\"", "1000\n"),
        );
        let outcome = engine(source.clone(), config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", people()))
            .await;

        assert_eq!(outcome.state, JobState::Completed);
        assert!(outcome.schema_created);
        assert_eq!(outcome.rows_copied, 1000);
        assert_eq!(outcome.verified_rows, Some(1000));

        let queries = source.queries_to("people");
        assert!(queries.iter().any(|q| q.starts_with("CREATE SCHEMA IF NOT EXISTS \"dbo\"")));
        assert!(queries.iter().any(|q| q.starts_with("CREATE TABLE \"dbo\".\"Demo\"")));

        let inserts = inserts(&source, "people");
        assert_eq!(inserts.len(), 5);
        for (i, insert) in inserts.iter().enumerate() {
            assert_eq!(insert.matches("), (").count() + 1, 200);
            let first = i * 200 + 1;
            assert!(insert.contains(&format!("VALUES ({}, 'Name{}'", first, first)));
        }
        assert!(inserts[0].contains("OVERRIDING SYSTEM VALUE VALUES"));
        assert!(inserts[0].ends_with("ON CONFLICT (\"ID\") DO NOTHING;"));
    }

    #[tokio::test]
    async fn test_demo_table_end_to_end() {
        let page = "1\tKen\t1\n2\tTerri\t\n3\tRob\t0\n".to_string();
        let source = Arc::new(
            demo_source(3, page)
                .on("inventory", "INFORMATION_SCHEMA.TABLES", "0\n")
                .on("inventory", "COUNT(*) FROM `inventory`.`dbo_Demo`", "3\n"),
        );
        let outcome = engine(source.clone(), config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", inventory()))
            .await;
        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(outcome.rows_copied, 3);

        let queries = source.queries_to("inventory");
        let create = queries
            .iter()
            .find(|q| q.starts_with("CREATE TABLE"))
            .unwrap();
        assert!(create.contains("`ID` INT NOT NULL AUTO_INCREMENT PRIMARY KEY"));
        assert!(create.contains("`Name` VARCHAR(200) NOT NULL"));
        assert!(create.contains("`Flag` TINYINT(1)"));

        let inserts = inserts(&source, "inventory");
        assert_eq!(inserts.len(), 1);
        assert!(inserts[0].contains("(1, 'Ken', 1), (2, 'Terri', NULL), (3, 'Rob', 0)"));
    }

    #[tokio::test]
    async fn test_present_table_with_fewer_rows_is_cleared() {
        let source = Arc::new(
            demo_source(3, demo_rows(3))
                .on("people", "information_schema.tables", "1\n")
                .fail_on("people", "DELETE FROM", "ERROR: permission denied")
                .on("people", "COUNT(*) FROM \"dbo\".\"Demo\"", "1\n"),
        );
        let outcome = engine(source.clone(), config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", people()))
            .await;

        assert_eq!(outcome.state, JobState::Completed);
        assert!(!outcome.schema_created);
        let queries = source.queries_to("people");
        assert!(queries.iter().any(|q| q.starts_with("TRUNCATE TABLE \"dbo\".\"Demo\" CASCADE")));
        assert!(!queries.iter().any(|q| q.starts_with("CREATE TABLE")));
        assert_eq!(inserts(&source, "people").len(), 1);
    }

    #[tokio::test]
    async fn test_recreate_mode_always_provisions() {
        let source = Arc::new(
            demo_source(3, demo_rows(3))
                .on("people", "information_schema.tables", "1\n")
                .on("people", "COUNT(*) FROM \"dbo\".\"Demo\"", "3\n"),
        );
        let config = MigrationConfig {
            provision_mode: ProvisionMode::Recreate,
            ..MigrationConfig::default()
        };
        let outcome = engine(source.clone(), config)
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", people()))
            .await;

        assert_eq!(outcome.state, JobState::Completed);
        let queries = source.queries_to("people");
        assert!(queries.iter().any(|q| q.starts_with("DROP TABLE IF EXISTS")));
        assert_eq!(inserts(&source, "people").len(), 1);
    }

    #[tokio::test]
    async fn test_conflicts_are_counted_and_other_errors_skip_the_page() {
        let source = Arc::new(
            demo_source(4, demo_rows(2))
                .on("src", "OFFSET 2 ROWS", "3\tC\t1\n4\tD\t0\n")
                .on("inventory", "INFORMATION_SCHEMA.TABLES", "0\n")
                .fail_on("inventory", "'Name1'", "ERROR 1062: Duplicate entry '1' for key 'PRIMARY'")
                .fail_on("inventory", "'C'", "ERROR 1366: Incorrect integer value"),
        );
        let outcome = engine(source.clone(), config(2, 1))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", inventory()))
            .await;

        assert_eq!(outcome.state, JobState::Completed);
        // Page 1: conflict counted, second row loaded. Page 2: abandoned.
        assert_eq!(outcome.rows_copied, 2);
        assert_eq!(inserts(&source, "inventory").len(), 3);
    }

    #[tokio::test]
    async fn test_extraction_failure_fails_job_and_keeps_progress() {
        let source = Arc::new(
            demo_source(4, demo_rows(2))
                .fail_on("src", "OFFSET 2 ROWS", "Msg 4060, Cannot open database")
                .on("people", "information_schema.tables", "0\n"),
        );
        let outcome = engine(source.clone(), config(2, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", people()))
            .await;

        assert_eq!(outcome.state, JobState::Failed);
        assert!(!outcome.success());
        assert_eq!(outcome.rows_copied, 2);
        assert!(outcome.error.unwrap().contains("Cannot open database"));
    }

    #[tokio::test]
    async fn test_table_without_columns_fails_before_ddl() {
        let source = Arc::new(
            ScriptedSource::new()
                .on("src", "COUNT(*) FROM [dbo].[Ghost]", "5\n")
                .on("people", "information_schema.tables", "0\n"),
        );
        let outcome = engine(source.clone(), config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Ghost", "dbo", people()))
            .await;

        assert_eq!(outcome.state, JobState::Failed);
        assert!(!source
            .queries_to("people")
            .iter()
            .any(|q| q.contains("CREATE TABLE")));
    }

    #[tokio::test]
    async fn test_empty_source_table() {
        let present = Arc::new(
            demo_source(0, String::new())
                .on("people", "information_schema.tables", "1\n")
                .on("people", "COUNT(*) FROM \"dbo\".\"Demo\"", "0\n"),
        );
        let outcome = engine(present, config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", people()))
            .await;
        assert_eq!(outcome.state, JobState::Skipped);

        let absent = Arc::new(
            demo_source(0, String::new()).on("people", "information_schema.tables", "0\n"),
        );
        let outcome = engine(absent.clone(), config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", people()))
            .await;
        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(outcome.rows_copied, 0);
        assert!(absent
            .queries_to("people")
            .iter()
            .any(|q| q.starts_with("CREATE TABLE")));
        assert!(!absent.queries_to("src").iter().any(|q| q.contains("OFFSET")));

        // A present table holding stale rows is emptied, not recreated.
        let stale = Arc::new(
            demo_source(0, String::new())
                .on("people", "information_schema.tables", "1\n")
                .on("people", "COUNT(*) FROM \"dbo\".\"Demo\"", "4\n"),
        );
        let outcome = engine(stale.clone(), config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", people()))
            .await;
        assert_eq!(outcome.state, JobState::Completed);
        assert!(!outcome.schema_created);
        let queries = stale.queries_to("people");
        assert!(queries.iter().any(|q| q.starts_with("DELETE FROM \"dbo\".\"Demo\"")));
        assert!(!queries.iter().any(|q| q.starts_with("CREATE TABLE")));
    }

    #[tokio::test]
    async fn test_mssql_direct_copy() {
        let archive = ConnectionTarget::new("archive", DialectKind::Mssql, "AdventureWorksArchive");
        let source = Arc::new(
            demo_source(3, demo_rows(3))
                .on("archive", "sys.objects", "0\n")
                .on("archive", "INSERT INTO", "\n(3 rows affected)\n"),
        );
        let outcome = engine(source.clone(), config(1000, 200))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", archive).with_direct_copy(true))
            .await;

        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(outcome.rows_copied, 3);
        let insert = &inserts(&source, "archive")[0];
        assert!(insert.starts_with("SET IDENTITY_INSERT [dbo].[Demo] ON;\nINSERT INTO [dbo].[Demo]"));
        assert!(insert.contains("SELECT [ID], [Name], [Flag] FROM [AdventureWorks2022].[dbo].[Demo];"));
        assert!(insert.ends_with("SET IDENTITY_INSERT [dbo].[Demo] OFF;"));
        assert!(!source.queries_to("src").iter().any(|q| q.contains("OFFSET")));
    }

    #[tokio::test]
    async fn test_mssql_chunks_respect_row_limit() {
        let archive = ConnectionTarget::new("archive", DialectKind::Mssql, "AdventureWorksArchive");
        let source = Arc::new(
            demo_source(1200, demo_rows(1200)).on("archive", "sys.objects", "0\n"),
        );
        let outcome = engine(source.clone(), config(2000, 1500))
            .transfer(&TransferJob::new("dbo", "Demo", "dbo", archive))
            .await;

        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(outcome.rows_copied, 1200);
        let inserts = inserts(&source, "archive");
        assert_eq!(inserts.len(), 2);
        assert_eq!(inserts[0].matches("), (").count() + 1, 1000);
        assert_eq!(inserts[1].matches("), (").count() + 1, 200);
    }

    #[test]
    fn test_build_insert_wraps_identity_scope_for_mssql() {
        let spec = TableSpec::new(
            "dbo",
            "Demo",
            vec![
                ColumnDefinition::new("ID", SourceType::Int).primary_key().identity(),
                ColumnDefinition::new("Name", SourceType::NVarChar).not_null(),
            ],
        );
        let dialect = DialectImpl::new(DialectKind::Mssql, None);
        let rows = vec![vec!["1".to_string(), "".to_string()]];
        let sql = build_insert(&spec, "[dbo].[Demo]", &rows, &dialect);
        assert_eq!(
            sql,
            "SET IDENTITY_INSERT [dbo].[Demo] ON;\n\
             INSERT INTO [dbo].[Demo] ([ID], [Name]) VALUES (1, N'');\n\
             SET IDENTITY_INSERT [dbo].[Demo] OFF;"
        );
    }

    #[test]
    fn test_build_insert_without_identity_or_key() {
        let spec = TableSpec::new(
            "Sales",
            "Log",
            vec![ColumnDefinition::new("Message", SourceType::NVarChar)],
        );
        let dialect = DialectImpl::new(DialectKind::Sqlite, None);
        let rows = vec![vec!["hi".to_string()], vec!["NULL".to_string()]];
        assert_eq!(
            build_insert(&spec, "\"Sales_Log\"", &rows, &dialect),
            "INSERT INTO \"Sales_Log\" (\"Message\") VALUES ('hi'), (NULL);"
        );
    }
}
