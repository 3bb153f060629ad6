//! Migration orchestrator - runs every configured plan.
//!
//! Tables run strictly one after another. A failed table is recorded and the
//! run moves on; only configuration problems end a run early.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{Config, PlanConfig};
use crate::core::schema::TableSpec;
use crate::ddl;
use crate::dialect::{DialectImpl, DialectKind};
use crate::error::Result;
use crate::source::{CommandDataSource, ConnectionTarget, DataSource};
use crate::transfer::{JobState, TransferEngine, TransferJob, TransferOutcome};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    source_target: ConnectionTarget,
    engine: TransferEngine,
}

/// Tally for one plan (one target endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResult {
    /// Target endpoint name.
    pub target: String,

    pub dialect: DialectKind,

    pub tables_total: usize,
    pub tables_success: usize,
    pub tables_failed: usize,
    pub tables_skipped: usize,

    /// Rows loaded by this plan.
    pub rows_copied: u64,

    /// Per-table outcomes in execution order.
    pub tables: Vec<TransferOutcome>,
}

impl PlanResult {
    fn new(target: &ConnectionTarget) -> Self {
        Self {
            target: target.name.clone(),
            dialect: target.dialect,
            tables_total: 0,
            tables_success: 0,
            tables_failed: 0,
            tables_skipped: 0,
            rows_copied: 0,
            tables: Vec::new(),
        }
    }

    fn record(&mut self, outcome: TransferOutcome) {
        self.tables_total += 1;
        match outcome.state {
            JobState::Skipped => {
                self.tables_success += 1;
                self.tables_skipped += 1;
            }
            JobState::Completed => self.tables_success += 1,
            _ => self.tables_failed += 1,
        }
        self.rows_copied += outcome.rows_copied;
        self.tables.push(outcome);
    }

    /// Source names of the tables that failed.
    pub fn failed_tables(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter(|t| !t.success())
            .map(|t| format!("{}: {}", t.target, t.table))
            .collect()
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Hash of the configuration the run used.
    pub config_hash: String,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Total tables processed.
    pub tables_total: usize,

    /// Tables copied or already up to date.
    pub tables_success: usize,

    /// Tables that failed.
    pub tables_failed: usize,

    /// Tables skipped because the target already matched.
    pub tables_skipped: usize,

    /// Total rows copied.
    pub rows_copied: u64,

    /// `target: schema.table` of every failed table.
    pub failed_tables: Vec<String>,

    /// Per-plan tallies.
    pub plans: Vec<PlanResult>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_success(&self) -> bool {
        self.tables_failed == 0
    }
}

/// DDL a plan would issue for one table, without touching the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTable {
    pub target: String,
    pub table: String,
    pub statements: Vec<String>,

    /// `(column, warning)` for columns whose target type is lossy.
    pub lossy_columns: Vec<(String, String)>,
}

impl Orchestrator {
    /// Create an orchestrator that runs the configured command-line clients.
    pub fn new(config: Config) -> Result<Self> {
        let source: Arc<dyn DataSource> = Arc::new(CommandDataSource::from_config(&config));
        Self::with_source(config, source)
    }

    /// Create an orchestrator over any data source.
    pub fn with_source(config: Config, source: Arc<dyn DataSource>) -> Result<Self> {
        config.validate()?;
        let source_target = config.source_target()?;
        let engine = TransferEngine::new(source, source_target.clone(), config.migration.clone());
        Ok(Self {
            config,
            source_target,
            engine,
        })
    }

    /// Run every plan, or only the plan targeting `plan`.
    pub async fn run(&self, plan: Option<&str>) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let plans = self.config.plans_for(plan)?;

        info!("Starting migration run: {} ({} plans)", run_id, plans.len());

        let mut results = Vec::with_capacity(plans.len());
        for plan in plans {
            results.push(self.run_plan(plan).await?);
        }

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let tables_failed: usize = results.iter().map(|p| p.tables_failed).sum();

        let result = MigrationResult {
            run_id,
            status: if tables_failed == 0 {
                "completed".to_string()
            } else {
                "completed_with_errors".to_string()
            },
            config_hash: self.config.hash(),
            started_at,
            completed_at,
            duration_seconds,
            tables_total: results.iter().map(|p| p.tables_total).sum(),
            tables_success: results.iter().map(|p| p.tables_success).sum(),
            tables_failed,
            tables_skipped: results.iter().map(|p| p.tables_skipped).sum(),
            rows_copied: results.iter().map(|p| p.rows_copied).sum(),
            failed_tables: results.iter().flat_map(|p| p.failed_tables()).collect(),
            plans: results,
        };

        info!(
            "Migration {}: {}/{} tables ok ({} skipped), {} rows in {:.1}s",
            result.status,
            result.tables_success,
            result.tables_total,
            result.tables_skipped,
            result.rows_copied,
            result.duration_seconds
        );
        for name in &result.failed_tables {
            warn!("Failed: {}", name);
        }

        Ok(result)
    }

    async fn run_plan(&self, plan: &PlanConfig) -> Result<PlanResult> {
        let target = self.config.connection_target(&plan.target)?;
        info!("Plan {} ({})", target.name, target.dialect);

        let mut result = PlanResult::new(&target);
        for job in self.jobs_for(plan, &target).await {
            let outcome = self.engine.transfer(&job).await;
            result.record(outcome);
        }

        info!(
            "Plan {}: {}/{} tables ok, {} failed, {} rows",
            result.target,
            result.tables_success,
            result.tables_total,
            result.tables_failed,
            result.rows_copied
        );
        Ok(result)
    }

    /// Jobs for every selected table of every schema in `plan`.
    async fn jobs_for(&self, plan: &PlanConfig, target: &ConnectionTarget) -> Vec<TransferJob> {
        let mut jobs = Vec::new();
        for mapping in &plan.schemas {
            let tables = match self.list_tables(&mapping.source).await {
                Ok(tables) => tables,
                Err(e) => {
                    error!("Could not list tables of schema {}: {}", mapping.source, e);
                    continue;
                }
            };
            jobs.extend(tables.into_iter().filter(|t| mapping.selects(t)).map(|t| {
                TransferJob::new(&mapping.source, t, mapping.target_schema(), target.clone())
                    .with_direct_copy(plan.direct_copy)
            }));
        }
        jobs
    }

    /// Statements a run would issue to provision each selected table.
    pub async fn plan_ddl(&self, plan: Option<&str>) -> Result<Vec<PlannedTable>> {
        let mut planned = Vec::new();
        for plan in self.config.plans_for(plan)? {
            let target = self.config.connection_target(&plan.target)?;
            let dialect = DialectImpl::new(target.dialect, Some(&target.database));
            for job in self.jobs_for(plan, &target).await {
                let spec = match self.describe(&job.source_schema, &job.source_table).await {
                    Ok(spec) => spec,
                    Err(e) => {
                        error!("{}", e);
                        continue;
                    }
                };
                let spec = spec.renamed(&job.target_schema);
                planned.push(PlannedTable {
                    target: target.name.clone(),
                    table: job.source_name(),
                    statements: ddl::build_provision(&spec, &dialect),
                    lossy_columns: ddl::lossy_columns(&spec, &dialect),
                });
            }
        }
        Ok(planned)
    }

    /// Describe one source table.
    pub async fn describe(&self, schema: &str, table: &str) -> Result<TableSpec> {
        self.engine
            .introspector()
            .describe_table(&self.source_target, schema, table)
            .await
    }

    /// Base tables of a source schema.
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        self.engine
            .introspector()
            .list_tables(&self.source_target, schema)
            .await
    }
}
