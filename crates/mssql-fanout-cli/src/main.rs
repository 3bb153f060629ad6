//! mssql-fanout CLI - copy SQL Server schemas to PostgreSQL, MySQL, SQLite
//! and SQL Server.

use clap::{Parser, Subcommand};
use mssql_fanout::ddl::build_create;
use mssql_fanout::{Config, DialectImpl, DialectKind, FanoutError, Orchestrator, TypeCatalog};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "mssql-fanout")]
#[command(about = "Copy SQL Server schemas to PostgreSQL, MySQL, SQLite and SQL Server")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured plans
    Run {
        /// Only run the plan for this target endpoint
        #[arg(long)]
        plan: Option<String>,

        /// Print the DDL that would be issued without touching any target
        #[arg(long)]
        dry_run: bool,
    },

    /// Describe a source table and show its DDL for every dialect
    Describe {
        /// Table as schema.table
        table: String,
    },

    /// List the tables of a source schema
    ListTables {
        /// Source schema name
        schema: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, FanoutError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);
    let orchestrator = Orchestrator::new(config)?;

    match cli.command {
        Commands::Run { plan, dry_run } => {
            if dry_run {
                let planned = orchestrator.plan_ddl(plan.as_deref()).await?;
                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&planned)?);
                } else {
                    for table in &planned {
                        println!("-- {} -> {}", table.table, table.target);
                        for (column, warning) in &table.lossy_columns {
                            println!("-- {}: {}", column, warning);
                        }
                        for statement in &table.statements {
                            println!("{}", statement);
                        }
                        println!();
                    }
                    println!("Dry run: {} tables planned", planned.len());
                }
                return Ok(ExitCode::SUCCESS);
            }

            let result = orchestrator.run(plan.as_deref()).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nMigration {}", result.status);
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                for plan in &result.plans {
                    println!(
                        "  {} ({}): {}/{} tables, {} skipped, {} failed, {} rows",
                        plan.target,
                        plan.dialect,
                        plan.tables_success,
                        plan.tables_total,
                        plan.tables_skipped,
                        plan.tables_failed,
                        plan.rows_copied
                    );
                }
                println!(
                    "  Tables: {}/{}",
                    result.tables_success, result.tables_total
                );
                println!("  Rows: {}", result.rows_copied);
                if !result.failed_tables.is_empty() {
                    println!("  Failed tables: {:?}", result.failed_tables);
                }
            }

            if !result.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Describe { table } => {
            let (schema, name) = table.split_once('.').ok_or_else(|| {
                FanoutError::Config(format!("expected schema.table, got '{}'", table))
            })?;
            let spec = orchestrator.describe(schema, name).await?;
            if spec.columns.is_empty() {
                return Err(FanoutError::introspection(&table, "no visible columns"));
            }

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&spec)?);
                return Ok(ExitCode::SUCCESS);
            }

            println!("{} ({} columns)", spec.full_name(), spec.columns.len());
            for col in &spec.columns {
                let mut flags = Vec::new();
                if col.is_primary_key {
                    flags.push("pk");
                }
                if col.is_identity {
                    flags.push("identity");
                }
                if !col.nullable {
                    flags.push("not null");
                }
                let targets: Vec<String> = DialectKind::ALL
                    .iter()
                    .map(|kind| format!("{}={}", kind, TypeCatalog::resolve_column(col, *kind).sql))
                    .collect();
                println!(
                    "  {:<30} {:<16} {:<20} {}",
                    col.name,
                    col.source_type.name(),
                    flags.join(","),
                    targets.join(" ")
                );
            }
            for kind in DialectKind::ALL {
                println!("\n-- {}", kind);
                println!("{}", build_create(&spec, &DialectImpl::new(kind, None)));
            }
        }

        Commands::ListTables { schema } => {
            let tables = orchestrator.list_tables(&schema).await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    println!("{}", table);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so --output-json stays parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
