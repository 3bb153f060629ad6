//! [`DataSource`] backed by database command-line clients.
//!
//! Each call spawns `sqlcmd`, `psql`, `mysql` or `sqlite3` (optionally behind
//! a wrapper such as `docker exec -i <container>`), waits for it with a
//! timeout and returns its output. Spawn failures and timeouts come back as
//! status 1 with a short diagnostic.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::output::first_column;
use super::{ConnectionTarget, DataSource, ExecOptions, QueryOutput};
use crate::config::{Config, EndpointConfig};
use crate::core::identifier::escape_single_quotes;
use crate::dialect::DialectKind;
use crate::error::{FanoutError, Result};

/// Runs queries through each endpoint's command-line client.
#[derive(Debug, Clone)]
pub struct CommandDataSource {
    endpoints: BTreeMap<String, EndpointConfig>,
    catalog_timeout: Duration,
}

/// A fully resolved client invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Query text written to stdin instead of passed as an argument.
    pub stdin: Option<String>,
}

impl CommandDataSource {
    pub fn new(endpoints: BTreeMap<String, EndpointConfig>, catalog_timeout: Duration) -> Self {
        Self {
            endpoints,
            catalog_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoints.clone(), config.migration.metadata_timeout())
    }

    fn endpoint(&self, name: &str) -> Option<&EndpointConfig> {
        self.endpoints.get(name)
    }

    async fn run(&self, invocation: Invocation, options: &ExecOptions) -> QueryOutput {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start {}: {}", invocation.program, e);
                return QueryOutput::failure(format!("Error: {}", e));
            }
        };

        // Feed stdin while draining stdout, both inside the timeout.
        let stdin = child.stdin.take();
        let query = invocation.stdin.clone();
        let feed = async move {
            if let (Some(query), Some(mut stdin)) = (query, stdin) {
                stdin.write_all(query.as_bytes()).await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let work = async move {
            let ((), output) = tokio::try_join!(feed, child.wait_with_output())?;
            Ok::<_, std::io::Error>(output)
        };

        let output = match tokio::time::timeout(options.timeout, work).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return QueryOutput::failure(format!("Error: {}", e)),
            Err(_) => {
                warn!(
                    "{} timed out after {}s",
                    invocation.program,
                    options.timeout.as_secs()
                );
                return QueryOutput::failure("Timeout");
            }
        };

        let decode = |bytes: &[u8]| -> String {
            if options.binary_mode {
                bytes.iter().map(|&b| b as char).collect()
            } else {
                String::from_utf8_lossy(bytes).into_owned()
            }
        };

        let status = output.status.code().unwrap_or(1);
        let mut text = decode(&output.stdout);
        if status != 0 {
            text.push_str(&decode(&output.stderr));
        }
        QueryOutput { text, status }
    }
}

/// Build the client invocation for one query.
pub fn build_invocation(
    endpoint: &EndpointConfig,
    query: &str,
    options: &ExecOptions,
) -> Invocation {
    let delimiter = options.field_delimiter.to_string();
    let host = endpoint.host.clone().unwrap_or_else(|| "localhost".to_string());
    let port = endpoint
        .port_or_default()
        .map(|p| p.to_string())
        .unwrap_or_default();
    let user = endpoint.user.clone().unwrap_or_default();
    let password = endpoint.password.clone().unwrap_or_default();

    let mut env = Vec::new();
    let mut stdin = None;

    let args: Vec<String> = match &endpoint.args {
        Some(template) => {
            if !template.iter().any(|a| a.contains("{query}")) {
                stdin = Some(query.to_string());
            }
            template
                .iter()
                .map(|a| {
                    a.replace("{database}", &endpoint.database)
                        .replace("{delimiter}", &delimiter)
                        .replace("{host}", &host)
                        .replace("{port}", &port)
                        .replace("{user}", &user)
                        .replace("{password}", &password)
                        .replace("{query}", query)
                })
                .collect()
        }
        None => match endpoint.dialect {
            DialectKind::Mssql => {
                let server = if port.is_empty() {
                    host
                } else {
                    format!("{},{}", host, port)
                };
                let mut args = vec!["-S".to_string(), server];
                if user.is_empty() {
                    args.push("-E".to_string());
                } else {
                    args.extend(["-U".to_string(), user, "-P".to_string(), password]);
                }
                args.extend(
                    [
                        "-C",
                        "-d",
                        endpoint.database.as_str(),
                        "-Q",
                        query,
                        "-h",
                        "-1",
                        "-W",
                        "-s",
                        delimiter.as_str(),
                        "-w",
                        "65535",
                        "-b",
                        "-x",
                    ]
                    .iter()
                    .map(|s| s.to_string()),
                );
                args
            }
            DialectKind::Postgres => {
                if !password.is_empty() {
                    env.push(("PGPASSWORD".to_string(), password));
                }
                let mut args = vec!["-h".to_string(), host, "-p".to_string(), port];
                if !user.is_empty() {
                    args.extend(["-U".to_string(), user]);
                }
                args.extend(
                    [
                        "-d",
                        endpoint.database.as_str(),
                        "-X",
                        "-q",
                        "-t",
                        "-A",
                        "-v",
                        "ON_ERROR_STOP=1",
                        "-F",
                        delimiter.as_str(),
                        "-c",
                        query,
                    ]
                    .iter()
                    .map(|s| s.to_string()),
                );
                args
            }
            DialectKind::Mysql => {
                if !password.is_empty() {
                    env.push(("MYSQL_PWD".to_string(), password));
                }
                stdin = Some(query.to_string());
                let mut args = vec!["-h".to_string(), host, "-P".to_string(), port];
                if !user.is_empty() {
                    args.push(format!("-u{}", user));
                }
                args.extend(["-N".to_string(), "-B".to_string()]);
                args
            }
            DialectKind::Sqlite => vec![
                "-batch".to_string(),
                "-bail".to_string(),
                "-separator".to_string(),
                delimiter,
                endpoint.database.clone(),
                query.to_string(),
            ],
        },
    };

    let (program, args) = match endpoint.wrapper.split_first() {
        Some((first, rest)) => {
            let mut all: Vec<String> = rest.to_vec();
            all.push(endpoint.program().to_string());
            all.extend(args);
            (first.clone(), all)
        }
        None => (endpoint.program().to_string(), args),
    };

    Invocation {
        program,
        args,
        env,
        stdin,
    }
}

#[async_trait]
impl DataSource for CommandDataSource {
    async fn execute(
        &self,
        target: &ConnectionTarget,
        query: &str,
        options: &ExecOptions,
    ) -> QueryOutput {
        let Some(endpoint) = self.endpoint(&target.name) else {
            return QueryOutput::failure(format!("Error: unknown endpoint '{}'", target.name));
        };
        let invocation = build_invocation(endpoint, query, options);
        debug!(
            "{} -> {} ({} bytes of SQL)",
            target.name,
            invocation.program,
            query.len()
        );
        self.run(invocation, options).await
    }

    async fn list_tables(&self, target: &ConnectionTarget, schema: &str) -> Result<Vec<String>> {
        if target.dialect != DialectKind::Mssql {
            return Err(FanoutError::Config(format!(
                "listing tables is only supported on mssql endpoints, '{}' is {}",
                target.name, target.dialect
            )));
        }
        let query = format!(
            "SET NOCOUNT ON; SELECT name FROM sys.tables WHERE SCHEMA_NAME(schema_id) = N'{}' ORDER BY name;",
            escape_single_quotes(schema)
        );
        let options = ExecOptions::new(self.catalog_timeout);
        let output = self.execute(target, &query, &options).await;
        if !output.is_success() {
            return Err(FanoutError::execution(&target.name, output.diagnostic()));
        }
        Ok(first_column(&output.text, options.field_delimiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(dialect: DialectKind) -> EndpointConfig {
        EndpointConfig {
            dialect,
            host: Some("db".into()),
            port: None,
            database: "AdventureWorks2022".into(),
            user: Some("sa".into()),
            password: Some("pw".into()),
            wrapper: vec![],
            program: None,
            args: None,
        }
    }

    #[test]
    fn test_mssql_invocation() {
        let inv = build_invocation(&endpoint(DialectKind::Mssql), "SELECT 1", &ExecOptions::default());
        assert_eq!(inv.program, "sqlcmd");
        assert_eq!(&inv.args[..2], &["-S".to_string(), "db,1433".to_string()]);
        let q = inv.args.iter().position(|a| a == "-Q").unwrap();
        assert_eq!(inv.args[q + 1], "SELECT 1");
        let s = inv.args.iter().position(|a| a == "-s").unwrap();
        assert_eq!(inv.args[s + 1], "\t");
        assert!(inv.args.contains(&"-b".to_string()));
        assert!(inv.args.contains(&"-x".to_string()));
        assert!(inv.stdin.is_none());
    }

    #[test]
    fn test_mssql_values_are_not_expanded() {
        let insert = "INSERT INTO [dbo].[Notes] ([Body]) VALUES (N'cost $(amount)');";
        let inv = build_invocation(&endpoint(DialectKind::Mssql), insert, &ExecOptions::default());
        let q = inv.args.iter().position(|a| a == "-Q").unwrap();
        assert_eq!(inv.args[q + 1], insert);
        assert!(inv.args.contains(&"-x".to_string()));
    }

    #[test]
    fn test_mysql_reads_query_from_stdin() {
        let inv = build_invocation(&endpoint(DialectKind::Mysql), "SELECT 1;", &ExecOptions::default());
        assert_eq!(inv.program, "mysql");
        assert_eq!(inv.stdin.as_deref(), Some("SELECT 1;"));
        assert!(!inv.args.iter().any(|a| a.contains("SELECT")));
        assert!(inv.env.contains(&("MYSQL_PWD".to_string(), "pw".to_string())));
    }

    #[test]
    fn test_postgres_password_in_env() {
        let inv = build_invocation(&endpoint(DialectKind::Postgres), "SELECT 1;", &ExecOptions::default());
        assert_eq!(inv.program, "psql");
        assert!(inv.env.contains(&("PGPASSWORD".to_string(), "pw".to_string())));
        assert_eq!(inv.args.last().map(String::as_str), Some("SELECT 1;"));
    }

    #[test]
    fn test_wrapper_prefixes_program() {
        let mut ep = endpoint(DialectKind::Sqlite);
        ep.wrapper = vec!["docker".into(), "exec".into(), "-i".into(), "box".into()];
        let inv = build_invocation(&ep, "SELECT 1;", &ExecOptions::default());
        assert_eq!(inv.program, "docker");
        assert_eq!(&inv.args[..4], &["exec", "-i", "box", "sqlite3"]);
    }

    #[test]
    fn test_args_template() {
        let mut ep = endpoint(DialectKind::Mssql);
        ep.program = Some("/opt/mssql-tools18/bin/sqlcmd".into());
        ep.args = Some(vec!["-d".into(), "{database}".into(), "-Q".into(), "{query}".into()]);
        let inv = build_invocation(&ep, "SELECT 2", &ExecOptions::default());
        assert_eq!(inv.program, "/opt/mssql-tools18/bin/sqlcmd");
        assert_eq!(inv.args, vec!["-d", "AdventureWorks2022", "-Q", "SELECT 2"]);
        assert!(inv.stdin.is_none());

        ep.args = Some(vec!["{database}".into()]);
        let inv = build_invocation(&ep, "SELECT 3", &ExecOptions::default());
        assert_eq!(inv.stdin.as_deref(), Some("SELECT 3"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_status_one() {
        let mut ep = endpoint(DialectKind::Sqlite);
        ep.program = Some("definitely-not-a-real-client-binary".into());
        let mut endpoints = BTreeMap::new();
        endpoints.insert("lite".to_string(), ep);
        let source = CommandDataSource::new(endpoints, Duration::from_secs(5));
        let target = ConnectionTarget::new("lite", DialectKind::Sqlite, "x.db");

        let out = source
            .execute(&target, "SELECT 1;", &ExecOptions::default())
            .await;
        assert_eq!(out.status, 1);
        assert!(out.text.starts_with("Error:"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stalled_stdin_reader_times_out() {
        let source = CommandDataSource::new(BTreeMap::new(), Duration::from_secs(5));
        let invocation = Invocation {
            program: "sleep".into(),
            args: vec!["30".into()],
            env: vec![],
            stdin: Some("x".repeat(1 << 20)),
        };
        let options = ExecOptions::new(Duration::from_millis(200));

        let start = std::time::Instant::now();
        let out = source.run(invocation, &options).await;
        assert_eq!(out.status, 1);
        assert_eq!(out.text, "Timeout");
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_status_one() {
        let source = CommandDataSource::new(BTreeMap::new(), Duration::from_secs(5));
        let target = ConnectionTarget::new("ghost", DialectKind::Postgres, "db");
        let out = source.execute(&target, "SELECT 1;", &ExecOptions::default()).await;
        assert!(!out.is_success());
    }

    #[tokio::test]
    async fn test_list_tables_requires_mssql() {
        let source = CommandDataSource::new(BTreeMap::new(), Duration::from_secs(5));
        let target = ConnectionTarget::new("pg", DialectKind::Postgres, "db");
        assert!(source.list_tables(&target, "Person").await.is_err());
    }
}
