//! Query execution seam.
//!
//! Every interaction with a database (metadata, DDL, DML, counts) goes
//! through [`DataSource::execute`], which returns the client's text output and
//! a status code. A non-zero status means failure and the text carries the
//! diagnostic. [`command::CommandDataSource`] implements this by running the
//! engine's command-line client.

pub mod command;
pub mod output;

pub use command::CommandDataSource;

use std::time::Duration;

use async_trait::async_trait;

use crate::dialect::DialectKind;
use crate::error::Result;

/// A named database endpoint as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Endpoint name from the configuration.
    pub name: String,

    /// Engine behind the endpoint.
    pub dialect: DialectKind,

    /// Database name, or the database file for sqlite.
    pub database: String,
}

impl ConnectionTarget {
    pub fn new(name: impl Into<String>, dialect: DialectKind, database: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dialect,
            database: database.into(),
        }
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Abandon the call after this long.
    pub timeout: Duration,

    /// Field delimiter for tabular output.
    pub field_delimiter: char,

    /// Decode output byte-for-byte (Latin-1) instead of as UTF-8.
    pub binary_mode: bool,
}

impl ExecOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            field_delimiter: '\t',
            binary_mode: false,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.field_delimiter = delimiter;
        self
    }

    pub fn with_binary_mode(mut self, binary_mode: bool) -> Self {
        self.binary_mode = binary_mode;
        self
    }
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

/// Text output and status code of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutput {
    pub text: String,
    pub status: i32,
}

impl QueryOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: 0,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Leading part of the diagnostic text, for logs and outcomes.
    pub fn diagnostic(&self) -> String {
        const LIMIT: usize = 200;
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return format!("exit status {}", self.status);
        }
        match trimmed.char_indices().nth(LIMIT) {
            Some((idx, _)) => format!("{}...", &trimmed[..idx]),
            None => trimmed.to_string(),
        }
    }
}

/// Executes statements against a database endpoint.
///
/// Implementations never panic on a failed call; failures are reported as a
/// non-zero [`QueryOutput::status`].
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Run one query or statement batch.
    async fn execute(
        &self,
        target: &ConnectionTarget,
        query: &str,
        options: &ExecOptions,
    ) -> QueryOutput;

    /// List the base tables of a schema.
    async fn list_tables(&self, target: &ConnectionTarget, schema: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory data source for engine tests.

    use super::*;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&ConnectionTarget, &str) -> Option<QueryOutput> + Send + Sync>;

    /// Answers queries from an ordered list of responders and records every
    /// call. The first responder returning `Some` wins; unmatched queries
    /// succeed with empty output.
    #[derive(Default)]
    pub struct ScriptedSource {
        responders: Vec<Responder>,
        tables: Vec<String>,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond<F>(mut self, f: F) -> Self
        where
            F: Fn(&ConnectionTarget, &str) -> Option<QueryOutput> + Send + Sync + 'static,
        {
            self.responders.push(Box::new(f));
            self
        }

        /// Answer queries on `endpoint` containing `needle` with `text`.
        pub fn on(self, endpoint: &str, needle: &str, text: &str) -> Self {
            let endpoint = endpoint.to_string();
            let needle = needle.to_string();
            let text = text.to_string();
            self.respond(move |t, q| {
                (t.name == endpoint && q.contains(&needle)).then(|| QueryOutput::success(&text))
            })
        }

        /// Fail queries on `endpoint` containing `needle` with `text`.
        pub fn fail_on(self, endpoint: &str, needle: &str, text: &str) -> Self {
            let endpoint = endpoint.to_string();
            let needle = needle.to_string();
            let text = text.to_string();
            self.respond(move |t, q| {
                (t.name == endpoint && q.contains(&needle)).then(|| QueryOutput::failure(&text))
            })
        }

        pub fn with_tables(mut self, tables: &[&str]) -> Self {
            self.tables = tables.iter().map(|t| t.to_string()).collect();
            self
        }

        /// Every query sent to `endpoint`, in order.
        pub fn queries_to(&self, endpoint: &str) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(name, _)| name == endpoint)
                .map(|(_, q)| q.clone())
                .collect()
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        async fn execute(
            &self,
            target: &ConnectionTarget,
            query: &str,
            _options: &ExecOptions,
        ) -> QueryOutput {
            self.calls
                .lock()
                .unwrap()
                .push((target.name.clone(), query.to_string()));
            self.responders
                .iter()
                .find_map(|r| r(target, query))
                .unwrap_or_else(|| QueryOutput::success(""))
        }

        async fn list_tables(
            &self,
            _target: &ConnectionTarget,
            _schema: &str,
        ) -> Result<Vec<String>> {
            Ok(self.tables.clone())
        }
    }
}
