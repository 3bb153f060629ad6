//! Source schema introspection.
//!
//! A table is described by four catalog queries against the source:
//! column attributes, primary-key membership, identity membership and
//! computed-column membership. The results are joined on column name into
//! [`ColumnDefinition`]s in declaration order. Computed columns are removed.
//!
//! Metadata arrives as delimited text, so a row can be malformed. Such a row
//! is dropped instead of failing the whole table, and every drop goes to the
//! injected [`DropReporter`].

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::identifier::{escape_single_quotes, quote_bracket};
use crate::core::schema::{ColumnDefinition, SourceType, TableSpec};
use crate::error::{FanoutError, Result};
use crate::source::output::{first_column, metadata_rows, parse_count};
use crate::source::{ConnectionTarget, DataSource, ExecOptions};

/// Field delimiter used for metadata queries.
const METADATA_DELIMITER: char = ',';

/// Receives metadata rows the introspector could not use.
pub trait DropReporter: Send + Sync {
    fn column_dropped(&self, table: &str, raw: &str, reason: &str);
}

/// Default reporter: one warning per dropped row.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl DropReporter for TracingReporter {
    fn column_dropped(&self, table: &str, raw: &str, reason: &str) {
        warn!("{}: dropped column metadata {:?}: {}", table, raw, reason);
    }
}

/// Reads table metadata from the source.
#[derive(Clone)]
pub struct SchemaIntrospector {
    source: Arc<dyn DataSource>,
    reporter: Arc<dyn DropReporter>,
    options: ExecOptions,
}

impl SchemaIntrospector {
    pub fn new(source: Arc<dyn DataSource>, options: ExecOptions) -> Self {
        Self {
            source,
            reporter: Arc::new(TracingReporter),
            options,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn DropReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Column definitions of `schema.table`, in declaration order.
    ///
    /// Returns an empty vector when the table has no visible columns. Fails
    /// only when the column query itself fails.
    pub async fn describe(
        &self,
        target: &ConnectionTarget,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnDefinition>> {
        let full_name = format!("{}.{}", schema, table);
        let options = self.options.clone().with_delimiter(METADATA_DELIMITER);

        let columns = self
            .source
            .execute(target, &columns_query(schema, table), &options)
            .await;
        if !columns.is_success() {
            return Err(FanoutError::introspection(&full_name, columns.diagnostic()));
        }

        let pk = self
            .name_set(target, &full_name, "primary key", &primary_key_query(schema, table), &options)
            .await;
        let identity = self
            .name_set(
                target,
                &full_name,
                "identity",
                &column_property_query(schema, table, "IsIdentity"),
                &options,
            )
            .await;
        let computed = self
            .name_set(
                target,
                &full_name,
                "computed",
                &column_property_query(schema, table, "IsComputed"),
                &options,
            )
            .await;

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for fields in metadata_rows(&columns.text, METADATA_DELIMITER) {
            let raw = fields.join(",");
            let col = match parse_column(&fields) {
                Ok(col) => col,
                Err(reason) => {
                    self.reporter.column_dropped(&full_name, &raw, &reason);
                    continue;
                }
            };
            if !seen.insert(col.name.clone()) {
                self.reporter
                    .column_dropped(&full_name, &raw, "duplicate column name");
                continue;
            }
            if computed.contains(&col.name) {
                debug!("{}: skipping computed column {}", full_name, col.name);
                continue;
            }

            let mut col = col;
            if pk.contains(&col.name) {
                col = col.primary_key();
            }
            if identity.contains(&col.name) {
                col = col.identity();
            }
            result.push(col);
        }

        debug!("{}: {} columns", full_name, result.len());
        Ok(result)
    }

    /// Describe a table into a [`TableSpec`].
    pub async fn describe_table(
        &self,
        target: &ConnectionTarget,
        schema: &str,
        table: &str,
    ) -> Result<TableSpec> {
        let columns = self.describe(target, schema, table).await?;
        Ok(TableSpec::new(schema, table, columns))
    }

    /// Row count of a source table.
    pub async fn row_count(
        &self,
        target: &ConnectionTarget,
        schema: &str,
        table: &str,
    ) -> Result<u64> {
        let query = format!(
            "SET NOCOUNT ON; SELECT COUNT(*) FROM {}.{};",
            quote_bracket(schema),
            quote_bracket(table)
        );
        let output = self.source.execute(target, &query, &self.options).await;
        let full_name = format!("{}.{}", schema, table);
        if !output.is_success() {
            return Err(FanoutError::introspection(full_name, output.diagnostic()));
        }
        parse_count(&output.text).ok_or_else(|| {
            FanoutError::introspection(full_name, format!("unreadable row count: {}", output.diagnostic()))
        })
    }

    /// Base tables of a source schema.
    pub async fn list_tables(&self, target: &ConnectionTarget, schema: &str) -> Result<Vec<String>> {
        self.source.list_tables(target, schema).await
    }

    /// Names from a single-column membership query. A failed query yields
    /// an empty set.
    async fn name_set(
        &self,
        target: &ConnectionTarget,
        table: &str,
        what: &str,
        query: &str,
        options: &ExecOptions,
    ) -> HashSet<String> {
        let output = self.source.execute(target, query, options).await;
        if !output.is_success() {
            warn!(
                "{}: {} metadata query failed, assuming none: {}",
                table,
                what,
                output.diagnostic()
            );
            return HashSet::new();
        }
        first_column(&output.text, METADATA_DELIMITER)
            .into_iter()
            .collect()
    }
}

fn columns_query(schema: &str, table: &str) -> String {
    format!(
        "SET NOCOUNT ON; SELECT c.COLUMN_NAME, c.DATA_TYPE, c.IS_NULLABLE, c.CHARACTER_MAXIMUM_LENGTH, \
         c.NUMERIC_PRECISION, c.NUMERIC_SCALE FROM INFORMATION_SCHEMA.COLUMNS c \
         WHERE c.TABLE_SCHEMA = N'{}' AND c.TABLE_NAME = N'{}' ORDER BY c.ORDINAL_POSITION;",
        escape_single_quotes(schema),
        escape_single_quotes(table)
    )
}

fn primary_key_query(schema: &str, table: &str) -> String {
    format!(
        "SET NOCOUNT ON; SELECT ku.COLUMN_NAME FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
         INNER JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku \
         ON tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME \
         AND tc.TABLE_SCHEMA = ku.TABLE_SCHEMA \
         WHERE ku.TABLE_SCHEMA = N'{}' AND ku.TABLE_NAME = N'{}' ORDER BY ku.ORDINAL_POSITION;",
        escape_single_quotes(schema),
        escape_single_quotes(table)
    )
}

fn column_property_query(schema: &str, table: &str, property: &str) -> String {
    let object = format!("{}.{}", quote_bracket(schema), quote_bracket(table));
    format!(
        "SET NOCOUNT ON; SELECT c.COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS c \
         WHERE c.TABLE_SCHEMA = N'{}' AND c.TABLE_NAME = N'{}' \
         AND COLUMNPROPERTY(OBJECT_ID(N'{}'), c.COLUMN_NAME, '{}') = 1;",
        escape_single_quotes(schema),
        escape_single_quotes(table),
        escape_single_quotes(&object),
        property
    )
}

/// Parse an optional integer metadata field; `NULL` and blank are absent.
fn optional_int(field: &str, what: &str) -> std::result::Result<Option<i64>, String> {
    if field.is_empty() || field.eq_ignore_ascii_case("NULL") {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|_| format!("{} is not a number: {:?}", what, field))
}

/// Build a column from the six column-attribute fields.
fn parse_column(fields: &[String]) -> std::result::Result<ColumnDefinition, String> {
    if fields.len() != 6 {
        return Err(format!("expected 6 fields, got {}", fields.len()));
    }
    let name = fields[0].as_str();
    if name.is_empty() {
        return Err("empty column name".to_string());
    }
    if fields[1].is_empty() {
        return Err("empty data type".to_string());
    }
    let nullable = match fields[2].to_uppercase().as_str() {
        "YES" => true,
        "NO" => false,
        other => return Err(format!("unexpected IS_NULLABLE value {:?}", other)),
    };

    let mut col = ColumnDefinition::new(name, SourceType::parse(&fields[1]));
    col.nullable = nullable;
    col.max_length = optional_int(&fields[3], "length")?;
    col.precision = optional_int(&fields[4], "precision")?;
    col.scale = optional_int(&fields[5], "scale")?;
    Ok(col)
}
