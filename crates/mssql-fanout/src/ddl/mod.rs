//! Target DDL rendering.
//!
//! Provisioning a table is always namespace creation (if the dialect has
//! namespaces), then drop-if-exists, then create. A table with a single
//! integer identity key gets the dialect's native auto-increment key folded
//! into the column; every other key becomes a trailing `PRIMARY KEY (...)`
//! clause. Dialects with a bounded index entry size get prefix lengths on
//! key columns that would not fit.

use crate::core::schema::{ColumnDefinition, TableSpec};
use crate::core::traits::Dialect;
use crate::dialect::DialectImpl;
use crate::typemap::{Storage, TargetTypeDecl, TypeCatalog};

/// `CREATE TABLE` for `spec` under its own schema name.
pub fn build_create(spec: &TableSpec, dialect: &DialectImpl) -> String {
    let folded = spec.autoincrement_column().map(|c| c.name.as_str());

    let mut lines: Vec<String> = spec
        .columns
        .iter()
        .map(|col| column_definition(col, folded == Some(col.name.as_str()), dialect))
        .collect();

    if folded.is_none() && spec.has_pk() {
        let keys: Vec<String> = spec
            .primary_key_columns()
            .into_iter()
            .map(|col| {
                let quoted = dialect.quote_ident(&col.name);
                match key_prefix(&TypeCatalog::resolve_column(col, dialect.kind()), dialect) {
                    Some(prefix) => format!("{}({})", quoted, prefix),
                    None => quoted,
                }
            })
            .collect();
        lines.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n);",
        dialect.qualify(&spec.schema_name, &spec.table_name),
        lines.join(",\n    ")
    )
}

/// Idempotent drop of the target table.
pub fn build_drop(spec: &TableSpec, dialect: &DialectImpl) -> String {
    dialect.drop_table(&dialect.qualify(&spec.schema_name, &spec.table_name))
}

/// Idempotent creation of the table's namespace, if the dialect has one.
pub fn build_create_namespace(spec: &TableSpec, dialect: &DialectImpl) -> Option<String> {
    dialect.create_namespace(&spec.schema_name)
}

/// Every statement needed to (re)provision the table, in order.
pub fn build_provision(spec: &TableSpec, dialect: &DialectImpl) -> Vec<String> {
    let mut statements = Vec::with_capacity(3);
    if let Some(ns) = build_create_namespace(spec, dialect) {
        statements.push(ns);
    }
    statements.push(build_drop(spec, dialect));
    statements.push(build_create(spec, dialect));
    statements
}

/// Columns whose target type cannot hold every source value exactly.
pub fn lossy_columns(spec: &TableSpec, dialect: &DialectImpl) -> Vec<(String, String)> {
    spec.columns
        .iter()
        .filter_map(|col| {
            TypeCatalog::resolve_column(col, dialect.kind())
                .warning
                .map(|w| (col.name.clone(), w))
        })
        .collect()
}

fn column_definition(col: &ColumnDefinition, folded_key: bool, dialect: &DialectImpl) -> String {
    let quoted = dialect.quote_ident(&col.name);
    let decl = TypeCatalog::resolve_column(col, dialect.kind());

    if folded_key {
        return dialect.autoincrement_key_definition(&quoted, &decl.sql);
    }

    let mut def = format!("{} {}", quoted, decl.sql);
    if col.is_identity {
        if let Some(suffix) = dialect.identity_column_suffix() {
            def.push(' ');
            def.push_str(suffix);
        }
    }
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    def
}

/// Prefix length for a key column that exceeds the index entry budget.
fn key_prefix(decl: &TargetTypeDecl, dialect: &DialectImpl) -> Option<usize> {
    let budget = dialect.index_key_budget()?;
    let per_char = dialect.bytes_per_char().max(1);
    match decl.storage {
        Storage::Chars(n) if n.max(0) as usize * per_char > budget => Some(budget / per_char),
        Storage::Bytes(n) if n.max(0) as usize > budget => Some(budget),
        Storage::LongText => Some(budget / per_char),
        Storage::LongBinary => Some(budget),
        _ => None,
    }
}
