//! Source type catalog.
//!
//! [`TypeCatalog::resolve`] turns a SQL Server column type into the type
//! declaration used by one target dialect. Dispatch is on [`SourceType`]
//! variants inside one [`TypeMapper`] per dialect (see [`mappers`]), so there
//! is no string-keyed lookup and every source type is handled for every
//! target. Resolution is pure and total: unknown types fall back to the
//! dialect's unbounded text type.

pub mod mappers;

pub use mappers::{
    MssqlToMssqlMapper, MssqlToMysqlMapper, MssqlToPostgresMapper, MssqlToSqliteMapper,
};

use crate::core::schema::{ColumnDefinition, SourceType};
use crate::core::traits::TypeMapper;
use crate::dialect::DialectKind;

/// How a rendered target type stores its values.
///
/// The DDL builder uses this to decide whether a key column fits the
/// target's index entry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Fixed-size scalar (numbers, dates, booleans, uuids).
    Scalar,
    /// Length-qualified character type, length in characters.
    Chars(i64),
    /// Length-qualified binary type, length in bytes.
    Bytes(i64),
    /// Unbounded text.
    LongText,
    /// Unbounded binary.
    LongBinary,
}

/// A rendered target type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTypeDecl {
    /// Type text as it appears in `CREATE TABLE`.
    pub sql: String,

    /// Storage shape of the rendered type.
    pub storage: Storage,

    /// Set when the mapping cannot preserve every source value exactly.
    pub warning: Option<String>,
}

impl TargetTypeDecl {
    /// Create a lossless type declaration.
    pub fn lossless(sql: impl Into<String>, storage: Storage) -> Self {
        Self {
            sql: sql.into(),
            storage,
            warning: None,
        }
    }

    /// Create a lossy type declaration with a warning.
    pub fn lossy(sql: impl Into<String>, storage: Storage, warning: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            storage,
            warning: Some(warning.into()),
        }
    }

    pub fn is_lossy(&self) -> bool {
        self.warning.is_some()
    }
}

static POSTGRES: MssqlToPostgresMapper = MssqlToPostgresMapper;
static MYSQL: MssqlToMysqlMapper = MssqlToMysqlMapper;
static SQLITE: MssqlToSqliteMapper = MssqlToSqliteMapper;
static MSSQL: MssqlToMssqlMapper = MssqlToMssqlMapper;

/// Entry point for type resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCatalog;

impl TypeCatalog {
    /// The mapper for one target dialect.
    pub fn mapper(dialect: DialectKind) -> &'static dyn TypeMapper {
        match dialect {
            DialectKind::Postgres => &POSTGRES,
            DialectKind::Mysql => &MYSQL,
            DialectKind::Sqlite => &SQLITE,
            DialectKind::Mssql => &MSSQL,
        }
    }

    /// Resolve a source type with its length, precision and scale.
    pub fn resolve(
        source_type: &SourceType,
        max_length: Option<i64>,
        precision: Option<i64>,
        scale: Option<i64>,
        dialect: DialectKind,
    ) -> TargetTypeDecl {
        let mut col = ColumnDefinition::new("", source_type.clone());
        col.max_length = max_length;
        col.precision = precision;
        col.scale = scale;
        Self::mapper(dialect).map_column(&col)
    }

    /// Resolve the type of a column.
    pub fn resolve_column(col: &ColumnDefinition, dialect: DialectKind) -> TargetTypeDecl {
        Self::mapper(dialect).map_column(col)
    }
}

/// Render `NAME(p,s)`, `NAME(p)` or `NAME` from optional precision and scale.
pub(crate) fn exact_numeric(name: &str, precision: Option<i64>, scale: Option<i64>) -> String {
    match (precision.filter(|p| *p > 0), scale) {
        (Some(p), Some(s)) => format!("{}({},{})", name, p, s),
        (Some(p), None) => format!("{}({})", name, p),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_source_type() -> Vec<SourceType> {
        [
            "tinyint", "smallint", "int", "bigint", "bit", "decimal", "numeric", "money",
            "smallmoney", "float", "real", "date", "time", "datetime", "datetime2",
            "smalldatetime", "datetimeoffset", "char", "varchar", "nchar", "nvarchar", "text",
            "ntext", "xml", "uniqueidentifier", "hierarchyid", "binary", "varbinary", "image",
            "timestamp", "sql_variant", "geometry", "geography", "cursor",
        ]
        .iter()
        .map(|name| SourceType::parse(name))
        .collect()
    }

    #[test]
    fn test_resolve_is_total_and_deterministic() {
        let lengths = [None, Some(-1), Some(0), Some(1), Some(50), Some(4000), Some(100_000)];
        for dialect in DialectKind::ALL {
            for ty in every_source_type() {
                for len in lengths {
                    let first = TypeCatalog::resolve(&ty, len, Some(18), Some(2), dialect);
                    let second = TypeCatalog::resolve(&ty, len, Some(18), Some(2), dialect);
                    assert!(!first.sql.is_empty(), "{} -> {}", ty, dialect);
                    assert_eq!(first, second);
                }
            }
        }
    }

    #[test]
    fn test_unknown_type_falls_back_to_unbounded_text() {
        let ty = SourceType::parse("cursor");
        assert_eq!(TypeCatalog::resolve(&ty, None, None, None, DialectKind::Postgres).sql, "TEXT");
        assert_eq!(TypeCatalog::resolve(&ty, None, None, None, DialectKind::Mysql).sql, "LONGTEXT");
        assert_eq!(TypeCatalog::resolve(&ty, None, None, None, DialectKind::Sqlite).sql, "TEXT");
        assert_eq!(
            TypeCatalog::resolve(&ty, None, None, None, DialectKind::Mssql).sql,
            "NVARCHAR(MAX)"
        );
    }

    #[test]
    fn test_exact_numeric_rendering() {
        assert_eq!(exact_numeric("NUMERIC", Some(18), Some(2)), "NUMERIC(18,2)");
        assert_eq!(exact_numeric("NUMERIC", Some(18), Some(0)), "NUMERIC(18,0)");
        assert_eq!(exact_numeric("NUMERIC", Some(18), None), "NUMERIC(18)");
        assert_eq!(exact_numeric("NUMERIC", None, Some(2)), "NUMERIC");
        assert_eq!(exact_numeric("NUMERIC", None, None), "NUMERIC");
    }

    #[test]
    fn test_resolve_column_uses_column_shape() {
        let col = ColumnDefinition::new("Name", SourceType::NVarChar).with_length(50);
        assert_eq!(
            TypeCatalog::resolve_column(&col, DialectKind::Postgres).sql,
            "VARCHAR(50)"
        );
        assert_eq!(
            TypeCatalog::resolve_column(&col, DialectKind::Mysql).sql,
            "VARCHAR(200)"
        );
    }
}
