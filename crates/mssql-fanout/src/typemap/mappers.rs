//! Type mapper implementations, one per target dialect.
//!
//! Every mapper reads SQL Server column metadata. Lengths come from
//! `INFORMATION_SCHEMA.COLUMNS`, so character lengths are in characters and
//! `-1` means `(MAX)`.

use crate::core::schema::{ColumnDefinition, SourceType};
use crate::core::traits::TypeMapper;
use crate::dialect::DialectKind;

use super::{exact_numeric, Storage, TargetTypeDecl};

/// PostgreSQL's hard cap on `varchar(n)` / `char(n)`.
const PG_MAX_CHAR_LENGTH: i64 = 10_485_760;

/// MySQL row-size cap, also the largest `VARCHAR`/`VARBINARY` we emit.
const MYSQL_MAX_FIELD_WIDTH: i64 = 65_535;

/// Largest MySQL `CHAR`/`BINARY` length.
const MYSQL_MAX_FIXED_WIDTH: i64 = 255;

/// Worst-case utf8mb4 widening for double-byte source types.
const MYSQL_WIDE_FACTOR: i64 = 4;

/// SQL Server limits for non-MAX lengths.
const MSSQL_MAX_BYTES: i64 = 8_000;
const MSSQL_MAX_WIDE_CHARS: i64 = 4_000;

fn bounded(col: &ColumnDefinition) -> Option<i64> {
    if col.is_unbounded() {
        None
    } else {
        col.max_length
    }
}

/// MSSQL → PostgreSQL type mapper.
///
/// Handles type conversions when migrating from Microsoft SQL Server to
/// PostgreSQL. Textual stand-ins are used for xml, hierarchyid and spatial
/// types.
#[derive(Debug, Clone, Default)]
pub struct MssqlToPostgresMapper;

impl TypeMapper for MssqlToPostgresMapper {
    fn target(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn map_column(&self, col: &ColumnDefinition) -> TargetTypeDecl {
        mssql_to_postgres(col)
    }
}

fn mssql_to_postgres(col: &ColumnDefinition) -> TargetTypeDecl {
    use SourceType::*;
    let text = || TargetTypeDecl::lossless("TEXT", Storage::LongText);

    match &col.source_type {
        TinyInt | SmallInt => TargetTypeDecl::lossless("SMALLINT", Storage::Scalar),
        Int => TargetTypeDecl::lossless("INTEGER", Storage::Scalar),
        BigInt => TargetTypeDecl::lossless("BIGINT", Storage::Scalar),
        Bit => TargetTypeDecl::lossless("BOOLEAN", Storage::Scalar),

        Decimal | Numeric => TargetTypeDecl::lossless(
            exact_numeric("NUMERIC", col.precision, col.scale),
            Storage::Scalar,
        ),
        Money => TargetTypeDecl::lossless("NUMERIC(19,4)", Storage::Scalar),
        SmallMoney => TargetTypeDecl::lossless("NUMERIC(10,4)", Storage::Scalar),
        Float => TargetTypeDecl::lossless("DOUBLE PRECISION", Storage::Scalar),
        Real => TargetTypeDecl::lossless("REAL", Storage::Scalar),

        Date => TargetTypeDecl::lossless("DATE", Storage::Scalar),
        Time => TargetTypeDecl::lossless("TIME", Storage::Scalar),
        DateTime | DateTime2 | SmallDateTime => {
            TargetTypeDecl::lossless("TIMESTAMP", Storage::Scalar)
        }
        DateTimeOffset => TargetTypeDecl::lossless("TIMESTAMPTZ", Storage::Scalar),

        Char | NChar | VarChar | NVarChar => match bounded(col) {
            Some(len) if len <= PG_MAX_CHAR_LENGTH => {
                let name = if matches!(col.source_type, Char | NChar) {
                    "CHAR"
                } else {
                    "VARCHAR"
                };
                TargetTypeDecl::lossless(format!("{}({})", name, len), Storage::Chars(len))
            }
            _ => text(),
        },
        Text | NText => text(),

        Xml => TargetTypeDecl::lossy("TEXT", Storage::LongText, "xml stored as TEXT"),
        // Native on PostgreSQL; textual elsewhere except mssql.
        UniqueIdentifier => TargetTypeDecl::lossless("UUID", Storage::Scalar),
        HierarchyId => {
            TargetTypeDecl::lossy("TEXT", Storage::LongText, "hierarchyid stored as its path text")
        }

        Binary | VarBinary | Image => TargetTypeDecl::lossless("BYTEA", Storage::LongBinary),
        RowVersion => TargetTypeDecl::lossy(
            "BYTEA",
            Storage::LongBinary,
            "rowversion copied as plain bytes",
        ),

        SqlVariant | Geometry | Geography => TargetTypeDecl::lossy(
            "TEXT",
            Storage::LongText,
            format!("{} stored as TEXT", col.source_type),
        ),
        Other(name) => TargetTypeDecl::lossy(
            "TEXT",
            Storage::LongText,
            format!("unknown type '{}' stored as TEXT", name),
        ),
    }
}

/// MSSQL → MySQL type mapper.
///
/// Lengths of double-byte types are widened to utf8mb4 byte counts. Anything
/// that would exceed the row-size cap becomes `LONGTEXT`/`LONGBLOB`.
#[derive(Debug, Clone, Default)]
pub struct MssqlToMysqlMapper;

impl TypeMapper for MssqlToMysqlMapper {
    fn target(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn map_column(&self, col: &ColumnDefinition) -> TargetTypeDecl {
        mssql_to_mysql(col)
    }
}

fn mssql_to_mysql(col: &ColumnDefinition) -> TargetTypeDecl {
    use SourceType::*;
    let long_text = || TargetTypeDecl::lossless("LONGTEXT", Storage::LongText);
    let long_blob = || TargetTypeDecl::lossless("LONGBLOB", Storage::LongBinary);

    match &col.source_type {
        TinyInt => TargetTypeDecl::lossless("TINYINT UNSIGNED", Storage::Scalar),
        SmallInt => TargetTypeDecl::lossless("SMALLINT", Storage::Scalar),
        Int => TargetTypeDecl::lossless("INT", Storage::Scalar),
        BigInt => TargetTypeDecl::lossless("BIGINT", Storage::Scalar),
        Bit => TargetTypeDecl::lossless("TINYINT(1)", Storage::Scalar),

        Decimal | Numeric => TargetTypeDecl::lossless(
            exact_numeric("DECIMAL", col.precision, col.scale),
            Storage::Scalar,
        ),
        Money => TargetTypeDecl::lossless("DECIMAL(19,4)", Storage::Scalar),
        SmallMoney => TargetTypeDecl::lossless("DECIMAL(10,4)", Storage::Scalar),
        Float => TargetTypeDecl::lossless("DOUBLE", Storage::Scalar),
        Real => TargetTypeDecl::lossless("FLOAT", Storage::Scalar),

        Date => TargetTypeDecl::lossless("DATE", Storage::Scalar),
        Time => TargetTypeDecl::lossless("TIME", Storage::Scalar),
        DateTime | SmallDateTime => TargetTypeDecl::lossless("DATETIME", Storage::Scalar),
        DateTime2 => TargetTypeDecl::lossless("DATETIME(6)", Storage::Scalar),
        DateTimeOffset => TargetTypeDecl::lossy(
            "VARCHAR(40)",
            Storage::Chars(40),
            "datetimeoffset stored as text with its offset",
        ),

        Char | NChar | VarChar | NVarChar => {
            let Some(len) = bounded(col) else {
                return long_text();
            };
            let width = if col.source_type.is_wide() {
                len * MYSQL_WIDE_FACTOR
            } else {
                len
            };
            let fixed = matches!(col.source_type, Char | NChar);
            if fixed && width <= MYSQL_MAX_FIXED_WIDTH {
                TargetTypeDecl::lossless(format!("CHAR({})", width), Storage::Chars(width))
            } else if width <= MYSQL_MAX_FIELD_WIDTH {
                TargetTypeDecl::lossless(format!("VARCHAR({})", width), Storage::Chars(width))
            } else {
                long_text()
            }
        }
        Text | NText => long_text(),

        Xml => TargetTypeDecl::lossy("LONGTEXT", Storage::LongText, "xml stored as LONGTEXT"),
        UniqueIdentifier => TargetTypeDecl::lossless("CHAR(36)", Storage::Chars(36)),
        HierarchyId => TargetTypeDecl::lossy(
            "VARCHAR(892)",
            Storage::Chars(892),
            "hierarchyid stored as its path text",
        ),

        Binary => match bounded(col) {
            Some(len) if len <= MYSQL_MAX_FIXED_WIDTH => {
                TargetTypeDecl::lossless(format!("BINARY({})", len), Storage::Bytes(len))
            }
            Some(len) if len <= MYSQL_MAX_FIELD_WIDTH => {
                TargetTypeDecl::lossless(format!("VARBINARY({})", len), Storage::Bytes(len))
            }
            _ => long_blob(),
        },
        VarBinary => match bounded(col) {
            Some(len) if len <= MYSQL_MAX_FIELD_WIDTH => {
                TargetTypeDecl::lossless(format!("VARBINARY({})", len), Storage::Bytes(len))
            }
            _ => long_blob(),
        },
        Image => long_blob(),
        RowVersion => TargetTypeDecl::lossy(
            "BINARY(8)",
            Storage::Bytes(8),
            "rowversion copied as plain bytes",
        ),

        SqlVariant | Geometry | Geography => TargetTypeDecl::lossy(
            "LONGTEXT",
            Storage::LongText,
            format!("{} stored as LONGTEXT", col.source_type),
        ),
        Other(name) => TargetTypeDecl::lossy(
            "LONGTEXT",
            Storage::LongText,
            format!("unknown type '{}' stored as LONGTEXT", name),
        ),
    }
}

/// MSSQL → SQLite type mapper.
///
/// SQLite only has storage classes, so lengths and precision are dropped.
#[derive(Debug, Clone, Default)]
pub struct MssqlToSqliteMapper;

impl TypeMapper for MssqlToSqliteMapper {
    fn target(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn map_column(&self, col: &ColumnDefinition) -> TargetTypeDecl {
        mssql_to_sqlite(col)
    }
}

fn mssql_to_sqlite(col: &ColumnDefinition) -> TargetTypeDecl {
    use SourceType::*;

    match &col.source_type {
        TinyInt | SmallInt | Int | BigInt | Bit => {
            TargetTypeDecl::lossless("INTEGER", Storage::Scalar)
        }
        Decimal | Numeric | Money | SmallMoney => TargetTypeDecl::lossy(
            "REAL",
            Storage::Scalar,
            format!("{} stored as floating point", col.source_type),
        ),
        Float | Real => TargetTypeDecl::lossless("REAL", Storage::Scalar),
        Binary | VarBinary | Image | RowVersion => {
            TargetTypeDecl::lossless("BLOB", Storage::LongBinary)
        }
        _ => TargetTypeDecl::lossless("TEXT", Storage::LongText),
    }
}

/// MSSQL → MSSQL type mapper.
///
/// Re-renders the source type. Types that travel through the text transport
/// as strings (xml, hierarchyid, spatial, sql_variant) land in `NVARCHAR`.
#[derive(Debug, Clone, Default)]
pub struct MssqlToMssqlMapper;

impl TypeMapper for MssqlToMssqlMapper {
    fn target(&self) -> DialectKind {
        DialectKind::Mssql
    }

    fn map_column(&self, col: &ColumnDefinition) -> TargetTypeDecl {
        mssql_to_mssql(col)
    }
}

fn mssql_to_mssql(col: &ColumnDefinition) -> TargetTypeDecl {
    use SourceType::*;
    let nvarchar_max = || TargetTypeDecl::lossless("NVARCHAR(MAX)", Storage::LongText);
    let scalar = |name: &str| TargetTypeDecl::lossless(name, Storage::Scalar);

    match &col.source_type {
        TinyInt => scalar("TINYINT"),
        SmallInt => scalar("SMALLINT"),
        Int => scalar("INT"),
        BigInt => scalar("BIGINT"),
        Bit => scalar("BIT"),

        Decimal => scalar(&exact_numeric("DECIMAL", col.precision, col.scale)),
        Numeric => scalar(&exact_numeric("NUMERIC", col.precision, col.scale)),
        Money => scalar("MONEY"),
        SmallMoney => scalar("SMALLMONEY"),
        Float => scalar("FLOAT"),
        Real => scalar("REAL"),

        Date => scalar("DATE"),
        Time => scalar("TIME"),
        DateTime => scalar("DATETIME"),
        DateTime2 => scalar("DATETIME2"),
        SmallDateTime => scalar("SMALLDATETIME"),
        DateTimeOffset => scalar("DATETIMEOFFSET"),

        Char | VarChar | NChar | NVarChar => {
            let wide = col.source_type.is_wide();
            let limit = if wide { MSSQL_MAX_WIDE_CHARS } else { MSSQL_MAX_BYTES };
            let var_name = if wide { "NVARCHAR" } else { "VARCHAR" };
            match bounded(col) {
                Some(len) if len <= limit => {
                    let name = match col.source_type {
                        Char => "CHAR",
                        NChar => "NCHAR",
                        _ => var_name,
                    };
                    TargetTypeDecl::lossless(format!("{}({})", name, len), Storage::Chars(len))
                }
                _ => TargetTypeDecl::lossless(format!("{}(MAX)", var_name), Storage::LongText),
            }
        }
        Text => TargetTypeDecl::lossless("VARCHAR(MAX)", Storage::LongText),
        NText => nvarchar_max(),

        Xml => TargetTypeDecl::lossy("NVARCHAR(MAX)", Storage::LongText, "xml stored as text"),
        UniqueIdentifier => scalar("UNIQUEIDENTIFIER"),
        HierarchyId => TargetTypeDecl::lossy(
            "NVARCHAR(892)",
            Storage::Chars(892),
            "hierarchyid stored as its path text",
        ),

        Binary | VarBinary => {
            let name = if col.source_type == Binary {
                "BINARY"
            } else {
                "VARBINARY"
            };
            match bounded(col) {
                Some(len) if len <= MSSQL_MAX_BYTES => {
                    TargetTypeDecl::lossless(format!("{}({})", name, len), Storage::Bytes(len))
                }
                _ => TargetTypeDecl::lossless("VARBINARY(MAX)", Storage::LongBinary),
            }
        }
        Image => TargetTypeDecl::lossless("VARBINARY(MAX)", Storage::LongBinary),
        RowVersion => TargetTypeDecl::lossy(
            "BINARY(8)",
            Storage::Bytes(8),
            "rowversion copied as plain bytes",
        ),

        SqlVariant | Geometry | Geography => TargetTypeDecl::lossy(
            "NVARCHAR(MAX)",
            Storage::LongText,
            format!("{} stored as text", col.source_type),
        ),
        Other(name) => TargetTypeDecl::lossy(
            "NVARCHAR(MAX)",
            Storage::LongText,
            format!("unknown type '{}' stored as text", name),
        ),
    }
}
