//! Schema metadata types for source tables and columns.
//!
//! These types are built once per table per run by the introspector and are
//! immutable afterwards. They carry no connection state, so a `TableSpec`
//! can be handed to any number of independent transfers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Sentinel used by the source catalog for `(MAX)` lengths.
pub const UNBOUNDED_LENGTH: i64 = -1;

/// Source (SQL Server) column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Bit,
    Decimal,
    Numeric,
    Money,
    SmallMoney,
    Float,
    Real,
    Date,
    Time,
    DateTime,
    DateTime2,
    SmallDateTime,
    DateTimeOffset,
    Char,
    VarChar,
    NChar,
    NVarChar,
    Text,
    NText,
    Xml,
    UniqueIdentifier,
    HierarchyId,
    Binary,
    VarBinary,
    Image,
    /// `timestamp` / `rowversion` marker.
    RowVersion,
    SqlVariant,
    Geometry,
    Geography,
    /// Anything the catalog does not know. Treated as character data.
    Other(String),
}

/// Broad category a source type belongs to.
///
/// The serializer and the type catalog both decide behavior per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeFamily {
    Integer,
    Boolean,
    ExactNumeric,
    ApproxNumeric,
    Character,
    DateTime,
    Binary,
    /// Types with no native equivalent, rendered as text (xml, guid, path ids).
    Stringish,
}

impl SourceType {
    /// Parse a catalog type name (case-insensitive). Never fails.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "tinyint" => SourceType::TinyInt,
            "smallint" => SourceType::SmallInt,
            "int" | "integer" => SourceType::Int,
            "bigint" => SourceType::BigInt,
            "bit" => SourceType::Bit,
            "decimal" => SourceType::Decimal,
            "numeric" => SourceType::Numeric,
            "money" => SourceType::Money,
            "smallmoney" => SourceType::SmallMoney,
            "float" => SourceType::Float,
            "real" => SourceType::Real,
            "date" => SourceType::Date,
            "time" => SourceType::Time,
            "datetime" => SourceType::DateTime,
            "datetime2" => SourceType::DateTime2,
            "smalldatetime" => SourceType::SmallDateTime,
            "datetimeoffset" => SourceType::DateTimeOffset,
            "char" => SourceType::Char,
            "varchar" => SourceType::VarChar,
            "nchar" => SourceType::NChar,
            "nvarchar" => SourceType::NVarChar,
            "text" => SourceType::Text,
            "ntext" => SourceType::NText,
            "xml" => SourceType::Xml,
            "uniqueidentifier" => SourceType::UniqueIdentifier,
            "hierarchyid" => SourceType::HierarchyId,
            "binary" => SourceType::Binary,
            "varbinary" => SourceType::VarBinary,
            "image" => SourceType::Image,
            "timestamp" | "rowversion" => SourceType::RowVersion,
            "sql_variant" => SourceType::SqlVariant,
            "geometry" => SourceType::Geometry,
            "geography" => SourceType::Geography,
            other => SourceType::Other(other.to_string()),
        }
    }

    /// Catalog name of the type, as the source spells it.
    pub fn name(&self) -> &str {
        match self {
            SourceType::TinyInt => "tinyint",
            SourceType::SmallInt => "smallint",
            SourceType::Int => "int",
            SourceType::BigInt => "bigint",
            SourceType::Bit => "bit",
            SourceType::Decimal => "decimal",
            SourceType::Numeric => "numeric",
            SourceType::Money => "money",
            SourceType::SmallMoney => "smallmoney",
            SourceType::Float => "float",
            SourceType::Real => "real",
            SourceType::Date => "date",
            SourceType::Time => "time",
            SourceType::DateTime => "datetime",
            SourceType::DateTime2 => "datetime2",
            SourceType::SmallDateTime => "smalldatetime",
            SourceType::DateTimeOffset => "datetimeoffset",
            SourceType::Char => "char",
            SourceType::VarChar => "varchar",
            SourceType::NChar => "nchar",
            SourceType::NVarChar => "nvarchar",
            SourceType::Text => "text",
            SourceType::NText => "ntext",
            SourceType::Xml => "xml",
            SourceType::UniqueIdentifier => "uniqueidentifier",
            SourceType::HierarchyId => "hierarchyid",
            SourceType::Binary => "binary",
            SourceType::VarBinary => "varbinary",
            SourceType::Image => "image",
            SourceType::RowVersion => "timestamp",
            SourceType::SqlVariant => "sql_variant",
            SourceType::Geometry => "geometry",
            SourceType::Geography => "geography",
            SourceType::Other(name) => name,
        }
    }

    pub fn family(&self) -> TypeFamily {
        match self {
            SourceType::TinyInt | SourceType::SmallInt | SourceType::Int | SourceType::BigInt => {
                TypeFamily::Integer
            }
            SourceType::Bit => TypeFamily::Boolean,
            SourceType::Decimal
            | SourceType::Numeric
            | SourceType::Money
            | SourceType::SmallMoney => TypeFamily::ExactNumeric,
            SourceType::Float | SourceType::Real => TypeFamily::ApproxNumeric,
            SourceType::Date
            | SourceType::Time
            | SourceType::DateTime
            | SourceType::DateTime2
            | SourceType::SmallDateTime
            | SourceType::DateTimeOffset => TypeFamily::DateTime,
            SourceType::Char
            | SourceType::VarChar
            | SourceType::NChar
            | SourceType::NVarChar
            | SourceType::Text
            | SourceType::NText
            | SourceType::Other(_) => TypeFamily::Character,
            SourceType::Binary
            | SourceType::VarBinary
            | SourceType::Image
            | SourceType::RowVersion => TypeFamily::Binary,
            SourceType::Xml
            | SourceType::UniqueIdentifier
            | SourceType::HierarchyId
            | SourceType::SqlVariant
            | SourceType::Geometry
            | SourceType::Geography => TypeFamily::Stringish,
        }
    }

    /// Double-byte character types (`nchar`, `nvarchar`, `ntext`).
    pub fn is_wide(&self) -> bool {
        matches!(
            self,
            SourceType::NChar | SourceType::NVarChar | SourceType::NText
        )
    }

    /// Whether the source engine can use this type in `ORDER BY`.
    pub fn is_orderable(&self) -> bool {
        !matches!(
            self,
            SourceType::Xml
                | SourceType::Text
                | SourceType::NText
                | SourceType::Image
                | SourceType::Geometry
                | SourceType::Geography
        )
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name, unique within the table.
    pub name: String,

    /// Source data type.
    pub source_type: SourceType,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Maximum length for string/binary types ([`UNBOUNDED_LENGTH`] for max).
    pub max_length: Option<i64>,

    /// Numeric precision.
    pub precision: Option<i64>,

    /// Numeric scale.
    pub scale: Option<i64>,

    /// Member of the primary key.
    pub is_primary_key: bool,

    /// Identity (auto-increment) column.
    pub is_identity: bool,

    /// Computed column. Such columns are filtered out before a `TableSpec`
    /// is built.
    pub is_computed: bool,
}

impl ColumnDefinition {
    /// Create a plain nullable column of the given type.
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
            nullable: true,
            max_length: None,
            precision: None,
            scale: None,
            is_primary_key: false,
            is_identity: false,
            is_computed: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_length(mut self, max_length: i64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_precision(mut self, precision: i64, scale: Option<i64>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark the column as an identity column.
    ///
    /// Identity is only kept for integer types; anything else is logged and
    /// demoted to a plain column.
    pub fn identity(mut self) -> Self {
        if self.source_type.family() == TypeFamily::Integer {
            self.is_identity = true;
        } else {
            warn!(
                "Column '{}' ({}) reported as identity but is not an integer type; ignoring identity flag",
                self.name, self.source_type
            );
        }
        self
    }

    pub fn family(&self) -> TypeFamily {
        self.source_type.family()
    }

    /// Length is absent or the `(MAX)` sentinel.
    pub fn is_unbounded(&self) -> bool {
        match self.max_length {
            None => true,
            Some(len) => len == UNBOUNDED_LENGTH || len <= 0,
        }
    }

    /// Textual for the purposes of the NOT NULL empty-string rule.
    pub fn is_textual(&self) -> bool {
        matches!(
            self.source_type,
            SourceType::Char
                | SourceType::VarChar
                | SourceType::NChar
                | SourceType::NVarChar
                | SourceType::Text
                | SourceType::NText
                | SourceType::UniqueIdentifier
                | SourceType::HierarchyId
                | SourceType::Other(_)
        )
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Schema name.
    pub schema_name: String,

    /// Table name.
    pub table_name: String,

    /// Columns in source declaration order.
    pub columns: Vec<ColumnDefinition>,
}

impl TableSpec {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            columns,
        }
    }

    /// Same table and columns under another schema name.
    pub fn renamed(&self, schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: self.table_name.clone(),
            columns: self.columns.clone(),
        }
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }

    /// Primary key columns in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&ColumnDefinition> {
        self.columns.iter().filter(|c| c.is_primary_key).collect()
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.columns.iter().any(|c| c.is_primary_key)
    }

    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|c| c.is_identity)
    }

    /// Exactly one PK column, and it is an integer identity column.
    pub fn has_single_autoincrement_key(&self) -> bool {
        let pk = self.primary_key_columns();
        pk.len() == 1 && pk[0].is_identity && pk[0].family() == TypeFamily::Integer
    }

    /// The single auto-increment key column, if there is one.
    pub fn autoincrement_column(&self) -> Option<&ColumnDefinition> {
        if self.has_single_autoincrement_key() {
            self.primary_key_columns().into_iter().next()
        } else {
            None
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Column used to order pages: the first PK column, else the first
    /// orderable column, else the first column.
    pub fn order_by_column(&self) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.is_primary_key)
            .or_else(|| self.columns.iter().find(|c| c.source_type.is_orderable()))
            .or_else(|| self.columns.first())
    }
}
