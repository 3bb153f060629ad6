//! Paged extraction queries against the source.
//!
//! Values travel as delimited text, so every column is selected through a
//! cast that keeps it on one line and readable: long text has its tabs and
//! line breaks flattened, binary is rendered as hex, and blank fixed-width
//! values become a placeholder the row parser maps back to `""`.

use crate::core::identifier::quote_bracket;
use crate::core::schema::{ColumnDefinition, SourceType, TableSpec};

/// Stand-in for a NULL or blank fixed-width value in extracted text.
pub const EMPTY_PLACEHOLDER: &str = "[EMPTY]";

/// Select expression for one column, aliased back to the column name.
pub fn column_select(col: &ColumnDefinition) -> String {
    let q = quote_bracket(&col.name);
    let expr = match &col.source_type {
        SourceType::VarChar
        | SourceType::NVarChar
        | SourceType::Text
        | SourceType::NText
        | SourceType::Xml
        | SourceType::SqlVariant => flatten_lines(&format!("CAST({} AS NVARCHAR(MAX))", q)),
        SourceType::Geometry | SourceType::Geography => {
            flatten_lines(&format!("{}.ToString()", q))
        }
        SourceType::HierarchyId => format!("CONVERT(NVARCHAR(892), {})", q),
        SourceType::UniqueIdentifier => format!("CAST({} AS NVARCHAR(50))", q),
        SourceType::Binary | SourceType::VarBinary => {
            format!("sys.fn_varbintohexstr({})", q)
        }
        SourceType::Image => format!("sys.fn_varbintohexstr(CAST({} AS VARBINARY(MAX)))", q),
        SourceType::RowVersion => format!("sys.fn_varbintohexstr(CAST({} AS VARBINARY(8)))", q),
        SourceType::Char | SourceType::NChar => {
            let width = col.max_length.filter(|n| *n > 0).unwrap_or(1);
            let text = format!("CONVERT(NVARCHAR({}), {})", width, q);
            format!(
                "LEFT(RTRIM(CASE WHEN {q} IS NULL OR LTRIM(RTRIM({t})) = '' THEN '{p}' ELSE {t} END), {w})",
                q = q,
                t = text,
                p = EMPTY_PLACEHOLDER,
                w = width + EMPTY_PLACEHOLDER.len() as i64
            )
        }
        _ => q.clone(),
    };

    if expr == q {
        expr
    } else {
        format!("{} AS {}", expr, q)
    }
}

/// One page of `spec`, ordered by its paging column.
pub fn build_page_query(spec: &TableSpec, offset: u64, page_size: usize) -> String {
    let select: Vec<String> = spec.columns.iter().map(column_select).collect();
    let order_by = spec
        .order_by_column()
        .map(|c| quote_bracket(&c.name))
        .unwrap_or_else(|| "(SELECT NULL)".to_string());

    format!(
        "SET NOCOUNT ON; SELECT {} FROM {}.{} ORDER BY {} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY;",
        select.join(", "),
        quote_bracket(&spec.schema_name),
        quote_bracket(&spec.table_name),
        order_by,
        offset,
        page_size
    )
}

/// Replace tab, LF and CR with spaces.
fn flatten_lines(expr: &str) -> String {
    format!(
        "REPLACE(REPLACE(REPLACE({}, CHAR(9), ' '), CHAR(10), ' '), CHAR(13), ' ')",
        expr
    )
}
