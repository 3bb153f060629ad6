//! Rendering of extracted field text as target SQL literals.

use crate::core::schema::{ColumnDefinition, TypeFamily};
use crate::core::traits::Dialect;

/// Render one extracted value for `col` in `dialect`.
///
/// An empty or `NULL` value becomes NULL, except in a NOT NULL textual
/// column where it becomes the empty string. NOT NULL columns of other
/// families still get NULL and the target rejects the row.
pub fn render_value<D: Dialect + ?Sized>(raw: &str, col: &ColumnDefinition, dialect: &D) -> String {
    if raw.is_empty() || raw == "NULL" {
        return if !col.nullable && col.is_textual() {
            dialect.string_literal("")
        } else {
            dialect.null_literal().to_string()
        };
    }

    match col.family() {
        TypeFamily::Integer => match raw.trim().parse::<i64>() {
            Ok(_) => raw.trim().to_string(),
            Err(_) => dialect.null_literal().to_string(),
        },
        TypeFamily::ExactNumeric | TypeFamily::ApproxNumeric => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => raw.trim().to_string(),
            _ => dialect.null_literal().to_string(),
        },
        TypeFamily::Boolean => {
            let v = raw.trim();
            dialect.bool_literal(v == "1" || v.eq_ignore_ascii_case("true")).to_string()
        }
        TypeFamily::Binary => {
            let hex = normalize_hex(raw);
            if hex.is_empty() {
                dialect.null_literal().to_string()
            } else {
                dialect.hex_literal(&hex)
            }
        }
        TypeFamily::Character | TypeFamily::DateTime | TypeFamily::Stringish => {
            dialect.string_literal(raw)
        }
    }
}

/// Render a whole row as a parenthesized value tuple.
pub fn render_row<D: Dialect + ?Sized>(
    fields: &[String],
    columns: &[ColumnDefinition],
    dialect: &D,
) -> String {
    let values: Vec<String> = columns
        .iter()
        .zip(fields)
        .map(|(col, raw)| render_value(raw, col, dialect))
        .collect();
    format!("({})", values.join(", "))
}

/// Uppercase hex digits of `raw` without a `0x` prefix, padded to an even
/// length. Non-hex characters are dropped.
pub fn normalize_hex(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let mut hex: String = body
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if hex.len() % 2 == 1 {
        hex.insert(0, '0');
    }
    hex
}
