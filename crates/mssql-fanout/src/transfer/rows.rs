//! Reassembly of extracted text into rows.
//!
//! The source client may hard-wrap a long value across physical lines. A
//! logical row is complete once it holds `columns - 1` delimiters; shorter
//! lines are fragments and are joined with the following lines until the
//! count is reached.
//!
//! Pages are read without headers, so blank lines and dash-only lines are
//! data. Only `(N rows affected)` footers are skipped.

use crate::source::output::rows_affected;
use crate::transfer::extract::EMPTY_PLACEHOLDER;

/// Rows of one extracted page, each with exactly one field per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBatch {
    pub rows: Vec<Vec<String>>,
}

impl RowBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Join wrapped physical lines into logical lines.
pub fn reassemble_lines(text: &str, column_count: usize, delimiter: char) -> Vec<String> {
    let expected = column_count.saturating_sub(1);
    let delimiters = |s: &str| s.chars().filter(|c| *c == delimiter).count();

    let mut logical = Vec::new();
    let mut pending = String::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if rows_affected(line).is_some() {
            continue;
        }
        pending.push_str(line);
        if delimiters(&pending) >= expected {
            logical.push(std::mem::take(&mut pending));
        }
    }

    if !pending.is_empty() {
        logical.push(pending);
    }
    logical
}

/// Split one logical line into exactly `column_count` trimmed fields.
pub fn split_fields(line: &str, column_count: usize, delimiter: char) -> Vec<String> {
    let mut fields: Vec<String> = line
        .split(delimiter)
        .take(column_count)
        .map(|f| {
            let f = f.trim();
            if f == EMPTY_PLACEHOLDER {
                String::new()
            } else {
                f.to_string()
            }
        })
        .collect();
    fields.resize(column_count, String::new());
    fields
}

/// Parse one page of extracted text.
pub fn parse_page(text: &str, column_count: usize, delimiter: char) -> RowBatch {
    RowBatch {
        rows: reassemble_lines(text, column_count, delimiter)
            .iter()
            .map(|line| split_fields(line, column_count, delimiter))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_rows() {
        let text = "1\tKen\t1\n2\tTerri\t0\n\n(2 rows affected)\n";
        let batch = parse_page(text, 3, '\t');
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows[1], vec!["2", "Terri", "0"]);
    }

    #[test]
    fn test_wrapped_row_is_rejoined() {
        let text = "7\tA very long descr\niption that wrapped\t1\n8\tShort\t0\n";
        let batch = parse_page(text, 3, '\t');
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows[0].len(), 3);
        assert_eq!(
            batch.rows[0],
            vec!["7", "A very long description that wrapped", "1"]
        );
        assert_eq!(batch.rows[1], vec!["8", "Short", "0"]);
    }

    #[test]
    fn test_placeholder_and_padding() {
        let batch = parse_page("1\t[EMPTY]\n2\n", 2, '\t');
        // "2" alone is a fragment that never completes and is kept as-is.
        assert_eq!(batch.rows[0], vec!["1", ""]);
        assert_eq!(batch.rows[1], vec!["2", ""]);
    }

    #[test]
    fn test_extra_fields_are_truncated() {
        assert_eq!(split_fields("a\tb\tc", 2, '\t'), vec!["a", "b"]);
    }

    #[test]
    fn test_row_of_empty_fields_is_kept() {
        let batch = parse_page("\t\t\n", 3, '\t');
        assert_eq!(batch.rows, vec![vec!["", "", ""]]);
    }

    #[test]
    fn test_single_column_each_line_is_a_row() {
        let batch = parse_page("a\nb\n", 1, '\t');
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_blank_line_is_an_empty_single_column_row() {
        let batch = parse_page("a\n\nb\n(3 rows affected)\n", 1, '\t');
        assert_eq!(batch.rows, vec![vec!["a"], vec![""], vec!["b"]]);
    }

    #[test]
    fn test_dash_values_are_data() {
        let batch = parse_page("1\tx\n-\t-\n2\ty\n", 2, '\t');
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.rows[1], vec!["-", "-"]);
    }

    #[test]
    fn test_dash_only_fragment_is_rejoined() {
        let batch = parse_page("5\tab\n---\n\tok\n", 3, '\t');
        assert_eq!(batch.rows, vec![vec!["5", "ab---", "ok"]]);
    }
}
