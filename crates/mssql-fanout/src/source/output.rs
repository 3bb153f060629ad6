//! Helpers for reading command-line client output.
//!
//! Clients print results as delimited text with the occasional banner or
//! footer. These helpers separate data lines from that noise and pull counts
//! out of single-value results.

/// Whether a physical output line carries no data.
///
/// Noise is a blank line, a separator made of dashes (and delimiters), or a
/// `(N rows affected)` footer. A line made only of delimiters is a row of
/// empty fields and is kept.
pub fn is_noise_line(line: &str, delimiter: char) -> bool {
    let trimmed = line.trim_matches(|c: char| c == '\r' || c == '\n' || c == ' ');
    if trimmed.is_empty() {
        return true;
    }
    if rows_affected(trimmed).is_some() {
        return true;
    }
    trimmed.contains('-') && trimmed.chars().all(|c| c == '-' || c == delimiter || c == ' ')
}

/// Parse a `(N rows affected)` / `(1 row affected)` footer.
pub fn rows_affected(line: &str) -> Option<u64> {
    let inner = line.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let count = parts.next()?.parse().ok()?;
    match (parts.next(), parts.next(), parts.next()) {
        (Some("rows" | "row"), Some("affected"), None) => Some(count),
        _ => None,
    }
}

/// Sum of every `(N rows affected)` footer in the output.
pub fn total_rows_affected(text: &str) -> Option<u64> {
    let counts: Vec<u64> = text.lines().filter_map(rows_affected).collect();
    if counts.is_empty() {
        None
    } else {
        Some(counts.iter().sum())
    }
}

/// The first line that is a bare non-negative integer.
pub fn parse_count(text: &str) -> Option<u64> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit()))
        .and_then(|l| l.parse().ok())
}

/// Data lines of a metadata result, split into trimmed fields.
pub fn metadata_rows(text: &str, delimiter: char) -> Vec<Vec<String>> {
    text.lines()
        .filter(|l| !is_noise_line(l, delimiter))
        .map(|l| {
            l.trim_end_matches('\r')
                .split(delimiter)
                .map(|f| f.trim().to_string())
                .collect()
        })
        .collect()
}

/// First field of every data line, e.g. a list of column or table names.
pub fn first_column(text: &str, delimiter: char) -> Vec<String> {
    metadata_rows(text, delimiter)
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .filter(|name| !name.is_empty())
        .collect()
}
