//! Fixed-width text to table parsing.
//!
//! Command output such as bpftrace tables is aligned with spaces. The header
//! line defines where each column starts. A row whose cells are separated by
//! two or more spaces, one per header, is taken as is; any other row (blank
//! cells, overflowing values) is cut at the header's character offsets. The
//! offset cut relies on monospaced, space-aligned input.

use crate::types::{Column, TableResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// Lines containing this marker are interrupt noise, not table content.
const INTERRUPT_MARKER: &str = "Ctrl-C";

static COLUMN_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\s+").expect("Invalid column separator regex"));

/// Character range of a column; `end` is exclusive, `None` means to end of line.
type ColumnRange = (usize, Option<usize>);

/// Parse a fixed-width text blob into a table.
///
/// Every row has one cell per header: rows cut by offsets that end before a
/// column starts get empty cells for it.
pub fn parse_table(text: &str) -> TableResult {
    let mut table = TableResult::default();
    let mut ranges: Vec<ColumnRange> = Vec::new();

    for raw in text.split('\n') {
        let line = raw.trim();
        if line.is_empty() || line.contains(INTERRUPT_MARKER) {
            continue;
        }

        if table.columns.is_empty() {
            let headers: Vec<&str> = COLUMN_SEPARATOR.split(line).collect();
            let starts: Vec<usize> = headers.iter().map(|h| char_index_of(line, h)).collect();
            for (i, header) in headers.iter().enumerate() {
                let end = starts.get(i + 1).map(|next| next.saturating_sub(1));
                table.columns.push(Column { text: header.to_string() });
                ranges.push((starts[i], end));
            }
        } else {
            table.rows.push(parse_row(line, &ranges));
        }
    }

    table
}

fn parse_row(line: &str, ranges: &[ColumnRange]) -> Vec<String> {
    let cells: Vec<&str> = COLUMN_SEPARATOR.split(line).collect();
    if cells.len() == ranges.len() {
        return cells.into_iter().map(str::to_string).collect();
    }

    let chars: Vec<char> = line.chars().collect();
    ranges.iter().map(|range| slice_chars(&chars, *range).trim().to_string()).collect()
}

/// Character offset of the first occurrence of `needle` in `haystack`.
fn char_index_of(haystack: &str, needle: &str) -> usize {
    haystack.find(needle).map(|byte| haystack[..byte].chars().count()).unwrap_or(0)
}

/// Substring by character range, clamped to the line.
fn slice_chars(chars: &[char], (start, end): ColumnRange) -> String {
    let len = chars.len();
    let start = start.min(len);
    let end = end.unwrap_or(len).min(len);
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(table: &TableResult) -> Vec<&str> {
        table.columns.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_simple_table() {
        let table = parse_table("A  B\nval1  val2");
        assert_eq!(columns(&table), vec!["A", "B"]);
        assert_eq!(table.rows, vec![vec!["val1".to_string(), "val2".to_string()]]);
    }

    #[test]
    fn test_skips_blank_and_interrupt_lines() {
        let text = "Attaching 1 probe... hit Ctrl-C to end.\n\n   \nPID    COMM      COUNT\n1234   bash      12\n\n99     sshd      3\n";
        let table = parse_table(text);
        assert_eq!(columns(&table), vec!["PID", "COMM", "COUNT"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["1234".to_string(), "bash".to_string(), "12".to_string()],
                vec!["99".to_string(), "sshd".to_string(), "3".to_string()],
            ]
        );
    }

    #[test]
    fn test_single_spaces_stay_inside_columns() {
        let text = "COMMAND NAME     PID\nkworker/0:1 x    17";
        let table = parse_table(text);
        assert_eq!(columns(&table), vec!["COMMAND NAME", "PID"]);
        assert_eq!(table.rows[0], vec!["kworker/0:1 x".to_string(), "17".to_string()]);
    }

    #[test]
    fn test_short_rows_yield_empty_cells() {
        let table = parse_table("NAME    STATE    EXTRA\nfoo     up");
        assert_eq!(table.rows, vec![vec!["foo".to_string(), "up".to_string(), String::new()]]);
    }

    #[test]
    fn test_last_column_unbounded() {
        let table = parse_table("ID  MESSAGE\n1   a rather long message that overflows");
        assert_eq!(table.rows[0][1], "a rather long message that overflows");
    }

    #[test]
    fn test_multibyte_characters_cut_by_offsets() {
        let table = parse_table("NAME   TEMP   FAN\nsensör 42°C");
        assert_eq!(
            table.rows[0],
            vec!["sensör".to_string(), "42°C".to_string(), String::new()]
        );
    }

    #[test]
    fn test_blank_middle_cell_uses_offsets() {
        let text = "PID    COMM      COUNT\n1234             12";
        let table = parse_table(text);
        assert_eq!(
            table.rows[0],
            vec!["1234".to_string(), String::new(), "12".to_string()]
        );
    }

    #[test]
    fn test_empty_input() {
        let table = parse_table("");
        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
    }
}
