//! Tab-separated clipboard codec.
//!
//! Copy serializes a rectangle of display cells row-major with `\t`
//! between cells and `\n` between rows. Paste parses the same shape and
//! plans where each value lands relative to the active cell. The grid
//! applies the plan.

use crate::error::{GridError, Result};
use onegrid_core::SelectionRect;

/// Build TSV for `rect`; `cell_text(row, col)` supplies each cell's text.
pub fn build_tsv(rect: &SelectionRect, mut cell_text: impl FnMut(usize, usize) -> String) -> String {
    let mut raw_tsv = String::new();
    for r in rect.row_start..=rect.row_end {
        if r > rect.row_start {
            raw_tsv.push('\n');
        }
        for c in rect.col_start..=rect.col_end {
            if c > rect.col_start {
                raw_tsv.push('\t');
            }
            raw_tsv.push_str(&cell_text(r, c));
        }
    }
    raw_tsv
}

/// Parse clipboard text into rows of cells. `\r` is dropped and one
/// trailing line terminator is ignored. Empty input is malformed.
pub fn parse_tsv(text: &str) -> Result<Vec<Vec<String>>> {
    let cleaned: String = text.chars().filter(|&c| c != '\r').collect();
    if cleaned.is_empty() {
        return Err(GridError::MalformedClipboard("empty payload".into()));
    }
    let body = cleaned.strip_suffix('\n').unwrap_or(&cleaned);
    Ok(body
        .split('\n')
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect())
}

/// One pasted value and where it goes, in display coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteCell {
    pub row: usize,
    pub col: usize,
    pub text: String,
}

/// Map parsed cells onto the display grid starting at `(row, col)`.
/// Rows past `row_count` and columns past `col_count` are dropped, as are
/// cells whose column `writable` rejects.
pub fn plan_paste(
    cells: &[Vec<String>],
    row: usize,
    col: usize,
    row_count: usize,
    col_count: usize,
    writable: impl Fn(usize) -> bool,
) -> Vec<PasteCell> {
    let mut plan = Vec::new();
    for (dr, line) in cells.iter().enumerate() {
        let target_row = row + dr;
        if target_row >= row_count {
            break;
        }
        for (dc, text) in line.iter().enumerate() {
            let target_col = col + dc;
            if target_col >= col_count {
                break;
            }
            if !writable(target_col) {
                continue;
            }
            plan.push(PasteCell {
                row: target_row,
                col: target_col,
                text: text.clone(),
            });
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tsv() {
        let rect = SelectionRect::new(0, 0, 1, 2);
        let tsv = build_tsv(&rect, |r, c| format!("{r}{c}"));
        assert_eq!(tsv, "00\t01\t02\n10\t11\t12");
    }

    #[test]
    fn test_parse_tsv_strips_cr_and_trailing_newline() {
        let cells = parse_tsv("a\tb\r\nc\td\r\n").unwrap();
        assert_eq!(cells, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_parse_tsv_keeps_empty_cells() {
        let cells = parse_tsv("a\t\tc").unwrap();
        assert_eq!(cells, vec![vec!["a", "", "c"]]);
    }

    #[test]
    fn test_parse_empty_is_malformed() {
        assert!(matches!(parse_tsv(""), Err(GridError::MalformedClipboard(_))));
        assert!(matches!(parse_tsv("\r"), Err(GridError::MalformedClipboard(_))));
    }

    #[test]
    fn test_plan_paste_clips_and_skips() {
        let cells = parse_tsv("1\t2\t3\n4\t5\t6\n7\t8\t9").unwrap();
        // 2 display rows left from row 3, 3 columns left from col 1, col 2 read-only
        let plan = plan_paste(&cells, 3, 1, 5, 4, |c| c != 2);
        let placed: Vec<_> = plan.iter().map(|p| (p.row, p.col, p.text.as_str())).collect();
        assert_eq!(placed, vec![(3, 1, "1"), (3, 3, "3"), (4, 1, "4"), (4, 3, "6")]);
    }
}
