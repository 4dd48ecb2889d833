//! Utilities for spreadsheet-style cell references and ranges.

use crate::types::{CellAddr, CellRange};

/// Convert a zero-based column index to its letter label (0 → "A", 26 → "AA").
pub fn col_to_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = u64::from(col) + 1; // Convert to 1-based
    while n > 0 {
        n -= 1;
        let offset = u8::try_from(n % 26).unwrap_or(0);
        result.insert(0, char::from(b'A' + offset));
        n /= 26;
    }
    result
}

/// One-based row label for a zero-based row index.
pub fn row_label(row: u32) -> String {
    (u64::from(row) + 1).to_string()
}

/// Build the reference for a zero-based `(row, col)` pair, e.g. `(2, 1)` → `"B3"`.
pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", col_to_letter(col), row_label(row))
}

/// Parse a cell reference like "A1" into (col, row) where col and row are 0-indexed.
///
/// `$` anchors are ignored. Letters must precede digits.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for ch in cell_ref.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() {
            if saw_row {
                return None;
            }
            let upper = ch.to_ascii_uppercase();
            col = col
                .checked_mul(26)?
                .checked_add(u32::from(upper) - u32::from('A') + 1)?;
            saw_col = true;
        } else if let Some(digit) = ch.to_digit(10) {
            row = row.checked_mul(10)?.checked_add(digit)?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some((col - 1, row - 1))
}

/// Parse a reference into a [`CellAddr`].
pub fn parse_addr(cell_ref: &str) -> Option<CellAddr> {
    parse_cell_ref(cell_ref).map(|(col, row)| CellAddr::new(row, col))
}

/// Parse a cell range like "A1:B10" or "A1" into a normalized [`CellRange`].
pub fn parse_cell_range(range: &str) -> Option<CellRange> {
    if let Some((start, end)) = range.split_once(':') {
        let start = parse_addr(start)?;
        let end = parse_addr(end)?;
        Some(CellRange::from_corners(start, end))
    } else {
        parse_addr(range).map(CellRange::single)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letters() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(27), "AB");
        assert_eq!(col_to_letter(701), "ZZ");
        assert_eq!(col_to_letter(702), "AAA");
    }

    #[test]
    fn test_cell_ref_roundtrip() {
        assert_eq!(cell_ref(2, 1), "B3");
        assert_eq!(parse_cell_ref("B3"), Some((1, 2)));
        assert_eq!(parse_cell_ref("$AA$10"), Some((26, 9)));
        assert_eq!(parse_cell_ref("b3"), Some((1, 2)));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(parse_cell_ref("3B"), None);
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("A"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A-1"), None);
    }

    #[test]
    fn test_parse_range_normalizes() {
        let range = parse_cell_range("C5:A1").unwrap();
        assert_eq!(range, CellRange::new(0, 0, 4, 2));
        assert_eq!(range.to_a1(), "A1:C5");
        let single = parse_cell_range("B2").unwrap();
        assert!(single.is_single());
    }
}
