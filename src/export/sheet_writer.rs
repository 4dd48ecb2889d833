//! Generates worksheet XML from a [`SpreadsheetDocument`].
//!
//! Text uses inline strings (`t="inlineStr"`) so no shared string table is
//! needed. Formula cells carry their last computed value as the cached `<v>`.

use crate::cell_ref::{cell_ref, col_to_letter};
use crate::merge::merge_ranges;
use crate::types::{Cell, SpreadsheetDocument};
use crate::xlsx::{px_to_chars, px_to_pt};

/// Write a complete worksheet XML string.
pub(crate) fn write_sheet_xml(doc: &SpreadsheetDocument) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    );
    out.push_str(
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    out.push('\n');

    out.push_str(&format!(
        "<dimension ref=\"A1:{}\"/>\n",
        cell_ref(doc.rows.saturating_sub(1), doc.cols.saturating_sub(1))
    ));

    if !doc.global_styles.gridlines {
        out.push_str(
            "<sheetViews><sheetView showGridLines=\"0\" workbookViewId=\"0\"/></sheetViews>\n",
        );
    }

    // <cols>
    let widths: Vec<f64> = doc.column_widths.iter().take(doc.cols as usize).copied().collect();
    if !widths.is_empty() {
        out.push_str("<cols>\n");
        for (col, width) in (1u32..).zip(widths) {
            out.push_str(&format!(
                "<col min=\"{col}\" max=\"{col}\" width=\"{:.4}\" customWidth=\"1\"/>\n",
                px_to_chars(width)
            ));
        }
        out.push_str("</cols>\n");
    }

    out.push_str("<sheetData>\n");
    write_sheet_data(&mut out, doc);
    out.push_str("</sheetData>\n");

    let merges = merge_ranges(doc);
    if !merges.is_empty() {
        out.push_str(&format!("<mergeCells count=\"{}\">\n", merges.len()));
        for merge in &merges {
            out.push_str(&format!("<mergeCell ref=\"{}\"/>\n", merge.to_a1()));
        }
        out.push_str("</mergeCells>\n");
    }

    out.push_str("</worksheet>");
    out
}

/// One `<row>` per grid row, each carrying its height.
fn write_sheet_data(out: &mut String, doc: &SpreadsheetDocument) {
    for (row, cells) in (0u32..).zip(&doc.cell_matrix) {
        out.push_str(&format!("<row r=\"{}\"", row + 1));
        if let Some(height) = doc.row_height(row) {
            out.push_str(&format!(" ht=\"{}\" customHeight=\"1\"", px_to_pt(height)));
        }
        out.push('>');
        for (col, cell) in (0u32..).zip(cells) {
            if !cell.is_blank() {
                write_cell(out, row, col, cell);
            }
        }
        out.push_str("</row>\n");
    }
}

/// Write a single `<c>` element.
fn write_cell(out: &mut String, row: u32, col: u32, cell: &Cell) {
    out.push_str(&format!("<c r=\"{}{}\"", col_to_letter(col), row + 1));

    match cell.formula {
        Some(ref formula) if cell.is_formula => {
            let formula = format!("<f>{}</f>", xml_escape(formula));
            if let Some(ref error) = cell.error {
                out.push_str(&format!(" t=\"e\">{formula}<v>{}</v>", xml_escape(error)));
            } else {
                match cell.computed_value.as_deref() {
                    Some(v) if is_number(v) => out.push_str(&format!(">{formula}<v>{v}</v>")),
                    Some(v) => {
                        out.push_str(&format!(" t=\"str\">{formula}<v>{}</v>", xml_escape(v)));
                    }
                    None => out.push_str(&format!(">{formula}")),
                }
            }
        }
        _ if is_number(&cell.value) => {
            out.push_str(&format!("><v>{}</v>", cell.value.trim()));
        }
        _ => {
            out.push_str(" t=\"inlineStr\"><is><t xml:space=\"preserve\">");
            out.push_str(&xml_escape(&cell.value));
            out.push_str("</t></is>");
        }
    }

    out.push_str("</c>");
}

fn is_number(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Minimal XML escaping for attribute/text content.
pub(crate) fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_kinds() {
        let mut out = String::new();
        write_cell(&mut out, 0, 0, &Cell::with_value(0, 0, "42"));
        assert_eq!(out, "<c r=\"A1\"><v>42</v></c>");

        out.clear();
        write_cell(&mut out, 1, 1, &Cell::with_value(1, 1, "a < b"));
        assert!(out.contains("t=\"inlineStr\""));
        assert!(out.contains("a &lt; b"));

        out.clear();
        let mut f = Cell::with_value(0, 2, "=SUM(A1:A2)");
        f.formula = Some("SUM(A1:A2)".into());
        f.is_formula = true;
        f.computed_value = Some("6".into());
        write_cell(&mut out, 0, 2, &f);
        assert_eq!(out, "<c r=\"C1\"><f>SUM(A1:A2)</f><v>6</v></c>");
    }

    #[test]
    fn test_nan_is_not_a_number() {
        assert!(!is_number("NaN"));
        assert!(!is_number(""));
        assert!(is_number(" 1.5e3 "));
    }
}
