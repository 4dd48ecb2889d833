//! CSV/TSV import and export.
//!
//! Import replaces the whole grid: it becomes exactly as tall as the data and
//! `max(existing cols, widest record)` wide, with ragged records padded by
//! blank cells. Merges do not survive an import.

use crate::error::{Result, XleditError};
use crate::grid::GridDefaults;
use crate::history::Change;
use crate::types::{Cell, CellRange, SpreadsheetDocument};

/// Detect the most likely field delimiter from the first lines.
///
/// Each candidate is scored by how many sample lines share the first line's
/// field count, weighted by that count. Falls back to a comma.
pub fn sniff_delimiter(text: &str) -> u8 {
    let candidates: &[u8] = b"\t;,|";
    let sample: Vec<&str> = text.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0usize;
    for &delim in candidates {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                ::csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map_or(1, |r| r.len())
            })
            .collect();
        let Some(&target) = counts.first() else {
            continue;
        };
        if target <= 1 {
            continue;
        }
        let score = counts.iter().filter(|&&c| c == target).count() * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }
    best
}

/// Split CSV text into records. Quoted fields may contain delimiters,
/// doubled quotes and newlines.
pub fn parse_records(text: &str, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// Replace the grid with the contents of `text`.
///
/// Empty input is rejected and leaves the document untouched.
pub fn import_csv(
    doc: &mut SpreadsheetDocument,
    text: &str,
    delimiter: u8,
    defaults: GridDefaults,
) -> Result<Change> {
    let records = parse_records(text, delimiter)?;
    if records.is_empty() {
        return Err(XleditError::Validation("CSV input contains no rows".into()));
    }
    let rows = u32::try_from(records.len())
        .map_err(|_| XleditError::Validation("CSV input has too many rows".into()))?;
    let widest = records.iter().map(Vec::len).max().unwrap_or(0);
    let widest = u32::try_from(widest)
        .map_err(|_| XleditError::Validation("CSV input has too many columns".into()))?;
    let cols = doc.cols.max(widest).max(1);
    if rows > crate::grid::MAX_ROWS || cols > crate::grid::MAX_COLS {
        return Err(XleditError::Validation(format!(
            "CSV input {rows}×{cols} exceeds the grid limit"
        )));
    }

    let matrix: Vec<Vec<Cell>> = (0u32..)
        .zip(records)
        .map(|(row, record)| {
            let mut fields = record.into_iter();
            (0..cols)
                .map(|col| match fields.next() {
                    Some(value) => Cell::with_value(row, col, value),
                    None => Cell::blank(row, col),
                })
                .collect()
        })
        .collect();

    doc.cell_matrix = matrix;
    doc.rows = rows;
    doc.cols = cols;
    doc.column_widths.resize(cols as usize, defaults.column_width);
    doc.row_heights.resize(rows as usize, defaults.row_height);

    tracing::info!(rows, cols, "CSV imported");
    Ok(Change::new("Import CSV", format!("{rows}×{cols} grid")))
}

/// Write `scope` (the whole grid when `None`) as CSV.
///
/// Cells export their computed value when present; cells hidden under a
/// merge export empty. Fields are quoted only when needed.
pub fn export_csv(
    doc: &SpreadsheetDocument,
    delimiter: u8,
    scope: Option<CellRange>,
) -> Result<String> {
    let full = doc.full_range();
    let range = match scope {
        Some(r) if r.intersects(&full) => CellRange::new(
            r.start_row,
            r.start_col,
            r.end_row.min(full.end_row),
            r.end_col.min(full.end_col),
        ),
        Some(r) => {
            return Err(XleditError::Validation(format!(
                "export range {} is outside the grid",
                r.to_a1()
            )))
        }
        None => full,
    };

    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(::csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    for row in range.start_row..=range.end_row {
        let record = (range.start_col..=range.end_col).map(|col| {
            doc.get_cell(row, col)
                .filter(|c| !c.is_covered())
                .map_or("", |c| c.display_value())
        });
        writer.write_record(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| XleditError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| XleditError::Validation(e.to_string()))
}
