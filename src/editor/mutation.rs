//! Cell content mutations.
//!
//! Each function either fails without touching the document or applies the
//! whole edit and returns the [`Change`] to log.

use crate::error::{Result, XleditError};
use crate::history::Change;
use crate::types::{CellAddr, CellMedia, SpreadsheetDocument, StylePatch};

/// Overwrite a cell's raw text, dropping any formula state.
pub(crate) fn apply_cell_edit(
    doc: &mut SpreadsheetDocument,
    row: u32,
    col: u32,
    value: &str,
) -> Result<Option<Change>> {
    let addr = CellAddr::new(row, col);
    doc.check_in_bounds(addr)?;
    let cell = doc
        .cell_mut(row, col)
        .ok_or_else(|| XleditError::Validation(format!("no cell at {}", addr.a1())))?;

    if !cell.is_formula && cell.value == value && cell.computed_value.is_none() && cell.error.is_none() {
        return Ok(None);
    }
    let old = cell.edit_text();
    cell.set_plain_value(value);
    Ok(Some(Change::new(
        "Edit cell",
        format!("{}: {old:?} → {value:?}", addr.a1()),
    )))
}

/// Apply a style patch to every listed cell.
pub(crate) fn apply_style(
    doc: &mut SpreadsheetDocument,
    cells: &[CellAddr],
    patch: &StylePatch,
) -> Result<Option<Change>> {
    if patch.is_empty() || cells.is_empty() {
        return Ok(None);
    }
    for &addr in cells {
        doc.check_in_bounds(addr)?;
    }
    for addr in cells {
        if let Some(cell) = doc.cell_mut(addr.row, addr.col) {
            patch.apply(&mut cell.style);
        }
    }
    Ok(Some(Change::new(
        "Format cells",
        format!("{} on {}", patch.touched_fields().join(", "), describe(cells)),
    )))
}

/// Reset value, formula state and media of the listed cells. Styles and
/// merges are kept.
pub(crate) fn clear_cells(doc: &mut SpreadsheetDocument, cells: &[CellAddr]) -> Result<Option<Change>> {
    for &addr in cells {
        doc.check_in_bounds(addr)?;
    }
    let mut cleared = 0usize;
    for addr in cells {
        if let Some(cell) = doc.cell_mut(addr.row, addr.col) {
            if !cell.is_blank() || cell.computed_value.is_some() || cell.error.is_some() {
                cell.set_plain_value("");
                cell.media = None;
                cleared += 1;
            }
        }
    }
    if cleared == 0 {
        return Ok(None);
    }
    Ok(Some(Change::new("Clear cells", describe(cells))))
}

/// Attach media to a cell, or remove it with `None`.
pub(crate) fn set_media(
    doc: &mut SpreadsheetDocument,
    row: u32,
    col: u32,
    media: Option<CellMedia>,
) -> Result<Option<Change>> {
    let addr = CellAddr::new(row, col);
    doc.check_in_bounds(addr)?;
    if let Some(CellMedia::Link { ref url, .. }) = media {
        if url.trim().is_empty() {
            return Err(XleditError::Validation("link URL is empty".into()));
        }
    }
    let cell = doc
        .cell_mut(row, col)
        .ok_or_else(|| XleditError::Validation(format!("no cell at {}", addr.a1())))?;
    if cell.media == media {
        return Ok(None);
    }
    let change = match (&cell.media, &media) {
        (_, Some(new)) => Change::new("Insert media", format!("{} at {}", new.kind(), addr.a1())),
        (Some(old), None) => Change::new("Remove media", format!("{} at {}", old.kind(), addr.a1())),
        (None, None) => return Ok(None),
    };
    cell.media = media;
    Ok(Some(change))
}

fn describe(cells: &[CellAddr]) -> String {
    match crate::types::CellRange::bounding(cells.iter().copied()) {
        Some(range) if range.cell_count() == cells.len() as u64 => range.to_a1(),
        _ => format!("{} cells", cells.len()),
    }
}
