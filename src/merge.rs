//! Merge/unmerge engine.
//!
//! The master (top-left) cell of a merge carries the full `merge_range`;
//! every other cell in the footprint has `merged = true` and points back at
//! the master through `master_cell`. Covered cells keep their own value and
//! style so unmerging restores them untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XleditError};
use crate::types::{CellAddr, CellRange, SpreadsheetDocument};

/// How a cell should be laid out given the merges around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpan {
    pub colspan: u32,
    pub rowspan: u32,
    /// `false` for cells hidden under another cell's merge
    pub should_render: bool,
}

impl CellSpan {
    const SINGLE: CellSpan = CellSpan {
        colspan: 1,
        rowspan: 1,
        should_render: true,
    };
}

/// All committed merge ranges, in row-major order of their masters.
pub fn merge_ranges(doc: &SpreadsheetDocument) -> Vec<CellRange> {
    doc.cell_matrix
        .iter()
        .flatten()
        .filter_map(|cell| cell.merge_range)
        .collect()
}

/// The merge range covering `addr`, if any.
pub fn merge_containing(doc: &SpreadsheetDocument, addr: CellAddr) -> Option<CellRange> {
    let cell = doc.cell_at(addr)?;
    if let Some(range) = cell.merge_range {
        return Some(range);
    }
    if !cell.merged {
        return None;
    }
    let master = cell.master_cell?;
    doc.cell_at(master)?.merge_range
}

/// Merge the bounding rectangle of `cells` into one cell.
///
/// Merges fully inside the new rectangle are absorbed; any other merge it
/// touches is a conflict. Nothing changes on failure.
pub fn merge_cells<I>(doc: &mut SpreadsheetDocument, cells: I) -> Result<CellRange>
where
    I: IntoIterator<Item = CellAddr>,
{
    let cells: Vec<CellAddr> = cells.into_iter().collect();
    if cells.len() < 2 {
        return Err(XleditError::Merge("select at least two cells".into()));
    }
    let range = CellRange::bounding(cells.iter().copied())
        .ok_or_else(|| XleditError::Merge("empty selection".into()))?;
    if range.is_single() {
        return Err(XleditError::Merge("selection covers a single cell".into()));
    }
    if !doc.contains(CellAddr::new(range.end_row, range.end_col)) {
        return Err(XleditError::Merge(format!(
            "{} is outside the {}×{} grid",
            range.to_a1(),
            doc.rows,
            doc.cols
        )));
    }

    let existing = merge_ranges(doc);
    if let Some(conflict) = existing
        .iter()
        .find(|m| m.intersects(&range) && !range.contains_range(m))
    {
        return Err(XleditError::Merge(format!(
            "{} overlaps existing merge {}",
            range.to_a1(),
            conflict.to_a1()
        )));
    }

    for absorbed in existing.iter().filter(|m| range.contains_range(m)) {
        clear_footprint(doc, absorbed);
    }
    apply_merge(doc, range);
    tracing::debug!(range = %range.to_a1(), "cells merged");
    Ok(range)
}

/// Dissolve the merge containing `(row, col)`. Returns the dissolved range.
pub fn unmerge_cells(doc: &mut SpreadsheetDocument, row: u32, col: u32) -> Result<CellRange> {
    let addr = CellAddr::new(row, col);
    if !doc.contains(addr) {
        return Err(XleditError::Unmerge(format!("{} is outside the grid", addr.a1())));
    }
    let range = merge_containing(doc, addr)
        .ok_or_else(|| XleditError::Unmerge(format!("{} is not merged", addr.a1())))?;
    clear_footprint(doc, &range);
    tracing::debug!(range = %range.to_a1(), "cells unmerged");
    Ok(range)
}

/// Row/column span for laying out `(row, col)`.
pub fn cell_span(doc: &SpreadsheetDocument, row: u32, col: u32) -> CellSpan {
    let Some(cell) = doc.get_cell(row, col) else {
        return CellSpan::SINGLE;
    };
    if let Some(range) = cell.merge_range {
        return CellSpan {
            colspan: range.col_count(),
            rowspan: range.row_count(),
            should_render: true,
        };
    }
    if cell.is_covered() {
        return CellSpan {
            colspan: 1,
            rowspan: 1,
            should_render: false,
        };
    }
    CellSpan::SINGLE
}

/// Pixel size of the cell at `(row, col)`, including its merge footprint.
pub fn merged_footprint(doc: &SpreadsheetDocument, row: u32, col: u32) -> (f64, f64) {
    let range = merge_containing(doc, CellAddr::new(row, col))
        .unwrap_or_else(|| CellRange::single(CellAddr::new(row, col)));
    let width = (range.start_col..=range.end_col)
        .filter_map(|c| doc.column_width(c))
        .sum();
    let height = (range.start_row..=range.end_row)
        .filter_map(|r| doc.row_height(r))
        .sum();
    (width, height)
}

/// Verify master/covered bookkeeping and that no two merges overlap.
pub fn check_merge_invariants(doc: &SpreadsheetDocument) -> Result<()> {
    let ranges = merge_ranges(doc);
    let mut owner: HashMap<CellAddr, CellAddr> = HashMap::new();

    for range in &ranges {
        let master = range.top_left();
        if range.is_single() {
            return Err(XleditError::Validation(format!(
                "merge at {} covers a single cell",
                master.a1()
            )));
        }
        if !doc.contains(CellAddr::new(range.end_row, range.end_col)) {
            return Err(XleditError::Validation(format!(
                "merge {} exceeds the grid",
                range.to_a1()
            )));
        }
        for addr in range.cells() {
            if owner.insert(addr, master).is_some() {
                return Err(XleditError::Validation(format!(
                    "merges overlap at {}",
                    addr.a1()
                )));
            }
        }
    }

    for (row, cells) in (0u32..).zip(&doc.cell_matrix) {
        for (col, cell) in (0u32..).zip(cells) {
            let addr = CellAddr::new(row, col);
            let expected = owner.get(&addr).copied();
            let consistent = match expected {
                None => !cell.merged && cell.master_cell.is_none(),
                Some(master) if master == addr => {
                    cell.merged && cell.master_cell == Some(master)
                }
                Some(master) => {
                    cell.merged && cell.master_cell == Some(master) && cell.merge_range.is_none()
                }
            };
            if !consistent {
                return Err(XleditError::Validation(format!(
                    "inconsistent merge metadata at {}",
                    addr.a1()
                )));
            }
        }
    }
    Ok(())
}

fn apply_merge(doc: &mut SpreadsheetDocument, range: CellRange) {
    let master = range.top_left();
    for addr in range.cells() {
        if let Some(cell) = doc.cell_mut(addr.row, addr.col) {
            cell.merged = true;
            cell.master_cell = Some(master);
            cell.merge_range = (addr == master).then_some(range);
        }
    }
}

fn clear_footprint(doc: &mut SpreadsheetDocument, range: &CellRange) {
    for addr in range.cells() {
        if let Some(cell) = doc.cell_mut(addr.row, addr.col) {
            cell.clear_merge();
        }
    }
}

/// Strip every merge from the document, returning the ranges.
pub(crate) fn take_merges(doc: &mut SpreadsheetDocument) -> Vec<CellRange> {
    let ranges = merge_ranges(doc);
    for cell in doc.cell_matrix.iter_mut().flatten() {
        cell.clear_merge();
    }
    ranges
}

/// Re-apply ranges produced by a structural edit. Ranges that collapsed to
/// one cell or fell off the grid are dropped.
pub(crate) fn restore_merges(doc: &mut SpreadsheetDocument, ranges: Vec<CellRange>) {
    for range in ranges {
        if range.is_single() || !doc.contains(CellAddr::new(range.end_row, range.end_col)) {
            tracing::debug!(range = %range.to_a1(), "merge dissolved by structural edit");
            continue;
        }
        apply_merge(doc, range);
    }
}
