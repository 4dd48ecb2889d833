//! Cell & grid model: addressing, dimensions and structural edits.
//!
//! Structural edits keep the matrix, `column_widths`/`row_heights` and the
//! merge ranges consistent with each other. Merges are lifted off before the
//! edit, transformed to the new coordinates and re-applied; a range that
//! collapses to a single cell dissolves.

use crate::config::EditorConfig;
use crate::error::{Result, XleditError};
use crate::history::Change;
use crate::merge::{restore_merges, take_merges};
use crate::types::{Cell, CellAddr, CellRange, SpreadsheetDocument};

/// Largest supported row count.
pub const MAX_ROWS: u32 = 1_048_576;

/// Largest supported column count.
pub const MAX_COLS: u32 = 16_384;

/// Sizes given to rows and columns created by structural edits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDefaults {
    pub column_width: f64,
    pub row_height: f64,
}

impl From<&EditorConfig> for GridDefaults {
    fn from(config: &EditorConfig) -> Self {
        Self {
            column_width: config.column_width,
            row_height: config.row_height,
        }
    }
}

/// Build a matrix of blank cells with deterministic ids.
pub(crate) fn blank_matrix(rows: u32, cols: u32) -> Vec<Vec<Cell>> {
    (0..rows)
        .map(|row| (0..cols).map(|col| Cell::blank(row, col)).collect())
        .collect()
}

fn check_dimensions(rows: u32, cols: u32) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(XleditError::Validation(
            "grid must have at least one row and one column".into(),
        ));
    }
    if rows > MAX_ROWS || cols > MAX_COLS {
        return Err(XleditError::Validation(format!(
            "grid {rows}×{cols} exceeds the {MAX_ROWS}×{MAX_COLS} limit"
        )));
    }
    Ok(())
}

/// Where a row/column axis edit happens.
#[derive(Clone, Copy)]
enum Axis {
    Row,
    Col,
}

impl SpreadsheetDocument {
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cell_matrix.get(row as usize)?.get(col as usize)
    }

    pub fn cell_at(&self, addr: CellAddr) -> Option<&Cell> {
        self.get_cell(addr.row, addr.col)
    }

    pub(crate) fn cell_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        self.cell_matrix.get_mut(row as usize)?.get_mut(col as usize)
    }

    /// Look a cell up by reference (`"B3"`).
    pub fn cell_by_ref(&self, reference: &str) -> Option<&Cell> {
        let addr = crate::cell_ref::parse_addr(reference)?;
        self.cell_at(addr)
    }

    pub fn contains(&self, addr: CellAddr) -> bool {
        addr.row < self.rows && addr.col < self.cols
    }

    pub(crate) fn check_in_bounds(&self, addr: CellAddr) -> Result<()> {
        if self.contains(addr) {
            Ok(())
        } else {
            Err(XleditError::Validation(format!(
                "cell {} is outside the {}×{} grid",
                addr.a1(),
                self.rows,
                self.cols
            )))
        }
    }

    /// The whole grid as a range.
    pub fn full_range(&self) -> CellRange {
        CellRange::new(
            0,
            0,
            self.rows.saturating_sub(1),
            self.cols.saturating_sub(1),
        )
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(col as usize).copied()
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(row as usize).copied()
    }

    /// Grow or shrink to `rows × cols`, keeping existing cells in place.
    ///
    /// Returns `None` when the size is unchanged.
    pub fn resize(
        &mut self,
        rows: u32,
        cols: u32,
        defaults: GridDefaults,
    ) -> Result<Option<Change>> {
        check_dimensions(rows, cols)?;
        if rows == self.rows && cols == self.cols {
            return Ok(None);
        }
        let old = (self.rows, self.cols);
        let merges = take_merges(self);

        self.cell_matrix.truncate(rows as usize);
        for (row, cells) in (0u32..).zip(self.cell_matrix.iter_mut()) {
            cells.truncate(cols as usize);
            let start = u32::try_from(cells.len()).unwrap_or(cols);
            cells.extend((start..cols).map(|col| Cell::blank(row, col)));
        }
        let start_row = u32::try_from(self.cell_matrix.len()).unwrap_or(rows);
        self.cell_matrix.extend(
            (start_row..rows).map(|row| (0..cols).map(|col| Cell::blank(row, col)).collect()),
        );

        self.column_widths
            .resize(cols as usize, defaults.column_width);
        self.row_heights.resize(rows as usize, defaults.row_height);
        self.rows = rows;
        self.cols = cols;

        let clipped = merges.into_iter().filter_map(|range| {
            if range.start_row >= rows || range.start_col >= cols {
                return None;
            }
            Some(CellRange::new(
                range.start_row,
                range.start_col,
                range.end_row.min(rows - 1),
                range.end_col.min(cols - 1),
            ))
        });
        restore_merges(self, clipped.collect());

        tracing::debug!(from = ?old, to = ?(rows, cols), "grid resized");
        Ok(Some(Change::new(
            "Resize grid",
            format!("{}×{} → {}×{}", old.0, old.1, rows, cols),
        )))
    }

    /// Insert a blank row before `at` (append when `None`).
    pub fn insert_row(&mut self, at: Option<u32>, defaults: GridDefaults) -> Result<Change> {
        self.insert_line(Axis::Row, at, defaults)
    }

    /// Insert a blank column before `at` (append when `None`).
    pub fn insert_column(&mut self, at: Option<u32>, defaults: GridDefaults) -> Result<Change> {
        self.insert_line(Axis::Col, at, defaults)
    }

    /// Remove row `at` (the last row when `None`). Removing the only row is a no-op.
    pub fn remove_row(&mut self, at: Option<u32>) -> Result<Option<Change>> {
        self.remove_line(Axis::Row, at)
    }

    /// Remove column `at` (the last column when `None`). Removing the only column is a no-op.
    pub fn remove_column(&mut self, at: Option<u32>) -> Result<Option<Change>> {
        self.remove_line(Axis::Col, at)
    }

    fn insert_line(&mut self, axis: Axis, at: Option<u32>, defaults: GridDefaults) -> Result<Change> {
        let len = match axis {
            Axis::Row => self.rows,
            Axis::Col => self.cols,
        };
        let at = at.unwrap_or(len);
        if at > len {
            return Err(XleditError::Validation(format!(
                "cannot insert at {at}; grid has {len}"
            )));
        }
        let new_len = len + 1;
        match axis {
            Axis::Row => check_dimensions(new_len, self.cols)?,
            Axis::Col => check_dimensions(self.rows, new_len)?,
        }

        let merges = take_merges(self);
        let idx = at as usize;
        match axis {
            Axis::Row => {
                let blank = (0..self.cols).map(|col| Cell::blank(at, col)).collect();
                self.cell_matrix.insert(idx, blank);
                self.row_heights.insert(idx.min(self.row_heights.len()), defaults.row_height);
                self.rows = new_len;
            }
            Axis::Col => {
                for (row, cells) in (0u32..).zip(self.cell_matrix.iter_mut()) {
                    cells.insert(idx.min(cells.len()), Cell::blank(row, at));
                }
                self.column_widths
                    .insert(idx.min(self.column_widths.len()), defaults.column_width);
                self.cols = new_len;
            }
        }

        let shifted = merges
            .into_iter()
            .map(|r| {
                let (start, end) = axis_bounds(&r, axis);
                let (start, end) = if start >= at {
                    (start + 1, end + 1)
                } else if end >= at {
                    (start, end + 1)
                } else {
                    (start, end)
                };
                with_axis_bounds(r, axis, start, end)
            })
            .collect();
        self.renumber_ids();
        restore_merges(self, shifted);

        let (action, label) = match axis {
            Axis::Row => ("Insert row", crate::cell_ref::row_label(at)),
            Axis::Col => ("Insert column", crate::cell_ref::col_to_letter(at)),
        };
        tracing::debug!(action, at, "structural edit");
        Ok(Change::new(action, format!("Inserted at {label}")))
    }

    fn remove_line(&mut self, axis: Axis, at: Option<u32>) -> Result<Option<Change>> {
        let len = match axis {
            Axis::Row => self.rows,
            Axis::Col => self.cols,
        };
        if len <= 1 {
            return Ok(None);
        }
        let at = at.unwrap_or(len - 1);
        if at >= len {
            return Err(XleditError::Validation(format!(
                "cannot remove {at}; grid has {len}"
            )));
        }

        let merges = take_merges(self);
        let idx = at as usize;
        match axis {
            Axis::Row => {
                self.cell_matrix.remove(idx);
                if idx < self.row_heights.len() {
                    self.row_heights.remove(idx);
                }
                self.rows = len - 1;
            }
            Axis::Col => {
                for cells in &mut self.cell_matrix {
                    if idx < cells.len() {
                        cells.remove(idx);
                    }
                }
                if idx < self.column_widths.len() {
                    self.column_widths.remove(idx);
                }
                self.cols = len - 1;
            }
        }

        let shrunk = merges
            .into_iter()
            .filter_map(|r| {
                let (start, end) = axis_bounds(&r, axis);
                if end < at {
                    Some(r)
                } else if start > at {
                    Some(with_axis_bounds(r, axis, start - 1, end - 1))
                } else if start == end {
                    None
                } else {
                    Some(with_axis_bounds(r, axis, start, end - 1))
                }
            })
            .collect();
        self.renumber_ids();
        restore_merges(self, shrunk);

        let (action, label) = match axis {
            Axis::Row => ("Remove row", crate::cell_ref::row_label(at)),
            Axis::Col => ("Remove column", crate::cell_ref::col_to_letter(at)),
        };
        tracing::debug!(action, at, "structural edit");
        Ok(Some(Change::new(action, format!("Removed {label}"))))
    }

    /// Set a column width. `None` when unchanged.
    pub fn set_column_width(&mut self, col: u32, width: f64) -> Result<Option<Change>> {
        check_size(width)?;
        let slot = self
            .column_widths
            .get_mut(col as usize)
            .filter(|_| col < self.cols)
            .ok_or_else(|| XleditError::Validation(format!("no column {col}")))?;
        let old = *slot;
        if (old - width).abs() < f64::EPSILON {
            return Ok(None);
        }
        *slot = width;
        Ok(Some(Change::new(
            "Resize column",
            format!("{}: {old} → {width}", crate::cell_ref::col_to_letter(col)),
        )))
    }

    /// Set a row height. `None` when unchanged.
    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<Option<Change>> {
        check_size(height)?;
        let slot = self
            .row_heights
            .get_mut(row as usize)
            .filter(|_| row < self.rows)
            .ok_or_else(|| XleditError::Validation(format!("no row {row}")))?;
        let old = *slot;
        if (old - height).abs() < f64::EPSILON {
            return Ok(None);
        }
        *slot = height;
        Ok(Some(Change::new(
            "Resize row",
            format!("{}: {old} → {height}", crate::cell_ref::row_label(row)),
        )))
    }

    /// Check a loaded document for structural consistency, padding short
    /// dimension arrays with defaults.
    pub fn normalize(&mut self, defaults: GridDefaults) -> Result<()> {
        check_dimensions(self.rows, self.cols)?;
        if self.cell_matrix.len() != self.rows as usize {
            return Err(XleditError::Validation(format!(
                "cell matrix has {} rows, expected {}",
                self.cell_matrix.len(),
                self.rows
            )));
        }
        if let Some((row, cells)) = self
            .cell_matrix
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != self.cols as usize)
        {
            return Err(XleditError::Validation(format!(
                "row {row} has {} cells, expected {}",
                cells.len(),
                self.cols
            )));
        }
        if self.column_widths.len() < self.cols as usize {
            self.column_widths
                .resize(self.cols as usize, defaults.column_width);
        }
        if self.row_heights.len() < self.rows as usize {
            self.row_heights.resize(self.rows as usize, defaults.row_height);
        }
        crate::merge::check_merge_invariants(self)
    }

    fn renumber_ids(&mut self) {
        for (row, cells) in self.cell_matrix.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                cell.id = format!("r{row}c{col}");
            }
        }
    }
}

fn check_size(size: f64) -> Result<()> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(XleditError::Validation(format!("invalid size {size}")))
    }
}

fn axis_bounds(range: &CellRange, axis: Axis) -> (u32, u32) {
    match axis {
        Axis::Row => (range.start_row, range.end_row),
        Axis::Col => (range.start_col, range.end_col),
    }
}

fn with_axis_bounds(range: CellRange, axis: Axis, start: u32, end: u32) -> CellRange {
    match axis {
        Axis::Row => CellRange {
            start_row: start,
            end_row: end,
            ..range
        },
        Axis::Col => CellRange {
            start_col: start,
            end_col: end,
            ..range
        },
    }
}
