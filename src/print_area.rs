//! Print-area selection.
//!
//! Independent from the cell selection: while the mode is active, pointer
//! gestures draw a pending rectangle that only becomes the print area on
//! [`PrintAreaState::confirm`].

use serde::{Deserialize, Serialize};

use crate::types::{CellAddr, CellRange, SpreadsheetDocument};

/// Highlight state of one cell with respect to the print area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintCellState {
    pub in_print_area: bool,
    pub in_pending: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PrintAreaState {
    active: bool,
    dragging: bool,
    anchor: Option<CellAddr>,
    pending: Option<CellRange>,
    committed: Option<CellRange>,
}

impl PrintAreaState {
    /// Enter print-area mode.
    pub fn activate(&mut self) {
        self.active = true;
        self.dragging = false;
        self.anchor = None;
        self.pending = None;
        tracing::debug!("print area mode on");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pointer_down(&mut self, addr: CellAddr) {
        if !self.active {
            return;
        }
        self.dragging = true;
        self.anchor = Some(addr);
        self.pending = Some(CellRange::single(addr));
    }

    pub fn pointer_move(&mut self, addr: CellAddr) {
        if !self.dragging {
            return;
        }
        if let Some(anchor) = self.anchor {
            self.pending = Some(CellRange::from_corners(anchor, addr));
        }
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Commit the pending rectangle and leave the mode. Returns the new area,
    /// or `None` if nothing was drawn (the previous area is kept).
    pub fn confirm(&mut self) -> Option<CellRange> {
        if !self.active {
            return None;
        }
        let confirmed = self.pending.take().map(CellRange::normalized);
        if let Some(range) = confirmed {
            tracing::debug!(range = %range.to_a1(), "print area set");
            self.committed = Some(range);
        }
        self.active = false;
        self.dragging = false;
        self.anchor = None;
        confirmed
    }

    /// Discard the pending rectangle and leave the mode (Escape).
    pub fn deactivate(&mut self) {
        self.active = false;
        self.dragging = false;
        self.anchor = None;
        self.pending = None;
    }

    /// Remove the committed print area. Returns whether one existed.
    pub fn clear(&mut self) -> bool {
        self.committed.take().is_some()
    }

    pub fn area(&self) -> Option<CellRange> {
        self.committed
    }

    pub fn pending(&self) -> Option<CellRange> {
        self.pending
    }

    pub fn cell_state(&self, addr: CellAddr) -> PrintCellState {
        PrintCellState {
            in_print_area: self.committed.is_some_and(|r| r.contains(addr)),
            in_pending: self.pending.is_some_and(|r| r.contains(addr)),
        }
    }

    /// The range to print: the committed area clipped to the grid, else the whole grid.
    pub fn print_range(&self, doc: &SpreadsheetDocument) -> CellRange {
        let full = doc.full_range();
        match self.committed {
            Some(r) if r.intersects(&full) => CellRange::new(
                r.start_row,
                r.start_col,
                r.end_row.min(full.end_row),
                r.end_col.min(full.end_col),
            ),
            _ => full,
        }
    }
}
