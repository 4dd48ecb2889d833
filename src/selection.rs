//! Selection & range engine.
//!
//! A drag selects a rectangle anchored at the press point; an additive press
//! (Ctrl/Cmd-click) toggles one cell without starting a drag. The rectangle
//! is always materialized into the explicit cell set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{CellAddr, CellRange};

/// Pointer-gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SelectionState {
    #[default]
    Idle,
    Selecting {
        anchor: CellAddr,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    state: SelectionState,
    cells: BTreeSet<CellAddr>,
    range: Option<CellRange>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.state, SelectionState::Selecting { .. })
    }

    /// Press on a cell. Non-additive presses start a rectangle at `addr`.
    pub fn pointer_down(&mut self, addr: CellAddr, additive: bool) {
        if additive {
            if !self.cells.remove(&addr) {
                self.cells.insert(addr);
            }
            self.range = None;
            self.state = SelectionState::Idle;
            return;
        }
        self.state = SelectionState::Selecting { anchor: addr };
        self.set_rect(CellRange::single(addr));
    }

    /// Drag over a cell. Ignored unless a rectangle is being dragged.
    pub fn pointer_move(&mut self, addr: CellAddr) {
        if let SelectionState::Selecting { anchor } = self.state {
            self.set_rect(CellRange::from_corners(anchor, addr));
        }
    }

    /// Release the pointer, committing the current selection.
    pub fn pointer_up(&mut self) {
        if self.is_selecting() {
            tracing::trace!(cells = self.cells.len(), "selection committed");
        }
        self.state = SelectionState::Idle;
    }

    pub fn clear(&mut self) {
        self.state = SelectionState::Idle;
        self.cells.clear();
        self.range = None;
    }

    pub fn select_single(&mut self, addr: CellAddr) {
        self.state = SelectionState::Idle;
        self.set_rect(CellRange::single(addr));
    }

    /// Replace the selection with a rectangle.
    pub fn select_range(&mut self, range: CellRange) {
        self.state = SelectionState::Idle;
        self.set_rect(range.normalized());
    }

    pub fn selected_cells(&self) -> impl Iterator<Item = CellAddr> + '_ {
        self.cells.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The dragged rectangle, if the selection came from one.
    pub fn range(&self) -> Option<CellRange> {
        self.range
    }

    /// Smallest rectangle covering every selected cell.
    pub fn bounding_range(&self) -> Option<CellRange> {
        CellRange::bounding(self.cells.iter().copied())
    }

    pub fn is_selected(&self, addr: CellAddr) -> bool {
        self.cells.contains(&addr)
    }

    /// First selected cell in row-major order.
    pub fn primary(&self) -> Option<CellAddr> {
        self.cells.first().copied()
    }

    /// Drop cells that fell outside a `rows × cols` grid.
    pub(crate) fn clamp_to(&mut self, rows: u32, cols: u32) {
        self.cells.retain(|a| a.row < rows && a.col < cols);
        if self
            .range
            .is_some_and(|r| r.end_row >= rows || r.end_col >= cols)
        {
            self.range = None;
        }
    }

    fn set_rect(&mut self, range: CellRange) {
        self.cells = range.cells().collect();
        self.range = Some(range);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn a(row: u32, col: u32) -> CellAddr {
        CellAddr::new(row, col)
    }

    #[test]
    fn test_drag_selects_inclusive_rectangle_in_any_direction() {
        let mut sel = SelectionEngine::new();
        sel.pointer_down(a(2, 2), false);
        sel.pointer_move(a(0, 3));
        assert!(sel.is_selecting());
        sel.pointer_move(a(0, 0));
        sel.pointer_up();
        assert_eq!(sel.state(), SelectionState::Idle);
        assert_eq!(sel.range(), Some(CellRange::new(0, 0, 2, 2)));
        assert_eq!(sel.len(), 9);
        assert!(!sel.is_selected(a(0, 3)));
    }

    #[test]
    fn test_additive_toggles_without_drag() {
        let mut sel = SelectionEngine::new();
        sel.pointer_down(a(0, 0), true);
        sel.pointer_down(a(3, 3), true);
        sel.pointer_move(a(4, 4));
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.range(), None);
        assert_eq!(sel.bounding_range(), Some(CellRange::new(0, 0, 3, 3)));
        sel.pointer_down(a(0, 0), true);
        assert_eq!(sel.selected_cells().collect::<Vec<_>>(), vec![a(3, 3)]);
    }

    #[test]
    fn test_move_after_release_is_ignored() {
        let mut sel = SelectionEngine::new();
        sel.pointer_down(a(1, 1), false);
        sel.pointer_up();
        sel.pointer_move(a(3, 3));
        assert_eq!(sel.len(), 1);
        sel.clear();
        assert!(sel.is_empty());
    }
}
