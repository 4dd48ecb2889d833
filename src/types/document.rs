use serde::{Deserialize, Serialize};

use super::{Cell, GlobalStyles};
use crate::grid::blank_matrix;
use crate::history::History;

/// The persisted unit: grid, dimensions, styles and history.
///
/// Serializes to exactly
/// `{name, rows, cols, cellMatrix, history, columnWidths, rowHeights, globalStyles}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetDocument {
    pub name: String,
    pub rows: u32,
    pub cols: u32,
    /// Row-major cells; `cell_matrix[row][col]`
    pub cell_matrix: Vec<Vec<Cell>>,
    #[serde(default)]
    pub history: History,
    /// Per-column widths in pixels (at least `cols` entries)
    pub column_widths: Vec<f64>,
    /// Per-row heights in pixels (at least `rows` entries)
    pub row_heights: Vec<f64>,
    #[serde(default)]
    pub global_styles: GlobalStyles,
}

impl SpreadsheetDocument {
    /// A blank `rows × cols` document.
    pub fn blank(
        name: impl Into<String>,
        rows: u32,
        cols: u32,
        column_width: f64,
        row_height: f64,
    ) -> Self {
        Self {
            name: name.into(),
            rows,
            cols,
            cell_matrix: blank_matrix(rows, cols),
            history: History::default(),
            column_widths: vec![column_width; cols as usize],
            row_heights: vec![row_height; rows as usize],
            global_styles: GlobalStyles::default(),
        }
    }
}
