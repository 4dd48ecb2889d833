use serde::{Deserialize, Serialize};

use crate::cell_ref::cell_ref;

/// Zero-based `(row, col)` address of a cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct CellAddr {
    pub row: u32,
    pub col: u32,
}

impl CellAddr {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Spreadsheet-style reference, e.g. `B3`.
    pub fn a1(&self) -> String {
        cell_ref(self.row, self.col)
    }
}

impl From<(u32, u32)> for CellAddr {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

/// A rectangular range of cells, inclusive on both ends.
///
/// Constructors normalize so that `start <= end` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl CellRange {
    pub fn new(r1: u32, c1: u32, r2: u32, c2: u32) -> Self {
        Self {
            start_row: r1.min(r2),
            start_col: c1.min(c2),
            end_row: r1.max(r2),
            end_col: c1.max(c2),
        }
    }

    pub fn single(addr: CellAddr) -> Self {
        Self::new(addr.row, addr.col, addr.row, addr.col)
    }

    pub fn from_corners(a: CellAddr, b: CellAddr) -> Self {
        Self::new(a.row, a.col, b.row, b.col)
    }

    /// Smallest range covering every address, or `None` for an empty input.
    pub fn bounding<I>(cells: I) -> Option<Self>
    where
        I: IntoIterator<Item = CellAddr>,
    {
        cells.into_iter().fold(None, |acc, addr| {
            Some(match acc {
                None => Self::single(addr),
                Some(r) => Self {
                    start_row: r.start_row.min(addr.row),
                    start_col: r.start_col.min(addr.col),
                    end_row: r.end_row.max(addr.row),
                    end_col: r.end_col.max(addr.col),
                },
            })
        })
    }

    /// Re-normalize after field-wise mutation.
    pub fn normalized(self) -> Self {
        Self::new(self.start_row, self.start_col, self.end_row, self.end_col)
    }

    pub fn top_left(&self) -> CellAddr {
        CellAddr::new(self.start_row, self.start_col)
    }

    pub fn contains(&self, addr: CellAddr) -> bool {
        self.contains_cell(addr.row, addr.col)
    }

    pub fn contains_cell(&self, row: u32, col: u32) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &CellRange) -> bool {
        self.contains(other.top_left()) && self.contains_cell(other.end_row, other.end_col)
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.start_row <= other.end_row
            && other.start_row <= self.end_row
            && self.start_col <= other.end_col
            && other.start_col <= self.end_col
    }

    pub fn row_count(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn col_count(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count()) * u64::from(self.col_count())
    }

    pub fn is_single(&self) -> bool {
        self.start_row == self.end_row && self.start_col == self.end_col
    }

    /// Iterate over all cells in this range (row-major order).
    pub fn cells(&self) -> impl Iterator<Item = CellAddr> {
        let (start_col, end_col) = (self.start_col, self.end_col);
        (self.start_row..=self.end_row)
            .flat_map(move |row| (start_col..=end_col).map(move |col| CellAddr::new(row, col)))
    }

    /// `A1:B2` notation (a single cell prints as `A1`).
    pub fn to_a1(&self) -> String {
        if self.is_single() {
            cell_ref(self.start_row, self.start_col)
        } else {
            format!(
                "{}:{}",
                cell_ref(self.start_row, self.start_col),
                cell_ref(self.end_row, self.end_col)
            )
        }
    }
}
