//! Drag-to-resize gestures for columns, rows and cell media.
//!
//! One gesture at a time. The committed dimensions are untouched until
//! [`ResizeState::commit`]; Escape ([`ResizeState::cancel`]) drops the delta.

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::error::{Result, XleditError};
use crate::history::Change;
use crate::types::{CellAddr, MediaPlacement, SpreadsheetDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResizeTarget {
    Column { col: u32 },
    Row { row: u32 },
    Media { cell: CellAddr },
}

/// Lower bounds applied while dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeLimits {
    pub min_column_width: f64,
    pub min_row_height: f64,
    pub min_media_size: f64,
}

impl From<&EditorConfig> for ResizeLimits {
    fn from(config: &EditorConfig) -> Self {
        Self {
            min_column_width: config.min_column_width,
            min_row_height: config.min_row_height,
            min_media_size: config.min_media_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gesture {
    target: ResizeTarget,
    origin: (f64, f64),
    /// (width, height) at gesture start; only one axis matters for rows/columns
    initial: (f64, f64),
    current: (f64, f64),
}

#[derive(Debug, Clone, Default)]
pub struct ResizeState {
    gesture: Option<Gesture>,
}

impl ResizeState {
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn target(&self) -> Option<ResizeTarget> {
        self.gesture.map(|g| g.target)
    }

    /// Size the target would get if the gesture were committed now.
    pub fn preview(&self) -> Option<(f64, f64)> {
        self.gesture.map(|g| g.current)
    }

    /// Start dragging at pointer position `(x, y)`.
    pub fn begin(
        &mut self,
        doc: &SpreadsheetDocument,
        target: ResizeTarget,
        x: f64,
        y: f64,
    ) -> Result<()> {
        if self.gesture.is_some() {
            return Err(XleditError::Validation(
                "another resize is in progress".into(),
            ));
        }
        let initial = current_size(doc, target)?;
        self.gesture = Some(Gesture {
            target,
            origin: (x, y),
            initial,
            current: initial,
        });
        tracing::trace!(?target, "resize started");
        Ok(())
    }

    /// Track the pointer, clamping to the configured minimums.
    pub fn update(&mut self, x: f64, y: f64, limits: ResizeLimits) {
        let Some(ref mut g) = self.gesture else {
            return;
        };
        let (dx, dy) = (x - g.origin.0, y - g.origin.1);
        g.current = match g.target {
            ResizeTarget::Column { .. } => {
                ((g.initial.0 + dx).max(limits.min_column_width), g.initial.1)
            }
            ResizeTarget::Row { .. } => (g.initial.0, (g.initial.1 + dy).max(limits.min_row_height)),
            ResizeTarget::Media { .. } => (
                (g.initial.0 + dx).max(limits.min_media_size),
                (g.initial.1 + dy).max(limits.min_media_size),
            ),
        };
    }

    /// Apply the previewed size. `None` when nothing changed.
    pub fn commit(&mut self, doc: &mut SpreadsheetDocument) -> Result<Option<Change>> {
        let Some(g) = self.gesture.take() else {
            return Ok(None);
        };
        let (width, height) = g.current;
        match g.target {
            ResizeTarget::Column { col } => doc.set_column_width(col, width),
            ResizeTarget::Row { row } => doc.set_row_height(row, height),
            ResizeTarget::Media { cell } => {
                if g.current == g.initial {
                    return Ok(None);
                }
                let slot = media_placement_mut(doc, cell)?;
                let placement = slot.get_or_insert(MediaPlacement {
                    x: 0.0,
                    y: 0.0,
                    width,
                    height,
                });
                placement.width = width;
                placement.height = height;
                Ok(Some(Change::new(
                    "Resize media",
                    format!("{}: {width}×{height}", cell.a1()),
                )))
            }
        }
    }

    /// Abandon the gesture. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        self.gesture.take().is_some()
    }
}

fn current_size(doc: &SpreadsheetDocument, target: ResizeTarget) -> Result<(f64, f64)> {
    match target {
        ResizeTarget::Column { col } => doc
            .column_width(col)
            .filter(|_| col < doc.cols)
            .map(|w| (w, 0.0))
            .ok_or_else(|| XleditError::Validation(format!("no column {col}"))),
        ResizeTarget::Row { row } => doc
            .row_height(row)
            .filter(|_| row < doc.rows)
            .map(|h| (0.0, h))
            .ok_or_else(|| XleditError::Validation(format!("no row {row}"))),
        ResizeTarget::Media { cell } => {
            doc.check_in_bounds(cell)?;
            let media = doc
                .cell_at(cell)
                .and_then(|c| c.media.as_ref())
                .ok_or_else(|| XleditError::Validation(format!("{} has no media", cell.a1())))?;
            if media.is_resizable() {
                Ok(media.placement().map_or_else(
                    || crate::merge::merged_footprint(doc, cell.row, cell.col),
                    |p| (p.width, p.height),
                ))
            } else {
                Err(XleditError::Validation(format!(
                    "{} media cannot be resized",
                    media.kind()
                )))
            }
        }
    }
}

fn media_placement_mut(
    doc: &mut SpreadsheetDocument,
    cell: CellAddr,
) -> Result<&mut Option<MediaPlacement>> {
    doc.cell_mut(cell.row, cell.col)
        .and_then(|c| c.media.as_mut())
        .and_then(|m| m.placement_mut())
        .ok_or_else(|| XleditError::Validation(format!("{} has no resizable media", cell.a1())))
}
