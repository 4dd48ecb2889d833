use serde::{Deserialize, Serialize};

use super::{CellAddr, CellRange, CellStyle};

/// A single cell's content, style and merge metadata.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Deterministic id assigned at creation (`r{row}c{col}`)
    pub id: String,
    /// Raw text as entered (formulas keep their leading `=`)
    #[serde(default)]
    pub value: String,
    /// Formula source without the `=` sigil
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Last evaluator result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_value: Option<String>,
    /// Last evaluator diagnostic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub is_formula: bool,
    #[serde(default)]
    pub style: CellStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<CellMedia>,
    /// Part of a merged range (master included)
    #[serde(default)]
    pub merged: bool,
    /// Top-left cell of the merge this cell belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_cell: Option<CellAddr>,
    /// Full merged footprint; set on the master only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_range: Option<CellRange>,
}

impl Cell {
    /// A blank, unstyled cell for the given position.
    pub fn blank(row: u32, col: u32) -> Self {
        Self {
            id: format!("r{row}c{col}"),
            value: String::new(),
            formula: None,
            computed_value: None,
            error: None,
            is_formula: false,
            style: CellStyle::default(),
            media: None,
            merged: false,
            master_cell: None,
            merge_range: None,
        }
    }

    /// A blank-styled cell holding plain text.
    pub fn with_value(row: u32, col: u32, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::blank(row, col)
        }
    }

    /// Value shown in the grid: evaluator result, then error, then raw text.
    pub fn display_value(&self) -> &str {
        if let Some(ref v) = self.computed_value {
            return v;
        }
        if let Some(ref e) = self.error {
            return e;
        }
        &self.value
    }

    /// Text mirrored into the formula bar.
    pub fn edit_text(&self) -> String {
        match self.formula {
            Some(ref f) if self.is_formula => format!("={f}"),
            _ => self.value.clone(),
        }
    }

    pub fn is_master(&self) -> bool {
        self.merge_range.is_some()
    }

    /// Merged into another cell's footprint (not the master).
    pub fn is_covered(&self) -> bool {
        self.merged && self.merge_range.is_none()
    }

    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.formula.is_none() && self.media.is_none()
    }

    /// Overwrite with plain text, dropping formula state.
    pub fn set_plain_value(&mut self, text: &str) {
        self.value = text.to_string();
        self.formula = None;
        self.computed_value = None;
        self.error = None;
        self.is_formula = false;
    }

    pub(crate) fn clear_merge(&mut self) {
        self.merged = false;
        self.master_cell = None;
        self.merge_range = None;
    }
}

/// Media embedded in a cell.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CellMedia {
    Image {
        source: MediaSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placement: Option<MediaPlacement>,
    },
    Video {
        source: MediaSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placement: Option<MediaPlacement>,
    },
    Audio {
        source: MediaSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placement: Option<MediaPlacement>,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
}

impl CellMedia {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
            Self::Link { .. } => "link",
            Self::Table { .. } => "table",
        }
    }

    /// Image, video and audio can be freely placed and resized.
    pub fn is_resizable(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::Video { .. } | Self::Audio { .. })
    }

    /// Free placement inside the cell, for resizable kinds.
    pub fn placement(&self) -> Option<&MediaPlacement> {
        match self {
            Self::Image { placement, .. }
            | Self::Video { placement, .. }
            | Self::Audio { placement, .. } => placement.as_ref(),
            Self::Link { .. } | Self::Table { .. } => None,
        }
    }

    pub fn placement_mut(&mut self) -> Option<&mut Option<MediaPlacement>> {
        match self {
            Self::Image { placement, .. }
            | Self::Video { placement, .. }
            | Self::Audio { placement, .. } => Some(placement),
            Self::Link { .. } | Self::Table { .. } => None,
        }
    }
}

/// Where media bytes come from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MediaSource {
    Url {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Bytes {
        mime_type: String,
        /// Base64-encoded payload
        data_base64: String,
    },
}

/// Position and size of media inside its cell, in pixels.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct MediaPlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
