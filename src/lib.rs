//! xledit - spreadsheet grid editor core
//!
//! Owns an editable grid document and the interactions around it:
//! - Cell values, styles, media and structural edits (rows, columns, sizes)
//! - Rectangular merges with master/covered bookkeeping
//! - Drag selection and an independent print-area selection
//! - Formula entry with an external evaluator and stale-response protection
//! - A bounded audit history with operator-only editing
//! - CSV, XLSX and JSON template import/export
//!
//! # Usage (Rust)
//!
//! ```no_run
//! use xledit::{EditorConfig, SheetEditor};
//!
//! let mut editor = SheetEditor::new(EditorConfig::default())?;
//! editor.set_cell_value(0, 0, "Revenue")?;
//! let csv = editor.export_csv(xledit::CsvScope::Document)?;
//! # Ok::<(), xledit::XleditError>(())
//! ```
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { XlEdit } from 'xledit';
//! await init();
//! const editor = new XlEdit('');
//! editor.dispatch({ type: 'setCellValue', row: 0, col: 0, value: '42' });
//! ```

// Document model
pub mod cell_ref;
pub mod config;
pub mod error;
pub mod grid;
pub mod history;
pub mod merge;
pub mod types;

// Interaction state
pub mod editor;
pub mod formula;
pub mod print_area;
pub mod resize;
pub mod selection;

// Import / export and collaborators
pub mod csv;
pub mod export;
pub mod services;
pub mod template;
pub mod xlsx;
pub mod xml_helpers;

#[cfg(target_arch = "wasm32")]
pub mod bindings;

use wasm_bindgen::prelude::*;

pub use config::EditorConfig;
pub use editor::{Command, CommandOutput, CsvScope, SheetEditor};
pub use error::{Result, XleditError};
pub use formula::{EvaluationRequest, EvaluationResponse, FormulaEvaluator};
pub use services::{IdentityService, PersistenceService, XlsxParser};
pub use types::*;
pub use xlsx::ZipXlsxParser;

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
