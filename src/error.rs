//! Structured error types for xledit.
//!
//! Every variant is recoverable: a failing operation leaves the document in
//! its last-known-good state.

/// All errors that can occur while editing, importing or persisting a sheet.
#[derive(Debug, thiserror::Error)]
pub enum XleditError {
    /// Malformed input or a rejected edit (bad CSV/XLSX, empty field, out of bounds).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Merge rejected (too few cells, overlapping an existing merge).
    #[error("Cannot merge cells: {0}")]
    Merge(String),

    /// Unmerge rejected (target is not part of a merge).
    #[error("Cannot unmerge cells: {0}")]
    Unmerge(String),

    /// The formula evaluator failed or could not be reached.
    #[error("Formula evaluation failed: {0}")]
    Evaluation(String),

    /// Save, load or credential check failed.
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Invalid cell reference.
    #[error("Invalid cell reference: {0}")]
    CellRef(String),

    /// JSON (de)serialization error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 transport decoding error.
    #[error("Base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// CSV reader/writer error.
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XleditError>;

impl XleditError {
    /// Whether this error came from malformed user input rather than a collaborator.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::CellRef(_) | Self::Json(_) | Self::Base64(_) | Self::Csv(_)
        )
    }
}

#[cfg(target_arch = "wasm32")]
impl From<XleditError> for wasm_bindgen::JsValue {
    fn from(e: XleditError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
