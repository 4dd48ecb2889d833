//! Editor configuration.
//!
//! Every field has a default, so a config file only needs the keys it overrides:
//!
//! ```json
//! { "defaultRows": 50, "historyCapacity": 100, "csvDelimiter": ";" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XleditError};
use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Default column width in pixels
pub const DEFAULT_COL_WIDTH: f64 = 100.0;

/// Default row height in pixels
pub const DEFAULT_ROW_HEIGHT: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Name given to new documents
    pub document_name: String,
    /// Dimensions of a new blank document
    pub default_rows: u32,
    pub default_cols: u32,
    /// Width/height given to new columns and rows
    pub column_width: f64,
    pub row_height: f64,
    /// Lower bounds enforced by resize gestures
    pub min_column_width: f64,
    pub min_row_height: f64,
    pub min_media_size: f64,
    /// Number of retained history entries
    pub history_capacity: usize,
    /// Field separator for CSV import/export
    pub csv_delimiter: char,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            document_name: "Untitled".to_string(),
            default_rows: 20,
            default_cols: 10,
            column_width: DEFAULT_COL_WIDTH,
            row_height: DEFAULT_ROW_HEIGHT,
            min_column_width: 30.0,
            min_row_height: 15.0,
            min_media_size: 16.0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            csv_delimiter: ',',
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject settings the editor cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.default_rows == 0 || self.default_cols == 0 {
            return Err(XleditError::Validation(
                "default grid must have at least one row and column".into(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(XleditError::Validation("history capacity must be positive".into()));
        }
        let sizes = [
            self.column_width,
            self.row_height,
            self.min_column_width,
            self.min_row_height,
            self.min_media_size,
        ];
        if sizes.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(XleditError::Validation("sizes must be positive".into()));
        }
        if !self.csv_delimiter.is_ascii() || self.csv_delimiter == '"' {
            return Err(XleditError::Validation(format!(
                "unsupported CSV delimiter {:?}",
                self.csv_delimiter
            )));
        }
        Ok(())
    }

    /// The CSV delimiter as the byte the `csv` crate expects.
    pub fn csv_delimiter_byte(&self) -> u8 {
        u8::try_from(self.csv_delimiter).unwrap_or(b',')
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EditorConfig::from_json_str(r#"{"defaultRows": 5, "csvDelimiter": ";"}"#).unwrap();
        assert_eq!(config.default_rows, 5);
        assert_eq!(config.default_cols, 10);
        assert_eq!(config.csv_delimiter_byte(), b';');
        assert_eq!(config.column_width, DEFAULT_COL_WIDTH);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(EditorConfig::from_json_str(r#"{"historyCapacity": 0}"#).is_err());
        assert!(EditorConfig::from_json_str(r#"{"defaultCols": 0}"#).is_err());
        assert!(EditorConfig::from_json_str(r#"{"csvDelimiter": "é"}"#).is_err());
        assert!(EditorConfig::from_json_str(r#"{"rowHeight": -1}"#).is_err());
    }
}
