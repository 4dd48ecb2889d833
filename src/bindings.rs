//! JavaScript facade over [`SheetEditor`].
//!
//! The host drives the editor with JSON [`Command`]s and reads the document
//! back as JSON. Formula evaluation stays on the host side: a
//! `commitFormulaBar` command answers with an evaluation request, and the
//! host feeds the evaluator's reply back through `applyEvaluation`.

use wasm_bindgen::prelude::*;

use crate::config::EditorConfig;
use crate::editor::{Command, CommandOutput, SheetEditor};
use crate::types::CellAddr;
use crate::xlsx::ZipXlsxParser;

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// The editor exported to JavaScript.
#[wasm_bindgen]
pub struct XlEdit {
    editor: SheetEditor,
}

#[wasm_bindgen]
impl XlEdit {
    /// Create an editor. `config_json` may be empty for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<XlEdit, JsValue> {
        console_error_panic_hook::set_once();
        let config = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            EditorConfig::from_json_str(config_json)?
        };
        Ok(XlEdit {
            editor: SheetEditor::new(config)?,
        })
    }

    /// Tag subsequent history entries with `name`.
    #[wasm_bindgen(js_name = setUserName)]
    pub fn set_user_name(&mut self, name: Option<String>) {
        self.editor.set_user_name(name);
    }

    /// Apply a command given as a JS object. Returns the command output object.
    pub fn dispatch(&mut self, command: JsValue) -> Result<JsValue, JsValue> {
        let command: Command = serde_wasm_bindgen::from_value(command).map_err(js_err)?;
        let output = self.editor.dispatch(command)?;
        serde_wasm_bindgen::to_value(&output).map_err(js_err)
    }

    /// Apply a command given as JSON text. Returns the output as JSON text.
    #[wasm_bindgen(js_name = dispatchJson)]
    pub fn dispatch_json(&mut self, command_json: &str) -> Result<String, JsValue> {
        let command: Command = serde_json::from_str(command_json).map_err(js_err)?;
        let output: CommandOutput = self.editor.dispatch(command)?;
        serde_json::to_string(&output).map_err(js_err)
    }

    /// The full document as JSON.
    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        Ok(self.editor.to_json()?)
    }

    /// Replace the document from JSON.
    #[wasm_bindgen(js_name = loadJson)]
    pub fn load_json(&mut self, json: &str) -> Result<(), JsValue> {
        Ok(self.editor.load_json(json)?)
    }

    /// Rendering hints for one cell: `{colspan, rowspan, shouldRender}`.
    #[wasm_bindgen(js_name = cellSpan)]
    pub fn cell_span(&self, row: u32, col: u32) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.editor.cell_span(row, col)).map_err(js_err)
    }

    /// Print-area highlight flags for one cell.
    #[wasm_bindgen(js_name = printCellState)]
    pub fn print_cell_state(&self, row: u32, col: u32) -> Result<JsValue, JsValue> {
        let state = self.editor.print_cell_state(CellAddr::new(row, col));
        serde_wasm_bindgen::to_value(&state).map_err(js_err)
    }

    #[wasm_bindgen(js_name = formulaText)]
    pub fn formula_text(&self) -> String {
        self.editor.formula_bar().text().to_string()
    }

    /// Import an XLSX file, replacing the grid.
    #[wasm_bindgen(js_name = importXlsx)]
    pub fn import_xlsx(
        &mut self,
        data: &[u8],
        file_name: &str,
        sheet_name: Option<String>,
    ) -> Result<(), JsValue> {
        Ok(self
            .editor
            .import_xlsx(&ZipXlsxParser, data, file_name, sheet_name.as_deref())?)
    }

    /// Export the grid as XLSX bytes.
    #[wasm_bindgen(js_name = exportXlsx)]
    pub fn export_xlsx(&self) -> Result<Vec<u8>, JsValue> {
        Ok(self.editor.export_xlsx()?)
    }
}
