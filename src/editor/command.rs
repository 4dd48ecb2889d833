//! Serializable editor commands.
//!
//! Hosts that talk to the editor over a message boundary (the wasm facade,
//! the CLI's script mode) send a [`Command`] and get a [`CommandOutput`].
//!
//! ```json
//! { "type": "setCellValue", "row": 0, "col": 1, "value": "42" }
//! ```

use serde::{Deserialize, Serialize};

use super::SheetEditor;
use crate::error::{Result, XleditError};
use crate::formula::{EvaluationOutcome, EvaluationRequest, EvaluationResponse};
use crate::resize::ResizeTarget;
use crate::types::{CellAddr, CellMedia, CellRange, StylePatch};

/// Which cells a CSV export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CsvScope {
    #[default]
    Document,
    PrintArea,
    Selection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    SetCellValue {
        row: u32,
        col: u32,
        value: String,
    },
    /// Style the given cells, or the selection when `cells` is omitted
    ApplyStyle {
        patch: StylePatch,
        #[serde(default)]
        cells: Option<Vec<CellAddr>>,
    },
    ClearCells {
        #[serde(default)]
        cells: Option<Vec<CellAddr>>,
    },
    SetMedia {
        row: u32,
        col: u32,
        media: Option<CellMedia>,
    },
    ResizeGrid {
        rows: u32,
        cols: u32,
    },
    AddRow {
        #[serde(default)]
        at: Option<u32>,
    },
    AddColumn {
        #[serde(default)]
        at: Option<u32>,
    },
    RemoveRow {
        #[serde(default)]
        at: Option<u32>,
    },
    RemoveColumn {
        #[serde(default)]
        at: Option<u32>,
    },
    PointerDown {
        row: u32,
        col: u32,
        #[serde(default)]
        additive: bool,
    },
    PointerMove {
        row: u32,
        col: u32,
    },
    PointerUp,
    SelectCell {
        row: u32,
        col: u32,
    },
    SelectRange {
        range: CellRange,
    },
    ClearSelection,
    MergeSelection,
    Unmerge {
        row: u32,
        col: u32,
    },
    ActivatePrintArea,
    ConfirmPrintArea,
    ClearPrintArea,
    FocusFormulaBar {
        row: u32,
        col: u32,
    },
    SetFormulaText {
        text: String,
    },
    CommitFormulaBar,
    ApplyEvaluation {
        response: EvaluationResponse,
    },
    BeginResize {
        target: ResizeTarget,
        x: f64,
        y: f64,
    },
    UpdateResize {
        x: f64,
        y: f64,
    },
    CommitResize,
    CancelResize,
    Escape,
    ImportCsv {
        text: String,
        #[serde(default)]
        delimiter: Option<char>,
    },
    ExportCsv {
        #[serde(default)]
        scope: CsvScope,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CommandOutput {
    /// `changed` is false when the command was a no-op
    Done { changed: bool },
    Evaluation { request: EvaluationRequest },
    Range { range: Option<CellRange> },
    Applied { updated: usize },
    Stale,
    Csv { text: String },
}

impl CommandOutput {
    fn done(changed: bool) -> Self {
        Self::Done { changed }
    }
}

impl From<EvaluationOutcome> for CommandOutput {
    fn from(outcome: EvaluationOutcome) -> Self {
        match outcome {
            EvaluationOutcome::Applied { updated } => Self::Applied { updated },
            EvaluationOutcome::Stale => Self::Stale,
        }
    }
}

fn delimiter_byte(delimiter: Option<char>) -> Result<Option<u8>> {
    delimiter
        .map(|c| {
            u8::try_from(c)
                .ok()
                .filter(|b| b.is_ascii() && *b != b'"')
                .ok_or_else(|| XleditError::Validation(format!("unsupported CSV delimiter {c:?}")))
        })
        .transpose()
}

pub(super) fn dispatch(editor: &mut SheetEditor, command: Command) -> Result<CommandOutput> {
    tracing::trace!(?command, "dispatch");
    let output = match command {
        Command::SetCellValue { row, col, value } => {
            CommandOutput::done(editor.set_cell_value(row, col, &value)?)
        }
        Command::ApplyStyle { patch, cells } => CommandOutput::done(match cells {
            Some(cells) => editor.apply_style_to(&cells, &patch)?,
            None => editor.apply_style(&patch)?,
        }),
        Command::ClearCells { cells } => CommandOutput::done(match cells {
            Some(cells) => editor.clear_cells(&cells)?,
            None => editor.clear_selected_cells()?,
        }),
        Command::SetMedia { row, col, media } => {
            CommandOutput::done(editor.set_media(row, col, media)?)
        }
        Command::ResizeGrid { rows, cols } => CommandOutput::done(editor.resize_grid(rows, cols)?),
        Command::AddRow { at } => {
            editor.add_row(at)?;
            CommandOutput::done(true)
        }
        Command::AddColumn { at } => {
            editor.add_column(at)?;
            CommandOutput::done(true)
        }
        Command::RemoveRow { at } => CommandOutput::done(editor.remove_row(at)?),
        Command::RemoveColumn { at } => CommandOutput::done(editor.remove_column(at)?),
        Command::PointerDown { row, col, additive } => {
            editor.pointer_down(CellAddr::new(row, col), additive)?;
            CommandOutput::done(false)
        }
        Command::PointerMove { row, col } => {
            editor.pointer_move(CellAddr::new(row, col));
            CommandOutput::done(false)
        }
        Command::PointerUp => {
            editor.pointer_up();
            CommandOutput::done(false)
        }
        Command::SelectCell { row, col } => {
            editor.select_cell(CellAddr::new(row, col))?;
            CommandOutput::done(false)
        }
        Command::SelectRange { range } => {
            editor.select_range(range)?;
            CommandOutput::done(false)
        }
        Command::ClearSelection => {
            editor.clear_selection();
            CommandOutput::done(false)
        }
        Command::MergeSelection => CommandOutput::Range {
            range: Some(editor.merge_selection()?),
        },
        Command::Unmerge { row, col } => CommandOutput::Range {
            range: Some(editor.unmerge(row, col)?),
        },
        Command::ActivatePrintArea => {
            editor.activate_print_area();
            CommandOutput::done(false)
        }
        Command::ConfirmPrintArea => CommandOutput::Range {
            range: editor.confirm_print_area(),
        },
        Command::ClearPrintArea => CommandOutput::done(editor.clear_print_area()),
        Command::FocusFormulaBar { row, col } => {
            editor.focus_formula_bar(CellAddr::new(row, col))?;
            CommandOutput::done(false)
        }
        Command::SetFormulaText { text } => {
            editor.set_formula_text(&text);
            CommandOutput::done(false)
        }
        Command::CommitFormulaBar => match editor.commit_formula_bar()? {
            Some(request) => CommandOutput::Evaluation { request },
            None => CommandOutput::done(true),
        },
        Command::ApplyEvaluation { response } => editor.apply_evaluation(&response).into(),
        Command::BeginResize { target, x, y } => {
            editor.begin_resize(target, x, y)?;
            CommandOutput::done(false)
        }
        Command::UpdateResize { x, y } => {
            editor.update_resize(x, y);
            CommandOutput::done(false)
        }
        Command::CommitResize => CommandOutput::done(editor.commit_resize()?),
        Command::CancelResize => CommandOutput::done(editor.cancel_resize()),
        Command::Escape => CommandOutput::done(editor.escape()),
        Command::ImportCsv { text, delimiter } => {
            editor.import_csv(&text, delimiter_byte(delimiter)?)?;
            CommandOutput::done(true)
        }
        Command::ExportCsv { scope } => CommandOutput::Csv {
            text: editor.export_csv(scope)?,
        },
    };
    Ok(output)
}
