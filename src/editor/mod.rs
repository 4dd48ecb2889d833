//! The editing session.
//!
//! [`SheetEditor`] owns one [`SpreadsheetDocument`] plus the transient
//! gesture state around it (selection, print area, formula bar, resize,
//! audit mode). Every successful document mutation goes through
//! [`SheetEditor::record`], which appends exactly one history entry.

mod command;
pub(crate) mod mutation;

pub use command::{Command, CommandOutput, CsvScope};

use chrono::{DateTime, Utc};

use crate::config::EditorConfig;
use crate::error::{Result, XleditError};
use crate::formula::{
    self, BarCommit, EvaluationOutcome, EvaluationRequest, EvaluationResponse, FormulaBar,
    FormulaEvaluator, FormulaValidation, FunctionSuggestion, PendingEvaluation,
};
use crate::grid::GridDefaults;
use crate::history::{AuditEditor, Change, History, HistoryEntry, HistoryField, KeyChord};
use crate::merge::{self, CellSpan};
use crate::print_area::{PrintAreaState, PrintCellState};
use crate::resize::{ResizeLimits, ResizeState, ResizeTarget};
use crate::selection::SelectionEngine;
use crate::services::{
    Credentials, IdentityService, PersistenceService, TemplateMetadata, XlsxParser,
};
use crate::types::{Cell, CellAddr, CellMedia, CellRange, SpreadsheetDocument, StylePatch};

pub struct SheetEditor {
    doc: SpreadsheetDocument,
    config: EditorConfig,
    selection: SelectionEngine,
    print_area: PrintAreaState,
    formula_bar: FormulaBar,
    audit: AuditEditor,
    resize: ResizeState,
    pending: Option<PendingEvaluation>,
    next_request_id: u64,
    user_name: Option<String>,
}

impl SheetEditor {
    /// A session over a blank document sized by `config`.
    pub fn new(config: EditorConfig) -> Result<Self> {
        config.validate()?;
        let doc = SpreadsheetDocument::blank(
            config.document_name.clone(),
            config.default_rows,
            config.default_cols,
            config.column_width,
            config.row_height,
        );
        Self::with_document(doc, config)
    }

    /// A session over an existing document, validated first.
    pub fn with_document(mut doc: SpreadsheetDocument, config: EditorConfig) -> Result<Self> {
        config.validate()?;
        doc.normalize(GridDefaults::from(&config))?;
        doc.history.set_capacity(config.history_capacity);
        Ok(Self {
            doc,
            config,
            selection: SelectionEngine::new(),
            print_area: PrintAreaState::default(),
            formula_bar: FormulaBar::default(),
            audit: AuditEditor::default(),
            resize: ResizeState::default(),
            pending: None,
            next_request_id: 1,
            user_name: None,
        })
    }

    pub fn document(&self) -> &SpreadsheetDocument {
        &self.doc
    }

    pub fn into_document(self) -> SpreadsheetDocument {
        self.doc
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn print_area(&self) -> &PrintAreaState {
        &self.print_area
    }

    pub fn formula_bar(&self) -> &FormulaBar {
        &self.formula_bar
    }

    pub fn audit(&self) -> &AuditEditor {
        &self.audit
    }

    pub fn resize_state(&self) -> &ResizeState {
        &self.resize
    }

    pub fn pending_evaluation(&self) -> Option<&PendingEvaluation> {
        self.pending.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.doc.history
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// Tag subsequent history entries with the identity service's user.
    pub fn attach_identity(&mut self, identity: &dyn IdentityService) {
        match identity.current_user_name() {
            Ok(name) => self.user_name = Some(name),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve current user");
                self.user_name = None;
            }
        }
    }

    pub fn set_user_name(&mut self, name: Option<String>) {
        self.user_name = name;
    }

    fn defaults(&self) -> GridDefaults {
        GridDefaults::from(&self.config)
    }

    /// Append one history entry for a completed mutation.
    fn record(&mut self, change: Change) {
        self.record_at(change, Utc::now());
    }

    fn record_at(&mut self, change: Change, timestamp: DateTime<Utc>) {
        tracing::debug!(action = %change.action, details = %change.details, "history");
        let entry = HistoryEntry::from_change(change, timestamp, self.user_name.clone());
        if self.doc.history.push(entry) {
            self.audit.on_entries_shifted();
        }
    }

    fn record_opt(&mut self, change: Option<Change>) -> bool {
        match change {
            Some(change) => {
                self.record(change);
                true
            }
            None => false,
        }
    }

    // ---- Cell & grid ----

    /// Selection and cell editing are suspended while a print area is drawn.
    fn ensure_cell_editing(&self) -> Result<()> {
        if self.print_area.is_active() {
            return Err(XleditError::Validation(
                "cell editing is suspended while choosing a print area".into(),
            ));
        }
        Ok(())
    }

    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.doc.get_cell(row, col)
    }

    /// Overwrite a cell's text. Returns whether anything changed.
    pub fn set_cell_value(&mut self, row: u32, col: u32, text: &str) -> Result<bool> {
        self.ensure_cell_editing()?;
        let change = mutation::apply_cell_edit(&mut self.doc, row, col, text)?;
        if change.is_some() {
            let addr = CellAddr::new(row, col);
            if self.pending.as_ref().is_some_and(|p| p.cell == addr) {
                tracing::debug!(cell = %addr.a1(), "pending evaluation superseded by edit");
                self.pending = None;
            }
            self.refresh_formula_bar(addr);
        }
        Ok(self.record_opt(change))
    }

    /// Apply a style patch to the current selection.
    pub fn apply_style(&mut self, patch: &StylePatch) -> Result<bool> {
        let cells: Vec<CellAddr> = self.selection.selected_cells().collect();
        self.apply_style_to(&cells, patch)
    }

    pub fn apply_style_to(&mut self, cells: &[CellAddr], patch: &StylePatch) -> Result<bool> {
        self.ensure_cell_editing()?;
        let change = mutation::apply_style(&mut self.doc, cells, patch)?;
        Ok(self.record_opt(change))
    }

    /// Clear value, formula and media of the selected cells.
    pub fn clear_selected_cells(&mut self) -> Result<bool> {
        let cells: Vec<CellAddr> = self.selection.selected_cells().collect();
        self.clear_cells(&cells)
    }

    pub fn clear_cells(&mut self, cells: &[CellAddr]) -> Result<bool> {
        self.ensure_cell_editing()?;
        let change = mutation::clear_cells(&mut self.doc, cells)?;
        if change.is_some() {
            if self.pending.as_ref().is_some_and(|p| cells.contains(&p.cell)) {
                tracing::debug!("pending evaluation dropped by clear");
                self.pending = None;
            }
            if let Some(target) = self.formula_bar.target() {
                self.refresh_formula_bar(target);
            }
        }
        Ok(self.record_opt(change))
    }

    pub fn set_media(&mut self, row: u32, col: u32, media: Option<CellMedia>) -> Result<bool> {
        self.ensure_cell_editing()?;
        let change = mutation::set_media(&mut self.doc, row, col, media)?;
        Ok(self.record_opt(change))
    }

    pub fn resize_grid(&mut self, rows: u32, cols: u32) -> Result<bool> {
        let change = self.doc.resize(rows, cols, self.defaults())?;
        let changed = self.record_opt(change);
        if changed {
            self.after_structural_edit();
        }
        Ok(changed)
    }

    pub fn add_row(&mut self, at: Option<u32>) -> Result<()> {
        let change = self.doc.insert_row(at, self.defaults())?;
        self.record(change);
        self.after_structural_edit();
        Ok(())
    }

    pub fn add_column(&mut self, at: Option<u32>) -> Result<()> {
        let change = self.doc.insert_column(at, self.defaults())?;
        self.record(change);
        self.after_structural_edit();
        Ok(())
    }

    /// Remove a row. Removing the only row is a no-op and returns `false`.
    pub fn remove_row(&mut self, at: Option<u32>) -> Result<bool> {
        let change = self.doc.remove_row(at)?;
        let changed = self.record_opt(change);
        if changed {
            self.after_structural_edit();
        }
        Ok(changed)
    }

    /// Remove a column. Removing the only column is a no-op and returns `false`.
    pub fn remove_column(&mut self, at: Option<u32>) -> Result<bool> {
        let change = self.doc.remove_column(at)?;
        let changed = self.record_opt(change);
        if changed {
            self.after_structural_edit();
        }
        Ok(changed)
    }

    /// Coordinates shifted: drop state that pointed at old positions.
    fn after_structural_edit(&mut self) {
        self.selection.clamp_to(self.doc.rows, self.doc.cols);
        if self.pending.take().is_some() {
            tracing::warn!("grid changed shape; pending evaluation dropped");
        }
        self.resize.cancel();
        self.formula_bar.blur();
        if let Some(addr) = self.single_selected() {
            self.refresh_formula_bar(addr);
        }
    }

    fn reset_transient_state(&mut self) {
        self.selection.clear();
        self.print_area = PrintAreaState::default();
        self.formula_bar.blur();
        self.audit.disengage();
        self.resize.cancel();
        self.pending = None;
    }

    // ---- Selection ----

    /// Pointer press. While the print-area mode is on, gestures draw the
    /// print area instead of selecting.
    pub fn pointer_down(&mut self, addr: CellAddr, additive: bool) -> Result<()> {
        self.doc.check_in_bounds(addr)?;
        if self.print_area.is_active() {
            self.print_area.pointer_down(addr);
        } else {
            self.selection.pointer_down(addr, additive);
        }
        Ok(())
    }

    pub fn pointer_move(&mut self, addr: CellAddr) {
        let addr = CellAddr::new(
            addr.row.min(self.doc.rows.saturating_sub(1)),
            addr.col.min(self.doc.cols.saturating_sub(1)),
        );
        if self.print_area.is_active() {
            self.print_area.pointer_move(addr);
        } else {
            self.selection.pointer_move(addr);
        }
    }

    pub fn pointer_up(&mut self) {
        if self.print_area.is_active() {
            self.print_area.pointer_up();
            return;
        }
        self.selection.pointer_up();
        match self.single_selected() {
            Some(addr) => self.refresh_formula_bar(addr),
            None => self.formula_bar.blur(),
        }
    }

    /// Select one cell and mirror it into the formula bar.
    pub fn select_cell(&mut self, addr: CellAddr) -> Result<()> {
        self.ensure_cell_editing()?;
        self.doc.check_in_bounds(addr)?;
        self.selection.select_single(addr);
        self.formula_bar.focus(&self.doc, addr)
    }

    pub fn select_range(&mut self, range: CellRange) -> Result<()> {
        self.ensure_cell_editing()?;
        self.doc
            .check_in_bounds(CellAddr::new(range.end_row, range.end_col))?;
        self.selection.select_range(range);
        match self.single_selected() {
            Some(addr) => self.formula_bar.focus(&self.doc, addr)?,
            None => self.formula_bar.blur(),
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.formula_bar.blur();
    }

    fn single_selected(&self) -> Option<CellAddr> {
        if self.selection.len() == 1 {
            self.selection.primary()
        } else {
            None
        }
    }

    // ---- Merge ----

    /// Merge the selected cells; the selection collapses to the master.
    pub fn merge_selection(&mut self) -> Result<CellRange> {
        self.ensure_cell_editing()?;
        let cells: Vec<CellAddr> = self.selection.selected_cells().collect();
        let range = merge::merge_cells(&mut self.doc, cells)?;
        self.record(Change::new("Merge cells", range.to_a1()));
        let master = range.top_left();
        self.selection.select_single(master);
        self.formula_bar.focus(&self.doc, master)?;
        Ok(range)
    }

    pub fn unmerge(&mut self, row: u32, col: u32) -> Result<CellRange> {
        self.ensure_cell_editing()?;
        let range = merge::unmerge_cells(&mut self.doc, row, col)?;
        self.record(Change::new("Unmerge cells", range.to_a1()));
        Ok(range)
    }

    pub fn cell_span(&self, row: u32, col: u32) -> CellSpan {
        merge::cell_span(&self.doc, row, col)
    }

    pub fn merged_footprint(&self, row: u32, col: u32) -> (f64, f64) {
        merge::merged_footprint(&self.doc, row, col)
    }

    pub fn merge_ranges(&self) -> Vec<CellRange> {
        merge::merge_ranges(&self.doc)
    }

    // ---- Print area ----

    /// Enter print-area mode. Cell selection and editing are suspended.
    pub fn activate_print_area(&mut self) {
        self.selection.pointer_up();
        self.print_area.activate();
    }

    pub fn confirm_print_area(&mut self) -> Option<CellRange> {
        self.print_area.confirm()
    }

    pub fn cancel_print_area(&mut self) {
        self.print_area.deactivate();
    }

    /// Back to whole-document print scope.
    pub fn clear_print_area(&mut self) -> bool {
        self.print_area.clear()
    }

    pub fn print_range(&self) -> CellRange {
        self.print_area.print_range(&self.doc)
    }

    pub fn print_cell_state(&self, addr: CellAddr) -> PrintCellState {
        self.print_area.cell_state(addr)
    }

    // ---- Formula bar ----

    pub fn focus_formula_bar(&mut self, addr: CellAddr) -> Result<()> {
        self.ensure_cell_editing()?;
        self.formula_bar.focus(&self.doc, addr)
    }

    pub fn set_formula_text(&mut self, text: &str) {
        self.formula_bar.set_text(text);
    }

    fn refresh_formula_bar(&mut self, addr: CellAddr) {
        if self.formula_bar.target().is_none() || self.formula_bar.target() == Some(addr) {
            if let Err(e) = self.formula_bar.focus(&self.doc, addr) {
                tracing::debug!(error = %e, "formula bar not refreshed");
            }
        }
    }

    /// Commit the formula bar.
    ///
    /// Plain text is written immediately. Formula text is written into the
    /// cell and returned as a request for the evaluator; the response goes
    /// to [`SheetEditor::apply_evaluation`].
    pub fn commit_formula_bar(&mut self) -> Result<Option<EvaluationRequest>> {
        self.ensure_cell_editing()?;
        match self.formula_bar.commit()? {
            BarCommit::Plain { target, text } => {
                self.set_cell_value(target.row, target.col, &text)?;
                Ok(None)
            }
            BarCommit::Formula { target, formula } => {
                let id = self.next_request_id;
                let old = self
                    .doc
                    .cell_at(target)
                    .map(Cell::edit_text)
                    .unwrap_or_default();
                let (request, pending) = formula::stage_formula(&mut self.doc, id, target, &formula)?;
                self.next_request_id = id.wrapping_add(1);
                if let Some(previous) = self.pending.replace(pending) {
                    tracing::debug!(request = previous.id, "pending evaluation superseded");
                }
                self.record(Change::new(
                    "Enter formula",
                    format!("{}: {old:?} → \"={formula}\"", target.a1()),
                ));
                self.refresh_formula_bar(target);
                tracing::debug!(request = id, cell = %target.a1(), "evaluation requested");
                Ok(Some(request))
            }
        }
    }

    /// Commit and evaluate synchronously with a local evaluator.
    ///
    /// On evaluator failure the pending request is dropped, the cell keeps
    /// its formula with no result, and the error is returned.
    pub fn commit_formula_bar_with(
        &mut self,
        evaluator: &dyn FormulaEvaluator,
    ) -> Result<Option<EvaluationOutcome>> {
        let Some(request) = self.commit_formula_bar()? else {
            return Ok(None);
        };
        match evaluator.evaluate(&request) {
            Ok(response) => Ok(Some(self.apply_evaluation(&response))),
            Err(e) => {
                tracing::warn!(request = request.id, error = %e, "evaluation failed");
                self.pending = None;
                Err(match e {
                    XleditError::Evaluation(_) => e,
                    other => XleditError::Evaluation(other.to_string()),
                })
            }
        }
    }

    /// Merge an evaluator response. Anything but the pending request is stale.
    pub fn apply_evaluation(&mut self, response: &EvaluationResponse) -> EvaluationOutcome {
        let Some(ref pending) = self.pending else {
            tracing::warn!(request = response.request_id, "no evaluation pending; response ignored");
            return EvaluationOutcome::Stale;
        };
        let outcome = formula::apply_response(&mut self.doc, pending, response);
        if matches!(outcome, EvaluationOutcome::Applied { .. }) {
            self.pending = None;
        }
        outcome
    }

    /// Advisory validation of the formula bar text.
    pub fn validate_formula(&self, evaluator: &dyn FormulaEvaluator) -> Option<FormulaValidation> {
        formula::validate_advisory(evaluator, self.formula_bar.text())
    }

    /// Advisory function-name completions at `cursor` in the formula bar.
    pub fn suggest_functions(
        &self,
        evaluator: &dyn FormulaEvaluator,
        cursor: usize,
    ) -> Vec<FunctionSuggestion> {
        formula::suggest_advisory(evaluator, self.formula_bar.text(), cursor)
    }

    // ---- History & audit ----

    pub fn set_history_capacity(&mut self, capacity: usize) {
        if self.doc.history.set_capacity(capacity) > 0 {
            self.audit.on_entries_shifted();
        }
        self.config.history_capacity = capacity.max(1);
    }

    pub fn engage_audit(
        &mut self,
        chord: &KeyChord,
        identity: &dyn IdentityService,
        credentials: &Credentials,
    ) -> Result<()> {
        self.audit.engage(chord, identity, credentials)
    }

    pub fn disengage_audit(&mut self) {
        self.audit.disengage();
    }

    pub fn begin_history_edit(&mut self, index: usize, field: HistoryField) -> Result<()> {
        self.audit.begin_field_edit(&self.doc.history, index, field)
    }

    pub fn set_history_buffer(&mut self, text: &str) {
        self.audit.set_field_buffer(text);
    }

    pub fn commit_history_edit(&mut self) -> Result<()> {
        self.audit.commit_field_edit(&mut self.doc.history)
    }

    pub fn cancel_history_edit(&mut self) -> bool {
        self.audit.cancel_field_edit()
    }

    pub fn toggle_history_entry(&mut self, index: usize) -> Result<bool> {
        self.audit.toggle_selected(&self.doc.history, index)
    }

    pub fn select_all_history(&mut self) -> Result<()> {
        self.audit.select_all(&self.doc.history)
    }

    pub fn bulk_set_history_timestamp(&mut self, timestamp: DateTime<Utc>) -> Result<usize> {
        self.audit.bulk_set_timestamp(&mut self.doc.history, timestamp)
    }

    // ---- Resize gestures ----

    pub fn begin_resize(&mut self, target: ResizeTarget, x: f64, y: f64) -> Result<()> {
        self.resize.begin(&self.doc, target, x, y)
    }

    pub fn update_resize(&mut self, x: f64, y: f64) {
        self.resize.update(x, y, ResizeLimits::from(&self.config));
    }

    pub fn commit_resize(&mut self) -> Result<bool> {
        let change = self.resize.commit(&mut self.doc)?;
        Ok(self.record_opt(change))
    }

    pub fn cancel_resize(&mut self) -> bool {
        self.resize.cancel()
    }

    /// Escape: cancel the innermost transient interaction. Returns whether
    /// anything was cancelled.
    pub fn escape(&mut self) -> bool {
        if self.resize.cancel() {
            return true;
        }
        if self.print_area.is_active() {
            self.print_area.deactivate();
            return true;
        }
        if self.audit.cancel_field_edit() {
            return true;
        }
        if let Some(target) = self.formula_bar.target() {
            let original = self.doc.cell_at(target).map(Cell::edit_text);
            if original.as_deref() != Some(self.formula_bar.text()) {
                self.refresh_formula_bar(target);
                return true;
            }
        }
        if self.selection.is_selecting() {
            self.selection.pointer_up();
            return true;
        }
        false
    }

    // ---- Import / export ----

    /// Replace the grid with CSV content. `None` uses the configured delimiter.
    pub fn import_csv(&mut self, text: &str, delimiter: Option<u8>) -> Result<()> {
        let delimiter = delimiter.unwrap_or_else(|| self.config.csv_delimiter_byte());
        let defaults = self.defaults();
        let change = crate::csv::import_csv(&mut self.doc, text, delimiter, defaults)?;
        self.record(change);
        self.reset_transient_state();
        Ok(())
    }

    pub fn export_csv(&self, scope: CsvScope) -> Result<String> {
        let range = match scope {
            CsvScope::Document => None,
            CsvScope::PrintArea => Some(self.print_range()),
            CsvScope::Selection => Some(
                self.selection
                    .bounding_range()
                    .ok_or_else(|| XleditError::Validation("nothing is selected".into()))?,
            ),
        };
        crate::csv::export_csv(&self.doc, self.config.csv_delimiter_byte(), range)
    }

    /// Parse an XLSX file with `parser` and replace the grid on success.
    pub fn import_xlsx(
        &mut self,
        parser: &dyn XlsxParser,
        bytes: &[u8],
        file_name: &str,
        sheet_name: Option<&str>,
    ) -> Result<()> {
        let import = parser.parse(bytes, file_name, sheet_name);
        let defaults = self.defaults();
        let change = crate::xlsx::apply_import(&mut self.doc, import, defaults)?;
        self.record(change);
        self.reset_transient_state();
        Ok(())
    }

    pub fn export_xlsx(&self) -> Result<Vec<u8>> {
        crate::export::write_xlsx(&self.doc)
    }

    pub fn to_json(&self) -> Result<String> {
        crate::template::document_to_json(&self.doc)
    }

    /// Replace the whole document (history included) from JSON.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let doc = crate::template::document_from_json(json, self.defaults())?;
        self.replace_document(doc);
        Ok(())
    }

    fn replace_document(&mut self, mut doc: SpreadsheetDocument) {
        doc.history.set_capacity(self.config.history_capacity);
        self.doc = doc;
        self.reset_transient_state();
    }

    pub fn save_template(
        &self,
        store: &mut dyn PersistenceService,
        metadata: &TemplateMetadata,
    ) -> Result<String> {
        crate::template::save_template(store, &self.doc, metadata)
    }

    pub fn update_template(
        &self,
        store: &mut dyn PersistenceService,
        identity: &dyn IdentityService,
        credentials: &Credentials,
        existing_id: &str,
        metadata: &TemplateMetadata,
    ) -> Result<()> {
        crate::template::update_template(store, identity, credentials, existing_id, &self.doc, metadata)
    }

    pub fn load_template(&mut self, store: &dyn PersistenceService, id: &str) -> Result<()> {
        let doc = crate::template::load_template(store, id, self.defaults())?;
        self.replace_document(doc);
        Ok(())
    }

    /// Apply a serialized [`Command`].
    pub fn dispatch(&mut self, command: Command) -> Result<CommandOutput> {
        command::dispatch(self, command)
    }
}
