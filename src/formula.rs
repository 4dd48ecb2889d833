//! Formula bar and the evaluation round-trip.
//!
//! Evaluation is a message exchange: committing a formula produces an
//! [`EvaluationRequest`] tagged with a correlation id, and the matching
//! [`EvaluationResponse`] is merged back into the document in one batch.
//! Only the latest request is pending; responses for anything else are stale.

use serde::{Deserialize, Serialize};

use crate::cell_ref::parse_addr;
use crate::error::{Result, XleditError};
use crate::types::{CellAddr, SpreadsheetDocument};

/// Leading character that marks formula input.
pub const FORMULA_SIGIL: char = '=';

/// One non-blank cell as sent to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCell {
    pub cell_ref: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

/// Point-in-time view of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSnapshot {
    pub rows: u32,
    pub cols: u32,
    pub cells: Vec<SnapshotCell>,
}

impl GridSnapshot {
    pub fn capture(doc: &SpreadsheetDocument) -> Self {
        let cells = (0u32..)
            .zip(&doc.cell_matrix)
            .flat_map(|(row, cells)| {
                (0u32..).zip(cells).filter_map(move |(col, cell)| {
                    if cell.value.is_empty() && cell.formula.is_none() {
                        return None;
                    }
                    Some(SnapshotCell {
                        cell_ref: crate::cell_ref::cell_ref(row, col),
                        value: cell.value.clone(),
                        formula: cell.formula.clone(),
                    })
                })
            })
            .collect();
        Self {
            rows: doc.rows,
            cols: doc.cols,
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    /// Correlation id echoed back in the response
    pub id: u64,
    pub cell: CellAddr,
    /// Formula text without the sigil
    pub formula: String,
    pub snapshot: GridSnapshot,
}

/// Evaluator verdict for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationResult {
    pub success: bool,
    pub value: Option<String>,
    pub error: Option<String>,
    pub dependencies: Vec<String>,
    pub formula_type: Option<String>,
}

impl EvaluationResult {
    pub fn ok(value: impl Into<String>) -> Self {
        Self {
            success: true,
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// A dependent cell whose value changed as a consequence of the edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedCell {
    pub cell_ref: String,
    pub result: EvaluationResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub request_id: u64,
    pub result: EvaluationResult,
    #[serde(default)]
    pub affected: Vec<AffectedCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaValidation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSuggestion {
    pub function_name: String,
    pub display_text: String,
    pub description: String,
    pub insert_text: String,
}

/// The external formula engine.
pub trait FormulaEvaluator {
    /// Evaluate a committed formula against its snapshot.
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse>;

    /// Check formula text while it is being typed.
    fn validate(&self, formula: &str) -> Result<FormulaValidation>;

    /// Function names completing `partial`.
    fn suggest(&self, partial: &str) -> Result<Vec<FunctionSuggestion>>;
}

/// Advisory validation; evaluator failures yield `None`.
pub fn validate_advisory(evaluator: &dyn FormulaEvaluator, text: &str) -> Option<FormulaValidation> {
    let formula = text.strip_prefix(FORMULA_SIGIL)?;
    evaluator
        .validate(formula)
        .map_err(|e| tracing::debug!(error = %e, "formula validation unavailable"))
        .ok()
}

/// Advisory autocomplete for the token before `cursor`; failures yield nothing.
pub fn suggest_advisory(
    evaluator: &dyn FormulaEvaluator,
    text: &str,
    cursor: usize,
) -> Vec<FunctionSuggestion> {
    let Some(token) = current_token(text, cursor) else {
        return Vec::new();
    };
    evaluator.suggest(token).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "function suggestions unavailable");
        Vec::new()
    })
}

/// The partial function name ending at byte offset `cursor` in formula text.
///
/// `current_token("=SUM(AV", 7)` is `Some("AV")`.
pub fn current_token(text: &str, cursor: usize) -> Option<&str> {
    if !text.starts_with(FORMULA_SIGIL) {
        return None;
    }
    let mut end = cursor.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let head = text.get(..end)?;
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .last()
        .map_or(end, |(i, _)| i);
    let token = head.get(start..)?;
    token
        .chars()
        .next()
        .filter(char::is_ascii_alphabetic)
        .map(|_| token)
}

/// What a formula-bar commit asks the editor to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarCommit {
    Plain { target: CellAddr, text: String },
    Formula { target: CellAddr, formula: String },
}

/// Text buffer mirroring the single edited cell.
#[derive(Debug, Clone, Default)]
pub struct FormulaBar {
    target: Option<CellAddr>,
    buffer: String,
}

impl FormulaBar {
    /// Load `addr` into the bar: its raw value, or `=` plus its formula.
    pub fn focus(&mut self, doc: &SpreadsheetDocument, addr: CellAddr) -> Result<()> {
        let cell = doc
            .cell_at(addr)
            .ok_or_else(|| XleditError::Validation(format!("{} is outside the grid", addr.a1())))?;
        self.buffer = cell.edit_text();
        self.target = Some(addr);
        Ok(())
    }

    pub fn blur(&mut self) {
        self.target = None;
        self.buffer.clear();
    }

    pub fn set_text(&mut self, text: &str) {
        self.buffer = text.to_string();
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn target(&self) -> Option<CellAddr> {
        self.target
    }

    pub fn is_formula(&self) -> bool {
        self.buffer.starts_with(FORMULA_SIGIL)
    }

    /// Classify the buffer for commit. The bar keeps its text.
    pub fn commit(&self) -> Result<BarCommit> {
        let target = self
            .target
            .ok_or_else(|| XleditError::Validation("no cell is being edited".into()))?;
        match self.buffer.strip_prefix(FORMULA_SIGIL) {
            Some(formula) => {
                let formula = formula.trim();
                if formula.is_empty() {
                    return Err(XleditError::Validation("formula is empty".into()));
                }
                Ok(BarCommit::Formula {
                    target,
                    formula: formula.to_string(),
                })
            }
            None => Ok(BarCommit::Plain {
                target,
                text: self.buffer.clone(),
            }),
        }
    }
}

/// The one outstanding evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEvaluation {
    pub id: u64,
    pub cell: CellAddr,
    pub formula: String,
}

/// Result of offering a response to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Merged; `updated` cells were written
    Applied { updated: usize },
    /// Not the pending request; nothing changed
    Stale,
}

/// Write `formula` into the cell ahead of evaluation and build the request.
pub(crate) fn stage_formula(
    doc: &mut SpreadsheetDocument,
    id: u64,
    cell: CellAddr,
    formula: &str,
) -> Result<(EvaluationRequest, PendingEvaluation)> {
    doc.check_in_bounds(cell)?;
    if let Some(target) = doc.cell_mut(cell.row, cell.col) {
        target.value = format!("{FORMULA_SIGIL}{formula}");
        target.formula = Some(formula.to_string());
        target.is_formula = true;
        target.computed_value = None;
        target.error = None;
    }
    let request = EvaluationRequest {
        id,
        cell,
        formula: formula.to_string(),
        snapshot: GridSnapshot::capture(doc),
    };
    let pending = PendingEvaluation {
        id,
        cell,
        formula: formula.to_string(),
    };
    Ok((request, pending))
}

/// Merge a response for `pending` into the document.
///
/// Affected references that do not resolve to a cell are skipped; the rest
/// of the batch still applies.
pub(crate) fn apply_response(
    doc: &mut SpreadsheetDocument,
    pending: &PendingEvaluation,
    response: &EvaluationResponse,
) -> EvaluationOutcome {
    if response.request_id != pending.id {
        tracing::warn!(
            expected = pending.id,
            got = response.request_id,
            "ignoring stale evaluation response"
        );
        return EvaluationOutcome::Stale;
    }

    let mut updates = vec![(pending.cell, &response.result)];
    for affected in &response.affected {
        match parse_addr(&affected.cell_ref).filter(|a| doc.contains(*a)) {
            Some(addr) => updates.push((addr, &affected.result)),
            None => tracing::warn!(cell_ref = %affected.cell_ref, "evaluator reported unknown cell"),
        }
    }

    let mut updated = 0;
    for (addr, result) in updates {
        if let Some(cell) = doc.cell_mut(addr.row, addr.col) {
            if result.success {
                cell.computed_value = result.value.clone();
                cell.error = None;
            } else {
                cell.computed_value = None;
                cell.error = Some(
                    result
                        .error
                        .clone()
                        .unwrap_or_else(|| "evaluation failed".to_string()),
                );
            }
            updated += 1;
        }
    }
    tracing::debug!(request = pending.id, updated, "evaluation applied");
    EvaluationOutcome::Applied { updated }
}
