//! Common test utilities: collaborator stubs and editor constructors.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::cell::Cell as StdCell;
use std::collections::HashMap;

use xledit::formula::{
    EvaluationRequest, EvaluationResponse, EvaluationResult, FormulaEvaluator, FormulaValidation,
    FunctionSuggestion,
};
use xledit::services::{IdentityService, PersistenceService, TemplatePayload};
use xledit::{EditorConfig, Result, SheetEditor, XleditError};

/// Editor over a blank `rows × cols` grid with default sizes.
pub fn editor(rows: u32, cols: u32) -> SheetEditor {
    SheetEditor::new(EditorConfig {
        default_rows: rows,
        default_cols: cols,
        ..EditorConfig::default()
    })
    .expect("valid config")
}

/// Editor whose cells are filled from row-major string slices.
pub fn editor_with(rows: &[&[&str]]) -> SheetEditor {
    let height = u32::try_from(rows.len()).unwrap();
    let width = u32::try_from(rows.iter().map(|r| r.len()).max().unwrap_or(1)).unwrap();
    let mut ed = editor(height.max(1), width.max(1));
    for (r, row) in (0u32..).zip(rows) {
        for (c, value) in (0u32..).zip(row.iter()) {
            ed.set_cell_value(r, c, value).unwrap();
        }
    }
    ed
}

// ============================================================================
// Formula evaluator
// ============================================================================

/// Understands `SUM(A1:B2)` and `REF(A1)` over the request snapshot; anything
/// else is an evaluation error. Can be switched to fail like an unreachable
/// backend.
#[derive(Default)]
pub struct StubEvaluator {
    pub unreachable: bool,
    pub calls: StdCell<usize>,
}

const FUNCTIONS: &[(&str, &str)] = &[
    ("SUM", "Adds its arguments"),
    ("SUMIF", "Adds cells matching a condition"),
    ("AVERAGE", "Arithmetic mean"),
    ("REF", "Value of one cell"),
];

impl StubEvaluator {
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            calls: StdCell::new(0),
        }
    }

    fn lookup(request: &EvaluationRequest, cell_ref: &str) -> f64 {
        request
            .snapshot
            .cells
            .iter()
            .find(|c| c.cell_ref == cell_ref)
            .and_then(|c| c.value.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    fn eval(request: &EvaluationRequest) -> EvaluationResult {
        let f = request.formula.trim();
        if let Some(arg) = f.strip_prefix("SUM(").and_then(|s| s.strip_suffix(')')) {
            let Some(range) = xledit::cell_ref::parse_cell_range(arg) else {
                return EvaluationResult::failed("#REF!");
            };
            let total: f64 = range
                .cells()
                .map(|a| Self::lookup(request, &a.a1()))
                .sum();
            let mut result = EvaluationResult::ok(format!("{total}"));
            result.dependencies = range.cells().map(|a| a.a1()).collect();
            result.formula_type = Some("SUM".into());
            return result;
        }
        if let Some(arg) = f.strip_prefix("REF(").and_then(|s| s.strip_suffix(')')) {
            return EvaluationResult::ok(format!("{}", Self::lookup(request, arg)));
        }
        EvaluationResult::failed("#NAME?")
    }
}

impl FormulaEvaluator for StubEvaluator {
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse> {
        self.calls.set(self.calls.get() + 1);
        if self.unreachable {
            return Err(XleditError::Evaluation("evaluator unreachable".into()));
        }
        Ok(EvaluationResponse {
            request_id: request.id,
            result: Self::eval(request),
            affected: Vec::new(),
        })
    }

    fn validate(&self, formula: &str) -> Result<FormulaValidation> {
        if self.unreachable {
            return Err(XleditError::Evaluation("evaluator unreachable".into()));
        }
        let balanced = formula.matches('(').count() == formula.matches(')').count();
        Ok(FormulaValidation {
            is_valid: balanced,
            error: (!balanced).then(|| "unbalanced parentheses".to_string()),
        })
    }

    fn suggest(&self, partial: &str) -> Result<Vec<FunctionSuggestion>> {
        if self.unreachable {
            return Err(XleditError::Evaluation("evaluator unreachable".into()));
        }
        let upper = partial.to_ascii_uppercase();
        Ok(FUNCTIONS
            .iter()
            .filter(|(name, _)| name.starts_with(&upper))
            .map(|(name, description)| FunctionSuggestion {
                function_name: (*name).to_string(),
                display_text: format!("{name}()"),
                description: (*description).to_string(),
                insert_text: format!("{name}("),
            })
            .collect())
    }
}

// ============================================================================
// Identity and persistence
// ============================================================================

pub struct StubIdentity {
    pub user: String,
    pub password: String,
}

impl Default for StubIdentity {
    fn default() -> Self {
        Self {
            user: "operator".into(),
            password: "s3cret".into(),
        }
    }
}

impl IdentityService for StubIdentity {
    fn current_user_name(&self) -> Result<String> {
        Ok(self.user.clone())
    }

    fn validate_credentials(&self, user: &str, password: &str) -> Result<bool> {
        Ok(user == self.user && password == self.password)
    }
}

/// In-memory template store.
#[derive(Default)]
pub struct MemoryStore {
    pub templates: HashMap<String, TemplatePayload>,
    next_id: u32,
}

impl PersistenceService for MemoryStore {
    fn save(&mut self, payload: &TemplatePayload) -> Result<String> {
        self.next_id += 1;
        let id = format!("tpl-{}", self.next_id);
        self.templates.insert(id.clone(), payload.clone());
        Ok(id)
    }

    fn update(&mut self, existing_id: &str, payload: &TemplatePayload) -> Result<()> {
        match self.templates.get_mut(existing_id) {
            Some(slot) => {
                *slot = payload.clone();
                Ok(())
            }
            None => Err(XleditError::Persistence(format!("no template {existing_id}"))),
        }
    }

    fn load(&self, id: &str) -> Result<String> {
        self.templates
            .get(id)
            .map(|p| p.json_data_base64.clone())
            .ok_or_else(|| XleditError::Persistence(format!("no template {id}")))
    }
}
