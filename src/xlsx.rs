//! XLSX import.
//!
//! [`XlsxImport`] is the parser contract: hosts may plug their own parser in
//! through [`XlsxParser`](crate::services::XlsxParser). [`ZipXlsxParser`] is
//! the built-in one, reading a single worksheet's values, formulas, merges
//! and dimensions.

use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, Cursor, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::cell_ref::{parse_addr, parse_cell_range};
use crate::error::{Result, XleditError};
use crate::grid::{GridDefaults, MAX_COLS, MAX_ROWS};
use crate::history::{Change, History};
use crate::services::XlsxParser;
use crate::types::{Cell, CellRange, GlobalStyles, SpreadsheetDocument};
use crate::xml_helpers::{attr_bool, attr_f64, attr_string, attr_string_local, attr_u32};

/// Largest grid an import may produce.
const MAX_IMPORT_CELLS: u64 = 4_000_000;

/// Excel's maximum digit width for Calibri 11pt at 96 DPI.
const DIGIT_WIDTH: f64 = 7.0;

/// Column width in characters → pixels.
pub(crate) fn chars_to_px(width: f64) -> f64 {
    (width * DIGIT_WIDTH + 5.0).round()
}

/// Column width in pixels → characters.
pub(crate) fn px_to_chars(px: f64) -> f64 {
    ((px - 5.0) / DIGIT_WIDTH).max(0.0)
}

/// Row height in points → pixels.
pub(crate) fn pt_to_px(pt: f64) -> f64 {
    pt * 96.0 / 72.0
}

/// Row height in pixels → points.
pub(crate) fn px_to_pt(px: f64) -> f64 {
    px * 72.0 / 96.0
}

/// Result of parsing one worksheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XlsxImport {
    pub success: bool,
    #[serde(default)]
    pub cell_matrix: Vec<Vec<Cell>>,
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub cols: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_heights: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_sheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl XlsxImport {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Replace the document's grid with a successful import.
///
/// The candidate grid is validated (shape, merge metadata) before anything
/// is replaced; history and global styles are kept.
pub fn apply_import(
    doc: &mut SpreadsheetDocument,
    import: XlsxImport,
    defaults: GridDefaults,
) -> Result<Change> {
    if !import.success {
        return Err(XleditError::Validation(
            import
                .error
                .unwrap_or_else(|| "XLSX import failed".to_string()),
        ));
    }
    let mut candidate = SpreadsheetDocument {
        name: doc.name.clone(),
        rows: import.rows,
        cols: import.cols,
        cell_matrix: import.cell_matrix,
        history: History::default(),
        column_widths: import.column_widths.unwrap_or_default(),
        row_heights: import.row_heights.unwrap_or_default(),
        global_styles: GlobalStyles::default(),
    };
    candidate.normalize(defaults)?;
    candidate.history = std::mem::take(&mut doc.history);
    candidate.global_styles = std::mem::take(&mut doc.global_styles);

    let details = match import.imported_sheet {
        Some(ref sheet) => format!("{sheet}: {}×{} grid", candidate.rows, candidate.cols),
        None => format!("{}×{} grid", candidate.rows, candidate.cols),
    };
    tracing::info!(rows = candidate.rows, cols = candidate.cols, "XLSX imported");
    *doc = candidate;
    Ok(Change::new("Import XLSX", details))
}

/// Built-in XLSX reader over `zip` + `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipXlsxParser;

impl XlsxParser for ZipXlsxParser {
    fn parse(&self, bytes: &[u8], file_name: &str, sheet_name: Option<&str>) -> XlsxImport {
        match parse_workbook(bytes, sheet_name) {
            Ok(import) => import,
            Err(e) => {
                tracing::warn!(file = file_name, error = %e, "XLSX parse failed");
                XlsxImport::failure(e.to_string())
            }
        }
    }
}

struct SheetInfo {
    name: String,
    path: String,
}

/// Parse `bytes` and import `sheet_name` (or the first sheet).
pub fn parse_workbook(bytes: &[u8], sheet_name: Option<&str>) -> Result<XlsxImport> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let rels = parse_workbook_relationships(&mut archive);
    let sheets = get_sheet_info(&mut archive, &rels.worksheets)?;
    let sheet_names: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();

    let info = match sheet_name {
        Some(wanted) => sheets
            .iter()
            .find(|s| s.name == wanted)
            .or_else(|| sheets.iter().find(|s| s.name.eq_ignore_ascii_case(wanted)))
            .ok_or_else(|| XleditError::Validation(format!("sheet {wanted:?} not found")))?,
        None => sheets
            .first()
            .ok_or_else(|| XleditError::Validation("workbook has no sheets".into()))?,
    };

    let shared_strings = parse_shared_strings(&mut archive, rels.shared_strings.as_deref());
    let parsed = parse_sheet(&mut archive, &info.path, &shared_strings)?;
    let mut import = parsed.into_import()?;
    import.sheet_names = Some(sheet_names);
    import.imported_sheet = Some(info.name.clone());
    Ok(import)
}

#[derive(Default, Debug)]
struct WorkbookRelationships {
    /// rId → full path, e.g. "rId1" → "xl/worksheets/sheet1.xml"
    worksheets: HashMap<String, String>,
    shared_strings: Option<String>,
}

fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> WorkbookRelationships {
    let mut rels = WorkbookRelationships::default();
    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return rels;
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attr_string(e, b"Id").unwrap_or_default();
                let target = attr_string(e, b"Target").unwrap_or_default();
                let rel_type = attr_string(e, b"Type").unwrap_or_default();

                let full_path = match target.strip_prefix('/') {
                    Some(stripped) => stripped.to_string(),
                    None => format!("xl/{target}"),
                };
                if rel_type.ends_with("/worksheet") && !id.is_empty() && !target.is_empty() {
                    rels.worksheets.insert(id, full_path);
                } else if rel_type.ends_with("/sharedStrings") {
                    rels.shared_strings = Some(full_path);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    rels
}

fn get_sheet_info<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Result<Vec<SheetInfo>> {
    let file = archive.by_name("xl/workbook.xml")?;
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_string(e, b"name").unwrap_or_default();
                let r_id = attr_string_local(e, b"id").unwrap_or_default();
                if !name.is_empty() {
                    let path = relationships.get(&r_id).cloned().unwrap_or_else(|| {
                        format!("xl/worksheets/sheet{}.xml", sheets.len() + 1)
                    });
                    sheets.push(SheetInfo { name, path });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn parse_shared_strings<R: Read + Seek>(archive: &mut ZipArchive<R>, path: Option<&str>) -> Vec<String> {
    let Ok(file) = archive.by_name(path.unwrap_or("xl/sharedStrings.xml")) else {
        return Vec::new();
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    // Phonetic runs (<rPh>) repeat the text in kana and are not part of the value
    let mut in_rph = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_rph = true,
                b"t" if in_si && !in_rph => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => in_rph = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    strings
}

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    Number,
}

fn parse_cell_type_tag(value: &str) -> CellTypeTag {
    match value {
        "s" => CellTypeTag::Shared,
        "b" => CellTypeTag::Bool,
        "e" => CellTypeTag::Error,
        "str" => CellTypeTag::Str,
        "inlineStr" => CellTypeTag::Inline,
        _ => CellTypeTag::Number,
    }
}

struct PendingCell {
    row: u32,
    col: u32,
    tag: CellTypeTag,
    value: String,
    formula: String,
    inline: String,
}

impl PendingCell {
    fn finish(self, shared_strings: &[String]) -> Cell {
        let display = match self.tag {
            CellTypeTag::Shared => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i))
                .cloned()
                .unwrap_or_default(),
            CellTypeTag::Bool => match self.value.trim() {
                "1" | "true" => "TRUE".to_string(),
                "" => String::new(),
                _ => "FALSE".to_string(),
            },
            CellTypeTag::Inline => self.inline,
            CellTypeTag::Str | CellTypeTag::Error | CellTypeTag::Number => self.value,
        };
        let formula = self.formula.trim();
        if formula.is_empty() {
            return Cell::with_value(self.row, self.col, display);
        }
        let mut cell = Cell::with_value(self.row, self.col, format!("={formula}"));
        cell.formula = Some(formula.to_string());
        cell.is_formula = true;
        if self.tag == CellTypeTag::Error {
            cell.error = Some(display);
        } else if !display.is_empty() {
            cell.computed_value = Some(display);
        }
        cell
    }
}

#[derive(Default)]
struct ParsedSheet {
    cells: Vec<(u32, u32, Cell)>,
    merges: Vec<CellRange>,
    /// zero-based column → width in characters
    col_widths: BTreeMap<u32, f64>,
    /// zero-based row → height in points
    row_heights: BTreeMap<u32, f64>,
    max_row: u32,
    max_col: u32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    Value,
    Formula,
    Inline,
}

fn parse_sheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
    shared_strings: &[String],
) -> Result<ParsedSheet> {
    let file = archive.by_name(path)?;
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    let mut sheet = ParsedSheet::default();
    let mut buf = Vec::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut pending: Option<PendingCell> = None;
    let mut target = TextTarget::None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(_) | Event::Empty(_))) => {
                let (Event::Start(ref e) | Event::Empty(ref e)) = event else {
                    continue;
                };
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"dimension" => {
                        if let Some(range) = attr_string(e, b"ref").and_then(|r| parse_cell_range(&r)) {
                            sheet.max_row = sheet.max_row.max(range.end_row);
                            sheet.max_col = sheet.max_col.max(range.end_col);
                        }
                    }
                    b"row" => {
                        current_row = attr_u32(e, b"r")
                            .map_or(current_row.saturating_add(1), |r| r.saturating_sub(1));
                        next_col = 0;
                        if let Some(ht) = attr_f64(e, b"ht") {
                            sheet.row_heights.insert(current_row, ht);
                        }
                        sheet.max_row = sheet.max_row.max(current_row);
                    }
                    b"c" => {
                        let addr = attr_string(e, b"r").and_then(|r| parse_addr(&r));
                        let (row, col) = addr.map_or((current_row, next_col), |a| (a.row, a.col));
                        next_col = col.saturating_add(1);
                        if is_start {
                            pending = Some(PendingCell {
                                row,
                                col,
                                tag: attr_string(e, b"t")
                                    .map_or(CellTypeTag::Number, |t| parse_cell_type_tag(&t)),
                                value: String::new(),
                                formula: String::new(),
                                inline: String::new(),
                            });
                        }
                    }
                    b"v" if is_start && pending.is_some() => target = TextTarget::Value,
                    b"f" if is_start && pending.is_some() => target = TextTarget::Formula,
                    b"t" if is_start && pending.is_some() => target = TextTarget::Inline,
                    b"col" => {
                        let bounds = (attr_u32(e, b"min"), attr_u32(e, b"max"), attr_f64(e, b"width"));
                        let hidden = attr_bool(e, b"hidden") == Some(true);
                        if let (Some(min), Some(max), Some(width), false) =
                            (bounds.0, bounds.1, bounds.2, hidden)
                        {
                            for col in min.max(1)..=max.min(MAX_COLS) {
                                sheet.col_widths.insert(col - 1, width);
                            }
                        }
                    }
                    b"mergeCell" => {
                        if let Some(range) = attr_string(e, b"ref").and_then(|r| parse_cell_range(&r)) {
                            if !range.is_single() {
                                sheet.merges.push(range);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) if target != TextTarget::None => {
                if let Some(ref mut cell) = pending {
                    let text = e.unescape()?;
                    match target {
                        TextTarget::Value => cell.value.push_str(&text),
                        TextTarget::Formula => cell.formula.push_str(&text),
                        TextTarget::Inline => cell.inline.push_str(&text),
                        TextTarget::None => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"v" | b"f" | b"t" => target = TextTarget::None,
                b"c" => {
                    target = TextTarget::None;
                    if let Some(cell) = pending.take() {
                        let (row, col) = (cell.row, cell.col);
                        let cell = cell.finish(shared_strings);
                        if !cell.is_blank() {
                            sheet.max_row = sheet.max_row.max(row);
                            sheet.max_col = sheet.max_col.max(col);
                            sheet.cells.push((row, col, cell));
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    for range in &sheet.merges {
        sheet.max_row = sheet.max_row.max(range.end_row);
        sheet.max_col = sheet.max_col.max(range.end_col);
    }
    Ok(sheet)
}

impl ParsedSheet {
    fn into_import(self) -> Result<XlsxImport> {
        let rows = self.max_row.saturating_add(1);
        let cols = self.max_col.saturating_add(1);
        if rows > MAX_ROWS
            || cols > MAX_COLS
            || u64::from(rows) * u64::from(cols) > MAX_IMPORT_CELLS
        {
            return Err(XleditError::Validation(format!(
                "worksheet {rows}×{cols} is too large to import"
            )));
        }

        let mut doc = SpreadsheetDocument::blank("import", rows, cols, 0.0, 0.0);
        for (row, col, cell) in self.cells {
            if let Some(slot) = doc.cell_mut(row, col) {
                *slot = cell;
            }
        }

        let mut accepted: Vec<CellRange> = Vec::new();
        for range in self.merges {
            if accepted.iter().any(|m| m.intersects(&range)) {
                tracing::warn!(range = %range.to_a1(), "skipping overlapping merge");
                continue;
            }
            accepted.push(range);
        }
        crate::merge::restore_merges(&mut doc, accepted);

        let column_widths = (!self.col_widths.is_empty()).then(|| {
            (0..cols)
                .map(|c| self.col_widths.get(&c).map_or(crate::config::DEFAULT_COL_WIDTH, |w| chars_to_px(*w)))
                .collect()
        });
        let row_heights = (!self.row_heights.is_empty()).then(|| {
            (0..rows)
                .map(|r| self.row_heights.get(&r).map_or(crate::config::DEFAULT_ROW_HEIGHT, |h| pt_to_px(*h)))
                .collect()
        });

        Ok(XlsxImport {
            success: true,
            cell_matrix: doc.cell_matrix,
            rows,
            cols,
            column_widths,
            row_heights,
            sheet_names: None,
            imported_sheet: None,
            error: None,
        })
    }
}
