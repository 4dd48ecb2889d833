//! Test fixtures for generating XLSX files in memory.
//!
//! Builds workbooks the way a spreadsheet application writes them (shared
//! strings, cached formula values, `<cols>`, row heights, merges), so the
//! importer can be exercised against known inputs.
//!
//! # Example
//!
//! ```rust
//! use fixtures::{SheetBuilder, XlsxBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .sheet(SheetBuilder::new("Data").cell("A1", "Hello").cell("B1", 42.0))
//!     .build();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation
)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

// ============================================================================
// Cell Values
// ============================================================================

/// A cell value for test fixtures.
#[derive(Debug, Clone)]
pub enum CellValue {
    /// A shared string.
    String(String),
    /// A numeric value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// An inline string (not shared).
    InlineString(String),
    /// A formula with its cached result.
    Formula { formula: String, cached: String },
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// ============================================================================
// Sheet Builder
// ============================================================================

#[derive(Debug, Clone)]
pub struct CellEntry {
    pub cell_ref: String,
    pub value: CellValue,
}

#[derive(Debug, Clone)]
pub struct ColumnWidth {
    pub min: u32,
    pub max: u32,
    pub width: f64,
    pub hidden: bool,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    pub dimension: Option<String>,
    pub cells: Vec<CellEntry>,
    pub merges: Vec<String>,
    pub col_widths: Vec<ColumnWidth>,
    /// 1-based row → height in points
    pub row_heights: BTreeMap<u32, f64>,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cell<V: Into<CellValue>>(mut self, cell_ref: &str, value: V) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn inline(mut self, cell_ref: &str, text: &str) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::InlineString(text.to_string()),
        });
        self
    }

    #[must_use]
    pub fn formula(mut self, cell_ref: &str, formula: &str, cached: &str) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Formula {
                formula: formula.to_string(),
                cached: cached.to_string(),
            },
        });
        self
    }

    /// Add a merge range (e.g., "A1:B2").
    #[must_use]
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    /// Set column width (in characters) for a 1-based range of columns.
    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        self.col_widths.push(ColumnWidth {
            min,
            max,
            width,
            hidden: false,
        });
        self
    }

    #[must_use]
    pub fn hide_cols(mut self, min: u32, max: u32) -> Self {
        self.col_widths.push(ColumnWidth {
            min,
            max,
            width: 0.0,
            hidden: true,
        });
        self
    }

    /// Set the height (in points) of a 1-based row.
    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        self.row_heights.insert(row, height);
        self
    }

    #[must_use]
    pub fn dimension(mut self, range: &str) -> Self {
        self.dimension = Some(range.to_string());
        self
    }
}

// ============================================================================
// XLSX Builder
// ============================================================================

#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Build the XLSX file as bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut shared_strings: Vec<String> = Vec::new();
        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let CellValue::String(ref s) = cell.value {
                    if !shared_strings.contains(s) {
                        shared_strings.push(s.clone());
                    }
                }
            }
        }

        let mut parts = vec![
            (
                "[Content_Types].xml".to_string(),
                generate_content_types(self.sheets.len()),
            ),
            ("_rels/.rels".to_string(), generate_rels()),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                generate_workbook_rels(self.sheets.len()),
            ),
            ("xl/workbook.xml".to_string(), generate_workbook(&self.sheets)),
        ];
        if !shared_strings.is_empty() {
            parts.push((
                "xl/sharedStrings.xml".to_string(),
                generate_shared_strings(&shared_strings),
            ));
        }
        for (i, sheet) in self.sheets.iter().enumerate() {
            parts.push((
                format!("xl/worksheets/sheet{}.xml", i + 1),
                generate_sheet_xml(sheet, &shared_strings),
            ));
        }

        for (name, content) in parts {
            zip.start_file(name, options).expect("start file");
            zip.write_all(content.as_bytes()).expect("write part");
        }
        zip.finish().expect("Failed to finish ZIP").into_inner()
    }
}

// ============================================================================
// Part Generators
// ============================================================================

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn generate_content_types(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn generate_rels() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string()
}

fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        sheet_count + 1
    ));
    xml.push_str("</Relationships>");
    xml
}

fn generate_workbook(sheets: &[SheetBuilder]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(&sheet.name),
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn generate_shared_strings(strings: &[String]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    );
    for s in strings {
        xml.push_str(&format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(s)));
    }
    xml.push_str("</sst>");
    xml
}

/// Row number (1-based) of an A1 reference.
fn row_of(cell_ref: &str) -> u32 {
    cell_ref
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .expect("cell reference row")
}

fn generate_sheet_xml(sheet: &SheetBuilder, shared_strings: &[String]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );
    if let Some(ref dim) = sheet.dimension {
        xml.push_str(&format!(r#"<dimension ref="{dim}"/>"#));
    }

    if !sheet.col_widths.is_empty() {
        xml.push_str("<cols>");
        for col in &sheet.col_widths {
            let hidden = if col.hidden { r#" hidden="1""# } else { "" };
            xml.push_str(&format!(
                r#"<col min="{}" max="{}" width="{}" customWidth="1"{}/>"#,
                col.min, col.max, col.width, hidden
            ));
        }
        xml.push_str("</cols>");
    }

    let mut rows: BTreeMap<u32, Vec<&CellEntry>> = BTreeMap::new();
    for cell in &sheet.cells {
        rows.entry(row_of(&cell.cell_ref)).or_default().push(cell);
    }
    for row in sheet.row_heights.keys() {
        rows.entry(*row).or_default();
    }

    xml.push_str("<sheetData>");
    for (row_num, cells) in rows {
        match sheet.row_heights.get(&row_num) {
            Some(ht) => xml.push_str(&format!(r#"<row r="{row_num}" ht="{ht}" customHeight="1">"#)),
            None => xml.push_str(&format!(r#"<row r="{row_num}">"#)),
        }
        for cell in cells {
            let r = &cell.cell_ref;
            match cell.value {
                CellValue::String(ref s) => {
                    let idx = shared_strings.iter().position(|x| x == s).expect("shared string");
                    xml.push_str(&format!(r#"<c r="{r}" t="s"><v>{idx}</v></c>"#));
                }
                CellValue::Number(n) => xml.push_str(&format!(r#"<c r="{r}"><v>{n}</v></c>"#)),
                CellValue::Boolean(b) => {
                    xml.push_str(&format!(r#"<c r="{r}" t="b"><v>{}</v></c>"#, u8::from(b)));
                }
                CellValue::InlineString(ref s) => xml.push_str(&format!(
                    r#"<c r="{r}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    escape(s)
                )),
                CellValue::Formula {
                    ref formula,
                    ref cached,
                } => xml.push_str(&format!(
                    r#"<c r="{r}"><f>{}</f><v>{}</v></c>"#,
                    escape(formula),
                    escape(cached)
                )),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if !sheet.merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, sheet.merges.len()));
        for m in &sheet.merges {
            xml.push_str(&format!(r#"<mergeCell ref="{m}"/>"#));
        }
        xml.push_str("</mergeCells>");
    }
    xml.push_str("</worksheet>");
    xml
}
