//! CLI tool for xledit - converts between CSV, XLSX and JSON documents
//!
//! Usage:
//!   xledit_cli <input> -o <output>                # format from extensions
//!   xledit_cli <input.xlsx> --sheet Data -o out.csv
//!   xledit_cli <input.csv> --config editor.json   # JSON to stdout
//!
//! Set `RUST_LOG=xledit=debug` for logs on stderr.

#![allow(clippy::exit)]

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing_subscriber::EnvFilter;
use xledit::{CsvScope, EditorConfig, SheetEditor, XleditError, ZipXlsxParser};

const USAGE: &str =
    "Usage: xledit_cli <input.{csv,tsv,xlsx,json}> [-o output.{csv,tsv,xlsx,json}] [--sheet NAME] [--config FILE]";

struct Args {
    input: String,
    output: Option<String>,
    sheet: Option<String>,
    config: Option<String>,
}

fn parse_args() -> Option<Args> {
    let mut args = env::args().skip(1);
    let mut input = None;
    let mut output = None;
    let mut sheet = None;
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => output = Some(args.next()?),
            "--sheet" => sheet = Some(args.next()?),
            "--config" => config = Some(args.next()?),
            _ if input.is_none() => input = Some(arg),
            _ => return None,
        }
    }
    Some(Args {
        input: input?,
        output,
        sheet,
        config,
    })
}

fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn load(editor: &mut SheetEditor, args: &Args) -> Result<(), XleditError> {
    match extension(&args.input).as_str() {
        "xlsx" => {
            let data = fs::read(&args.input)?;
            editor.import_xlsx(&ZipXlsxParser, &data, &args.input, args.sheet.as_deref())
        }
        "json" => editor.load_json(&fs::read_to_string(&args.input)?),
        "tsv" => editor.import_csv(&fs::read_to_string(&args.input)?, Some(b'\t')),
        "csv" => {
            let text = fs::read_to_string(&args.input)?;
            let delimiter = xledit::csv::sniff_delimiter(&text);
            editor.import_csv(&text, Some(delimiter))
        }
        other => Err(XleditError::Validation(format!(
            "unsupported input format {other:?}"
        ))),
    }
}

fn render(editor: &mut SheetEditor, output: Option<&str>) -> Result<Vec<u8>, XleditError> {
    let ext = output.map(extension).unwrap_or_else(|| "json".to_string());
    match ext.as_str() {
        "xlsx" => editor.export_xlsx(),
        "json" => Ok(editor.to_json()?.into_bytes()),
        "csv" => Ok(editor.export_csv(CsvScope::Document)?.into_bytes()),
        "tsv" => {
            let mut config = editor.config().clone();
            config.csv_delimiter = '\t';
            let doc = editor.document().clone();
            let tsv = SheetEditor::with_document(doc, config)?.export_csv(CsvScope::Document)?;
            Ok(tsv.into_bytes())
        }
        other => Err(XleditError::Validation(format!(
            "unsupported output format {other:?}"
        ))),
    }
}

fn run(args: &Args) -> Result<(), XleditError> {
    let config = match args.config {
        Some(ref path) => EditorConfig::from_json_file(path)?,
        None => EditorConfig::default(),
    };
    let mut editor = SheetEditor::new(config)?;
    load(&mut editor, args)?;
    let bytes = render(&mut editor, args.output.as_deref())?;

    match args.output {
        Some(ref path) => {
            fs::write(path, &bytes)?;
            eprintln!(
                "Written: {} ({}×{})",
                path,
                editor.document().rows,
                editor.document().cols
            );
        }
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(&bytes)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let Some(args) = parse_args() else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
