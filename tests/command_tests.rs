//! JSON command dispatch, as a message-boundary host drives the editor.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]

mod common;

use serde_json::{json, Value};
use xledit::{CellRange, Command, CommandOutput, SheetEditor};

use common::{editor, editor_with};

fn send(ed: &mut SheetEditor, command: Value) -> Value {
    let command: Command = serde_json::from_value(command).unwrap();
    serde_json::to_value(ed.dispatch(command).unwrap()).unwrap()
}

#[test]
fn test_drag_select_and_merge() {
    let mut ed = editor(3, 3);
    send(&mut ed, json!({"type": "setCellValue", "row": 0, "col": 0, "value": "title"}));
    send(&mut ed, json!({"type": "pointerDown", "row": 0, "col": 0}));
    send(&mut ed, json!({"type": "pointerMove", "row": 0, "col": 2}));
    send(&mut ed, json!({"type": "pointerUp"}));
    let out = send(&mut ed, json!({"type": "mergeSelection"}));
    assert_eq!(
        out,
        json!({
            "type": "range",
            "range": {"startRow": 0, "startCol": 0, "endRow": 0, "endCol": 2}
        })
    );
    assert_eq!(ed.merge_ranges(), vec![CellRange::new(0, 0, 0, 2)]);

    let out = send(&mut ed, json!({"type": "unmerge", "row": 0, "col": 1}));
    assert_eq!(out["range"]["endCol"], 2);
    assert!(ed.merge_ranges().is_empty());
}

#[test]
fn test_formula_round_trip_over_messages() {
    let mut ed = editor_with(&[&["", "4"], &["", "6"]]);
    send(&mut ed, json!({"type": "selectCell", "row": 0, "col": 0}));
    send(&mut ed, json!({"type": "setFormulaText", "text": "=SUM(B1:B2)"}));
    let out = send(&mut ed, json!({"type": "commitFormulaBar"}));
    assert_eq!(out["type"], "evaluation");
    assert_eq!(out["request"]["formula"], "SUM(B1:B2)");
    let id = out["request"]["id"].as_u64().unwrap();

    let out = send(
        &mut ed,
        json!({
            "type": "applyEvaluation",
            "response": {"requestId": id, "result": {"success": true, "value": "10"}}
        }),
    );
    assert_eq!(out, json!({"type": "applied", "updated": 1}));
    assert_eq!(ed.get_cell(0, 0).unwrap().display_value(), "10");

    let out = send(
        &mut ed,
        json!({
            "type": "applyEvaluation",
            "response": {"requestId": id, "result": {"success": true, "value": "11"}}
        }),
    );
    assert_eq!(out, json!({"type": "stale"}));
}

#[test]
fn test_structural_commands() {
    let mut ed = editor(2, 2);
    assert_eq!(
        send(&mut ed, json!({"type": "addRow"})),
        json!({"type": "done", "changed": true})
    );
    send(&mut ed, json!({"type": "addColumn", "at": 0}));
    assert_eq!((ed.document().rows, ed.document().cols), (3, 3));
    send(&mut ed, json!({"type": "removeRow", "at": 1}));
    send(&mut ed, json!({"type": "resizeGrid", "rows": 4, "cols": 1}));
    assert_eq!((ed.document().rows, ed.document().cols), (4, 1));
}

#[test]
fn test_resize_gesture_over_messages() {
    let mut ed = editor(1, 2);
    send(
        &mut ed,
        json!({"type": "beginResize", "target": {"kind": "column", "col": 1}, "x": 10, "y": 0}),
    );
    send(&mut ed, json!({"type": "updateResize", "x": 30, "y": 0}));
    assert_eq!(
        send(&mut ed, json!({"type": "commitResize"})),
        json!({"type": "done", "changed": true})
    );
    assert!((ed.document().column_widths[1] - 120.0).abs() < f64::EPSILON);
}

#[test]
fn test_print_area_and_csv_export() {
    let mut ed = editor_with(&[&["a", "b", "c"], &["d", "e", "f"]]);
    send(&mut ed, json!({"type": "activatePrintArea"}));
    send(&mut ed, json!({"type": "pointerDown", "row": 0, "col": 1}));
    send(&mut ed, json!({"type": "pointerMove", "row": 1, "col": 2}));
    send(&mut ed, json!({"type": "pointerUp"}));
    let out = send(&mut ed, json!({"type": "confirmPrintArea"}));
    assert_eq!(out["range"]["startCol"], 1);
    // Print mode gestures do not touch the cell selection
    assert!(ed.selection().is_empty());

    let out = send(&mut ed, json!({"type": "exportCsv", "scope": "printArea"}));
    assert_eq!(out, json!({"type": "csv", "text": "b,c\ne,f\n"}));
}

#[test]
fn test_csv_import_with_delimiter() {
    let mut ed = editor(1, 1);
    send(
        &mut ed,
        json!({"type": "importCsv", "text": "x;y\n1;2", "delimiter": ";"}),
    );
    assert_eq!(ed.get_cell(1, 1).unwrap().value, "2");
}

#[test]
fn test_errors_surface_from_dispatch() {
    let mut ed = editor(2, 2);
    let bad: Command =
        serde_json::from_value(json!({"type": "setCellValue", "row": 9, "col": 0, "value": "x"}))
            .unwrap();
    assert!(ed.dispatch(bad).is_err());
    assert!(serde_json::from_value::<Command>(json!({"type": "launchRockets"})).is_err());
    assert!(ed.dispatch(Command::MergeSelection).is_err());
    let out = ed.dispatch(Command::Escape).unwrap();
    assert_eq!(out, CommandOutput::Done { changed: false });
}
