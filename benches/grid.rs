//! Benchmarks for grid editing and import/export.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use xledit::{CellAddr, CsvScope, EditorConfig, SheetEditor, XlsxParser, ZipXlsxParser};

fn editor(rows: u32, cols: u32) -> SheetEditor {
    let mut ed = SheetEditor::new(EditorConfig {
        default_rows: rows,
        default_cols: cols,
        ..EditorConfig::default()
    })
    .expect("config");
    for r in 0..rows {
        for c in 0..cols {
            ed.set_cell_value(r, c, &format!("{}", r * cols + c))
                .expect("edit");
        }
    }
    ed
}

fn bench_csv_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_export");
    for rows in [100u32, 1000] {
        let ed = editor(rows, 20);
        group.throughput(Throughput::Elements(u64::from(rows) * 20));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &ed, |b, ed| {
            b.iter(|| ed.export_csv(black_box(CsvScope::Document)).expect("export"))
        });
    }
    group.finish();
}

fn bench_csv_import(c: &mut Criterion) {
    let text = editor(1000, 20).export_csv(CsvScope::Document).expect("export");
    c.bench_function("csv_import_1000x20", |b| {
        b.iter(|| {
            let mut ed = SheetEditor::new(EditorConfig::default()).expect("config");
            ed.import_csv(black_box(&text), None).expect("import");
        })
    });
}

fn bench_xlsx_round_trip(c: &mut Criterion) {
    let bytes = editor(500, 20).export_xlsx().expect("export");
    c.bench_function("xlsx_parse_500x20", |b| {
        b.iter(|| ZipXlsxParser.parse(black_box(&bytes), "bench.xlsx", None))
    });
}

fn bench_structural_edits(c: &mut Criterion) {
    c.bench_function("insert_remove_row_200x20", |b| {
        let mut ed = editor(200, 20);
        ed.select_range(xledit::CellRange::new(0, 0, 3, 3)).expect("select");
        ed.merge_selection().expect("merge");
        b.iter(|| {
            ed.add_row(Some(black_box(1))).expect("insert");
            ed.remove_row(Some(1)).expect("remove");
        })
    });
    c.bench_function("select_drag_100x100", |b| {
        let mut ed = editor(100, 100);
        b.iter(|| {
            ed.pointer_down(CellAddr::new(0, 0), false).expect("down");
            ed.pointer_move(CellAddr::new(99, 99));
            ed.pointer_up();
        })
    });
}

criterion_group!(
    benches,
    bench_csv_export,
    bench_csv_import,
    bench_xlsx_round_trip,
    bench_structural_edits
);
criterion_main!(benches);
