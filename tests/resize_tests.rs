//! Drag-to-resize gestures and the Escape priority chain.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use xledit::resize::ResizeTarget;
use xledit::types::{CellMedia, MediaPlacement, MediaSource};
use xledit::CellAddr;

use common::editor;

fn image() -> CellMedia {
    CellMedia::Image {
        source: MediaSource::Url {
            url: "https://example.com/chart.png".into(),
        },
        placement: Some(MediaPlacement {
            x: 0.0,
            y: 0.0,
            width: 80.0,
            height: 60.0,
        }),
    }
}

#[test]
fn test_column_drag_commits_once() {
    let mut ed = editor(2, 2);
    ed.begin_resize(ResizeTarget::Column { col: 1 }, 200.0, 10.0)
        .unwrap();
    ed.update_resize(230.0, 50.0);
    ed.update_resize(260.0, 90.0);
    assert_eq!(ed.resize_state().preview(), Some((160.0, 0.0)));
    // Nothing applied until release
    assert_eq!(ed.document().column_widths[1], 100.0);

    assert!(ed.commit_resize().unwrap());
    assert_eq!(ed.document().column_widths[1], 160.0);
    assert_eq!(ed.history().len(), 1);
    assert_eq!(ed.history().last().unwrap().action, "Resize column");
    assert!(!ed.resize_state().is_active());
}

#[test]
fn test_row_drag_respects_minimum() {
    let mut ed = editor(2, 2);
    ed.begin_resize(ResizeTarget::Row { row: 0 }, 0.0, 100.0)
        .unwrap();
    ed.update_resize(0.0, -500.0);
    ed.commit_resize().unwrap();
    assert_eq!(ed.document().row_heights[0], ed.config().min_row_height);
}

#[test]
fn test_escape_cancels_drag() {
    let mut ed = editor(2, 2);
    ed.begin_resize(ResizeTarget::Column { col: 0 }, 0.0, 0.0)
        .unwrap();
    ed.update_resize(50.0, 0.0);
    assert!(ed.escape());
    assert!(!ed.resize_state().is_active());
    assert_eq!(ed.document().column_widths[0], 100.0);
    assert!(!ed.commit_resize().unwrap());
    assert!(ed.history().is_empty());
}

#[test]
fn test_unchanged_drag_is_not_logged() {
    let mut ed = editor(2, 2);
    ed.begin_resize(ResizeTarget::Row { row: 1 }, 5.0, 5.0)
        .unwrap();
    assert!(!ed.commit_resize().unwrap());
    assert!(ed.history().is_empty());
}

#[test]
fn test_one_gesture_at_a_time() {
    let mut ed = editor(2, 2);
    ed.begin_resize(ResizeTarget::Column { col: 0 }, 0.0, 0.0)
        .unwrap();
    assert!(ed
        .begin_resize(ResizeTarget::Row { row: 0 }, 0.0, 0.0)
        .is_err());
    assert!(ed.begin_resize(ResizeTarget::Column { col: 9 }, 0.0, 0.0).is_err());
}

#[test]
fn test_media_resize_updates_placement() {
    let mut ed = editor(2, 2);
    ed.set_media(0, 0, Some(image())).unwrap();
    let cell = CellAddr::new(0, 0);
    ed.begin_resize(ResizeTarget::Media { cell }, 100.0, 100.0)
        .unwrap();
    ed.update_resize(120.0, 90.0);
    assert!(ed.commit_resize().unwrap());

    let placement = ed
        .get_cell(0, 0)
        .unwrap()
        .media
        .as_ref()
        .and_then(CellMedia::placement)
        .copied()
        .unwrap();
    assert_eq!((placement.width, placement.height), (100.0, 50.0));
    assert_eq!(ed.history().last().unwrap().action, "Resize media");
}

#[test]
fn test_media_resize_needs_resizable_media() {
    let mut ed = editor(2, 2);
    let cell = CellAddr::new(1, 1);
    assert!(ed.begin_resize(ResizeTarget::Media { cell }, 0.0, 0.0).is_err());
    ed.set_media(
        1,
        1,
        Some(CellMedia::Link {
            url: "https://example.com".into(),
            text: None,
        }),
    )
    .unwrap();
    assert!(ed.begin_resize(ResizeTarget::Media { cell }, 0.0, 0.0).is_err());
}
