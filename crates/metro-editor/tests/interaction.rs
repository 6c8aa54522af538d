//! Integration tests: direct manipulation (metro-editor).
//!
//! Feeds pointer, wheel and frame events through `Editor::handle` and checks
//! the resulting document, camera and scene. The fixture's saved camera is
//! the identity, so screen pixels equal scene units until a test zooms.

use metro_core::{Id, Point as MapPoint, SegmentRef, Selection};
use metro_editor::{Editor, EditorConfig, EditorEvent, Mode, NullSink};
use metro_render::{ItemKey, Layer, Point};
use pretty_assertions::assert_eq;

fn make_editor() -> Editor<NullSink> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut editor = Editor::new(EditorConfig::default(), NullSink);
    editor.load_json(include_str!("fixtures/two_lines.json"));
    editor
}

fn id(s: &str) -> Id {
    Id::intern(s)
}

fn down(editor: &mut Editor<NullSink>, x: f64, y: f64) -> bool {
    editor.handle(EditorEvent::PointerDown { x, y })
}

fn move_to(editor: &mut Editor<NullSink>, x: f64, y: f64) -> bool {
    editor.handle(EditorEvent::PointerMove { x, y })
}

fn up(editor: &mut Editor<NullSink>, x: f64, y: f64) -> bool {
    editor.handle(EditorEvent::PointerUp { x, y })
}

fn logical(editor: &Editor<NullSink>, station: &str) -> MapPoint {
    editor
        .section()
        .and_then(|s| s.station(id(station)))
        .map(|s| s.position())
        .unwrap_or(MapPoint::new(f64::NAN, f64::NAN))
}

fn rendered(editor: &Editor<NullSink>, station: &str) -> Option<Point> {
    editor
        .scene()
        .station_position(editor.section()?, id(station))
}

fn drag_station(editor: &mut Editor<NullSink>, from: (f64, f64), to: (f64, f64)) {
    assert!(down(editor, from.0, from.1));
    assert!(matches!(editor.mode(), Mode::DraggingStation { .. }));
    move_to(editor, to.0, to.1);
    editor.handle(EditorEvent::Frame { now_ms: 16.0 });
    up(editor, to.0, to.1);
}

// ─── Station drag ────────────────────────────────────────────────────────

#[test]
fn drag_commits_grid_aligned_target() {
    let mut editor = make_editor();
    drag_station(&mut editor, (100.0, 100.0), (150.0, 120.0));
    assert_eq!(logical(&editor, "S2"), MapPoint::new(150.0, 120.0));
    assert_eq!(editor.mode(), Mode::Idle);
    assert_eq!(editor.history_len(), 1);
}

#[test]
fn drag_snaps_with_odd_step() {
    let mut editor = make_editor();
    assert!(editor.set_snap_step(7.0));
    drag_station(&mut editor, (100.0, 100.0), (150.0, 120.0));
    assert_eq!(logical(&editor, "S2"), MapPoint::new(147.0, 119.0));
}

#[test]
fn drag_is_render_only_until_release() {
    let mut editor = make_editor();
    down(&mut editor, 100.0, 100.0);
    move_to(&mut editor, 130.0, 160.0);
    // coalesced: nothing moves before the frame
    assert_eq!(rendered(&editor, "S2"), Some(Point::new(100.0, 100.0)));
    move_to(&mut editor, 150.0, 170.0);
    editor.handle(EditorEvent::Frame { now_ms: 16.0 });
    assert_eq!(rendered(&editor, "S2"), Some(Point::new(150.0, 170.0)));
    assert_eq!(logical(&editor, "S2"), MapPoint::new(100.0, 100.0));
    assert_eq!(editor.history_len(), 0);

    up(&mut editor, 150.0, 170.0);
    assert_eq!(logical(&editor, "S2"), MapPoint::new(150.0, 170.0));
    assert!(editor.scene().drag_position().is_none());
}

#[test]
fn drag_commit_divides_by_coordinate_scale() {
    let mut editor = make_editor();
    assert!(editor.set_coordinate_scale(2.0));
    // S2 (100, 100) renders at (200, 200)
    drag_station(&mut editor, (200.0, 200.0), (300.0, 240.0));
    assert_eq!(logical(&editor, "S2"), MapPoint::new(150.0, 120.0));
}

#[test]
fn drag_undo_restores_position() {
    let mut editor = make_editor();
    drag_station(&mut editor, (100.0, 100.0), (150.0, 120.0));
    assert!(editor.handle(EditorEvent::ctrl_key("z")));
    assert_eq!(logical(&editor, "S2"), MapPoint::new(100.0, 100.0));
    assert_eq!(rendered(&editor, "S2"), Some(Point::new(100.0, 100.0)));
}

#[test]
fn click_without_move_changes_nothing() {
    let mut editor = make_editor();
    down(&mut editor, 100.0, 100.0);
    up(&mut editor, 100.0, 100.0);
    assert_eq!(editor.history_len(), 0);
    assert_eq!(
        editor.selection(),
        Selection::Station {
            line: id("L1"),
            station: id("S2")
        }
    );
}

// ─── Control points ──────────────────────────────────────────────────────

#[test]
fn control_drag_is_one_undo_step() {
    let mut editor = make_editor();
    let seg = SegmentRef::new(id("L1"), id("S1"), id("S2"));

    // select the straight S1-S2 segment by its middle
    down(&mut editor, 50.0, 100.0);
    up(&mut editor, 50.0, 100.0);
    assert_eq!(editor.selection(), Selection::Segment(seg));
    assert!(editor.scene().item(Layer::Controls, ItemKey::Controls).is_some());

    // first handle sits a third of the way along the chord
    down(&mut editor, 33.0, 100.0);
    assert_eq!(
        editor.mode(),
        Mode::DraggingControlPoint {
            segment: seg,
            index: 0
        }
    );
    move_to(&mut editor, 40.0, 150.0);
    move_to(&mut editor, 50.0, 160.0);
    up(&mut editor, 50.0, 160.0);

    let curve = editor
        .section()
        .and_then(|s| s.curve(id("S2"), id("S1")))
        .cloned()
        .expect("curve created");
    assert_eq!(
        curve.points,
        vec![MapPoint::new(50.0, 160.0), MapPoint::new(40.0, 150.0)]
    );
    assert_eq!(editor.history_len(), 1);

    assert!(editor.undo());
    assert!(editor.section().unwrap().curve(id("S1"), id("S2")).is_none());
    assert_eq!(editor.history_len(), 0);
}

// ─── Camera ──────────────────────────────────────────────────────────────

#[test]
fn wheel_zoom_keeps_point_under_cursor() {
    let mut editor = make_editor();
    editor.set_coordinate_scale(2.0);
    let cursor = Point::new(237.0, 411.0);
    let before = editor
        .scene()
        .to_logical(editor.camera().to_world(cursor));

    assert!(editor.handle(EditorEvent::Wheel {
        x: cursor.x,
        y: cursor.y,
        delta_y: -120.0,
    }));
    assert!((editor.camera().zoom - 1.1).abs() < 1e-12);

    let after = editor
        .camera()
        .to_screen(editor.scene().to_scene(before));
    assert!((after.x - cursor.x).abs() < 1e-9);
    assert!((after.y - cursor.y).abs() < 1e-9);
}

#[test]
fn wheel_zoom_is_clamped() {
    let mut editor = make_editor();
    for _ in 0..100 {
        editor.handle(EditorEvent::Wheel {
            x: 0.0,
            y: 0.0,
            delta_y: 1.0,
        });
    }
    assert!((editor.camera().zoom - 0.2).abs() < 1e-12);
    assert!(!editor.handle(EditorEvent::Wheel {
        x: 0.0,
        y: 0.0,
        delta_y: 1.0,
    }));
}

#[test]
fn fit_centres_all_stations() {
    let mut editor = make_editor();
    editor.handle(EditorEvent::Resize {
        width: 1000.0,
        height: 700.0,
    });
    assert!(editor.handle(EditorEvent::ctrl_key("0")));
    // stations span (0, 100)..(200, 300); its centre lands mid-viewport
    let centre = editor.camera().to_screen(Point::new(100.0, 200.0));
    assert!((centre.x - 500.0).abs() < 1e-9);
    assert!((centre.y - 350.0).abs() < 1e-9);
    assert!((editor.camera().zoom - 3.3).abs() < 1e-9);
}

#[test]
fn fit_on_empty_section_is_noop() {
    let mut editor = Editor::new(EditorConfig::default(), NullSink);
    editor.load_json("{}");
    let camera = *editor.camera();
    assert!(!editor.fit_to_content());
    assert_eq!(*editor.camera(), camera);
}

#[test]
fn coordinate_scale_doubles_rendered_positions() {
    let mut editor = make_editor();
    let before = editor.document().clone();
    assert!(editor.set_coordinate_scale(2.0));
    for station in ["S1", "S2", "S3", "P1", "P2"] {
        let p = logical(&editor, station);
        assert_eq!(rendered(&editor, station), Some(Point::new(p.x * 2.0, p.y * 2.0)));
    }
    assert_eq!(editor.document(), &before);
    assert!(!editor.set_coordinate_scale(0.0));
    assert!(!editor.set_coordinate_scale(6.0));
}

// ─── Rivers ──────────────────────────────────────────────────────────────

#[test]
fn river_is_committed_on_second_toggle() {
    let mut editor = make_editor();
    assert!(editor.handle(EditorEvent::ToggleRiver));
    move_to(&mut editor, 10.0, 10.0);
    move_to(&mut editor, 60.0, 20.0);
    move_to(&mut editor, 110.0, 15.0);
    assert_eq!(editor.river_points().len(), 3);
    assert!(
        editor
            .scene()
            .item(Layer::Rivers, ItemKey::RiverPreview)
            .is_some()
    );

    assert!(editor.handle(EditorEvent::ToggleRiver));
    let rivers = &editor.section().unwrap().rivers;
    assert_eq!(rivers.len(), 1);
    assert_eq!(rivers[0].points[1], MapPoint::new(60.0, 20.0));
    assert!(rivers[0].id.as_str().starts_with("river_"));
    assert!(
        editor
            .scene()
            .item(Layer::Rivers, ItemKey::RiverPreview)
            .is_none()
    );
}

#[test]
fn teardown_drops_transient_state() {
    let mut editor = make_editor();
    editor.handle(EditorEvent::ToggleRiver);
    move_to(&mut editor, 10.0, 10.0);
    editor.teardown();
    assert_eq!(editor.mode(), Mode::Idle);
    assert!(editor.river_points().is_empty());
    assert!(editor.scene().layer(Layer::Stations).items.is_empty());
}

#[test]
fn resize_updates_viewport() {
    let mut editor = make_editor();
    assert!(editor.handle(EditorEvent::Resize {
        width: 640.0,
        height: 480.0
    }));
    assert!(!editor.handle(EditorEvent::Resize {
        width: 640.0,
        height: 480.0
    }));
}
