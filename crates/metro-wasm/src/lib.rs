//! WASM bridge for NiMetro: exposes the map editor to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The page owns the
//! `<canvas>`, forwards DOM events here and repaints when a call returns
//! `true`. Structured results cross the boundary as JSON strings.

mod render2d;

use metro_core::{
    Background, Id, MapDocument, Point, SectionKind, Selection, TextPosition, TransferKind,
    parse_document,
};
use metro_editor::{
    ChangeSink, Editor, EditorConfig, EditorEvent, LayerToggle, MapMutation, RegenerateScope,
};
use metro_render::Size;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

// ─── Change sink ─────────────────────────────────────────────────────────

/// Hands each debounced document to a JS callback as a JSON string.
#[derive(Default)]
pub struct JsChangeSink {
    callback: Option<js_sys::Function>,
}

impl ChangeSink for JsChangeSink {
    fn on_change(&mut self, doc: &MapDocument) {
        let Some(cb) = &self.callback else {
            return;
        };
        match serde_json::to_string(doc) {
            Ok(json) => {
                if let Err(e) = cb.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                    log::warn!("change callback threw: {e:?}");
                }
            }
            Err(e) => log::warn!("document serialization failed: {e}"),
        }
    }
}

// ─── Canvas controller ───────────────────────────────────────────────────

/// The main WASM-facing editor handle.
///
/// Holds the editor and the host-decoded background image. All
/// interaction from the page goes through this struct.
#[wasm_bindgen]
pub struct MetroCanvas {
    editor: Editor<JsChangeSink>,
    /// Background loaded by the page for non-`data:` URLs.
    background: Option<HtmlImageElement>,
    width: f64,
    height: f64,
}

#[wasm_bindgen]
impl MetroCanvas {
    /// Create a new editor for a canvas of the given CSS size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();

        let config = EditorConfig {
            viewport: Size::new(width, height),
            ..EditorConfig::default()
        };
        Self {
            editor: Editor::new(config, JsChangeSink::default()),
            background: None,
            width,
            height,
        }
    }

    /// Register the persistence callback. It receives the document JSON
    /// once edits have been quiet for the debounce period.
    pub fn set_on_change(&mut self, callback: js_sys::Function) {
        self.editor.sink_mut().callback = Some(callback);
    }

    // ─── Document I/O ────────────────────────────────────────────────────

    /// Load a document from JSON text. Malformed input loads an empty map.
    ///
    /// Returns `{"ok":true}` or `{"ok":false,"error":"..."}`; on error the
    /// editor still holds a usable, empty document.
    pub fn load_json(&mut self, text: &str) -> String {
        self.background = None;
        match self.editor.load(parse_document(text)) {
            None => r#"{"ok":true}"#.to_string(),
            Some(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }

    /// Exported document, or `{"ok":false,...}` on serialization failure.
    pub fn export_json(&self) -> String {
        match self.editor.export() {
            Ok(json) => json,
            Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }

    pub fn export_file_name(&self) -> String {
        self.editor.export_file_name()
    }

    /// Lint findings as a JSON array.
    pub fn lint_json(&self) -> String {
        let diags: Vec<serde_json::Value> = self
            .editor
            .lint()
            .into_iter()
            .map(|d| {
                serde_json::json!({
                    "rule": d.rule,
                    "severity": format!("{:?}", d.severity).to_lowercase(),
                    "message": d.message,
                    "section": d.section.key(),
                    "subject": d.subject.map(|id| id.as_str().to_string()),
                })
            })
            .collect();
        serde_json::Value::Array(diags).to_string()
    }

    /// Push a pending save to the callback right away.
    pub fn flush(&mut self) -> bool {
        self.editor.flush()
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let background = if self.editor.settings().background.is_visible() {
            self.background.as_ref()
        } else {
            None
        };
        render2d::render_scene(
            ctx,
            self.editor.scene(),
            self.editor.camera(),
            self.width,
            self.height,
            background,
        );
    }

    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        self.width = width;
        self.height = height;
        self.editor.handle(EditorEvent::Resize { width, height })
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle_pointer_down(&mut self, x: f64, y: f64) -> bool {
        self.editor.handle(EditorEvent::PointerDown { x, y })
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.editor.handle(EditorEvent::PointerMove { x, y })
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64) -> bool {
        self.editor.handle(EditorEvent::PointerUp { x, y })
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64) -> bool {
        self.editor.handle(EditorEvent::Wheel { x, y, delta_y })
    }

    /// Handle a keyboard event. Returns `true` if the key was consumed.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> bool {
        self.editor.handle(EditorEvent::Key {
            key: key.to_string(),
            ctrl,
            shift,
            alt,
            meta,
        })
    }

    /// Start drawing a river, or commit the one being drawn.
    pub fn toggle_river(&mut self) -> bool {
        self.editor.handle(EditorEvent::ToggleRiver)
    }

    /// Per-animation-frame hook: applies coalesced drags and runs the
    /// persistence debounce.
    pub fn frame(&mut self, now_ms: f64) -> bool {
        self.editor.handle(EditorEvent::Frame { now_ms })
    }

    /// `"idle"`, `"dragging-station"`, `"dragging-control"`, `"panning"` or
    /// `"adding-river"`.
    pub fn mode_name(&self) -> String {
        use metro_editor::Mode;
        match self.editor.mode() {
            Mode::Idle => "idle",
            Mode::DraggingStation { .. } => "dragging-station",
            Mode::DraggingControlPoint { .. } => "dragging-control",
            Mode::Panning { .. } => "panning",
            Mode::AddingRiver => "adding-river",
        }
        .to_string()
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) -> bool {
        self.editor.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.editor.zoom_out()
    }

    pub fn fit_to_content(&mut self) -> bool {
        self.editor.fit_to_content()
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        self.editor.set_zoom(zoom)
    }

    pub fn get_zoom(&self) -> f64 {
        self.editor.camera().zoom
    }

    pub fn set_coordinate_scale(&mut self, scale: f64) -> bool {
        self.editor.set_coordinate_scale(scale)
    }

    // ─── Settings ────────────────────────────────────────────────────────

    pub fn set_snap_to_grid(&mut self, on: bool) {
        self.editor.set_snap_to_grid(on);
    }

    pub fn set_snap_step(&mut self, step: f64) -> bool {
        self.editor.set_snap_step(step)
    }

    /// `name` is one of `grid`, `lines`, `transfers`, `stations`, `labels`.
    pub fn set_layer_visible(&mut self, name: &str, visible: bool) -> bool {
        match layer_toggle(name) {
            Some(toggle) => self.editor.set_layer_visible(toggle, visible),
            None => false,
        }
    }

    /// Current editor settings as JSON (the `info.editorSettings` shape).
    pub fn settings_json(&self) -> String {
        serde_json::to_string(self.editor.settings()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Place a background image. The page loads `url` into an `<img>` and
    /// reports back through `set_background_element` or
    /// `background_failed`; `data:` URLs are also validated here.
    pub fn set_background(&mut self, url: &str, x: f64, y: f64, w: f64, h: f64, alpha: f64) -> bool {
        let url_changed = url != self.editor.settings().background.url;
        let changed = self.editor.set_background(Background {
            url: url.to_string(),
            x,
            y,
            w,
            h,
            alpha,
        });
        if url_changed {
            self.background = None;
        }
        changed
    }

    pub fn set_background_element(&mut self, img: HtmlImageElement) {
        self.background = Some(img);
        self.editor.set_background_loaded(true);
    }

    pub fn background_failed(&mut self) {
        self.background = None;
        self.editor.set_background_loaded(false);
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    /// Add a line to the active section. Returns its id, or `""`.
    pub fn add_line(&mut self) -> String {
        id_or_empty(self.editor.add_line())
    }

    /// Append a station to the selected line. Returns its id, or `""`.
    pub fn add_station(&mut self) -> String {
        id_or_empty(self.editor.add_station())
    }

    /// `stations_json` is a JSON array of station ids. Returns the new
    /// transfer id, or `""`.
    pub fn add_transfer(&mut self, stations_json: &str, time: f64) -> String {
        let Ok(ids) = serde_json::from_str::<Vec<String>>(stations_json) else {
            log::warn!("add_transfer: expected a JSON array of ids");
            return String::new();
        };
        let stations = ids.iter().map(|s| Id::intern(s)).collect();
        id_or_empty(self.editor.add_transfer(stations, time))
    }

    pub fn remove_line(&mut self, line: &str) -> bool {
        self.commit(MapMutation::RemoveLine(Id::intern(line)))
    }

    pub fn rename_line(&mut self, line: &str, name: &str) -> bool {
        self.commit(MapMutation::RenameLine {
            line: Id::intern(line),
            name: name.to_string(),
        })
    }

    pub fn recolor_line(&mut self, line: &str, color: &str) -> bool {
        self.commit(MapMutation::RecolorLine {
            line: Id::intern(line),
            color: color.to_string(),
        })
    }

    pub fn remove_station(&mut self, station: &str) -> bool {
        self.commit(MapMutation::RemoveStation(Id::intern(station)))
    }

    pub fn rename_station(&mut self, station: &str, name: &str) -> bool {
        self.commit(MapMutation::RenameStation {
            station: Id::intern(station),
            name: name.to_string(),
        })
    }

    /// Move a station to logical coordinates.
    pub fn move_station(&mut self, station: &str, x: f64, y: f64) -> bool {
        self.commit(MapMutation::MoveStation {
            station: Id::intern(station),
            to: Point::new(x, y),
        })
    }

    /// Label placement 0..=8; anything else hides the label. A negative
    /// value clears it back to the default.
    pub fn set_text_position(&mut self, station: &str, position: i32) -> bool {
        let position = match position {
            p if p < 0 => None,
            p => Some(TextPosition(p.min(TextPosition::HIDDEN.0 as i32) as u8)),
        };
        self.commit(MapMutation::SetTextPosition {
            station: Id::intern(station),
            position,
        })
    }

    pub fn remove_transfer(&mut self, transfer: &str) -> bool {
        self.commit(MapMutation::RemoveTransfer(Id::intern(transfer)))
    }

    /// Change a transfer's time and type. A non-finite `time` or an empty
    /// `kind` leaves that field alone.
    pub fn edit_transfer(&mut self, transfer: &str, time: f64, kind: &str) -> bool {
        self.commit(MapMutation::EditTransfer {
            transfer: Id::intern(transfer),
            time: time.is_finite().then_some(time),
            kind: (!kind.is_empty()).then(|| TransferKind::from(kind.to_string())),
        })
    }

    pub fn remove_transfer_station(&mut self, transfer: &str, station: &str) -> bool {
        self.commit(MapMutation::RemoveTransferStation {
            transfer: Id::intern(transfer),
            station: Id::intern(station),
        })
    }

    pub fn add_neighbor(&mut self, station: &str, neighbor: &str, time: f64) -> bool {
        self.commit(MapMutation::AddNeighbors {
            station: Id::intern(station),
            neighbors: vec![Id::intern(neighbor)],
            time,
        })
    }

    pub fn remove_neighbor(&mut self, station: &str, neighbor: &str) -> bool {
        self.commit(MapMutation::RemoveNeighbor {
            station: Id::intern(station),
            neighbor: Id::intern(neighbor),
        })
    }

    pub fn set_neighbor_time(&mut self, station: &str, neighbor: &str, time: f64) -> bool {
        self.commit(MapMutation::SetNeighborTime {
            station: Id::intern(station),
            neighbor: Id::intern(neighbor),
            time,
        })
    }

    /// `scope` is `"line"` (the selected line), `"section"` or `"document"`.
    pub fn regenerate_neighbors(&mut self, scope: &str) -> bool {
        let scope = match scope {
            "line" => match self.editor.selection().line() {
                Some(line) => RegenerateScope::Line(line),
                None => return false,
            },
            "section" => RegenerateScope::Section,
            "document" => RegenerateScope::Document,
            _ => return false,
        };
        self.editor.regenerate_neighbors(scope)
    }

    /// Bend the segment between two stations; a no-op when already curved.
    pub fn add_curve(&mut self, a: &str, b: &str) -> bool {
        self.commit(MapMutation::AddCurve {
            a: Id::intern(a),
            b: Id::intern(b),
        })
    }

    /// Straighten the curve between two stations.
    pub fn remove_curve(&mut self, a: &str, b: &str) -> bool {
        self.commit(MapMutation::RemoveCurve {
            a: Id::intern(a),
            b: Id::intern(b),
        })
    }

    pub fn remove_river(&mut self, river: &str) -> bool {
        self.commit(MapMutation::RemoveRiver(Id::intern(river)))
    }

    pub fn undo(&mut self) -> bool {
        self.editor.undo()
    }

    pub fn can_undo(&self) -> bool {
        self.editor.can_undo()
    }

    // ─── Selection & sections ────────────────────────────────────────────

    /// The current selection as JSON, e.g. `{"kind":"station","line":"L1","station":"S2"}`.
    pub fn get_selection(&self) -> String {
        selection_json(self.editor.selection()).to_string()
    }

    pub fn select_line(&mut self, line: &str) -> bool {
        self.editor.select(Selection::Line(Id::intern(line)))
    }

    pub fn select_station(&mut self, line: &str, station: &str) -> bool {
        self.editor.select(Selection::Station {
            line: Id::intern(line),
            station: Id::intern(station),
        })
    }

    pub fn select_transfer(&mut self, transfer: &str) -> bool {
        self.editor.select(Selection::Transfer(Id::intern(transfer)))
    }

    pub fn clear_selection(&mut self) -> bool {
        self.editor.select(Selection::None)
    }

    /// Switch the edited section by its JSON key (e.g. `"tram_map"`).
    pub fn set_active_section(&mut self, key: &str) -> bool {
        match SectionKind::from_key(key) {
            Some(kind) => {
                self.editor.set_active_section(kind);
                true
            }
            None => false,
        }
    }

    pub fn active_section(&self) -> String {
        self.editor.active_section().key().to_string()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Release everything the editor holds. Pending saves are dropped;
    /// call `flush` first to keep them.
    pub fn dispose(&mut self) {
        self.editor.teardown();
        self.editor.sink_mut().callback = None;
        self.background = None;
    }
}

impl MetroCanvas {
    fn commit(&mut self, mutation: MapMutation) -> bool {
        self.editor.handle(EditorEvent::MutationCommitted(mutation))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn id_or_empty(id: Option<Id>) -> String {
    id.map(|id| id.as_str().to_string()).unwrap_or_default()
}

fn layer_toggle(name: &str) -> Option<LayerToggle> {
    match name {
        "grid" => Some(LayerToggle::Grid),
        "lines" => Some(LayerToggle::Lines),
        "transfers" => Some(LayerToggle::Transfers),
        "stations" => Some(LayerToggle::Stations),
        "labels" => Some(LayerToggle::Labels),
        _ => None,
    }
}

fn selection_json(selection: Selection) -> serde_json::Value {
    use serde_json::json;
    match selection {
        Selection::None => json!({ "kind": "none" }),
        Selection::Line(line) => json!({ "kind": "line", "line": line.as_str() }),
        Selection::Station { line, station } => json!({
            "kind": "station",
            "line": line.as_str(),
            "station": station.as_str(),
        }),
        Selection::Transfer(t) => json!({ "kind": "transfer", "transfer": t.as_str() }),
        Selection::Segment(seg) => json!({
            "kind": "segment",
            "line": seg.line.as_str(),
            "from": seg.a.as_str(),
            "to": seg.b.as_str(),
        }),
        Selection::ControlPoint { segment, index } => json!({
            "kind": "control-point",
            "line": segment.line.as_str(),
            "from": segment.a.as_str(),
            "to": segment.b.as_str(),
            "index": index,
        }),
    }
}

/// Set up a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("NiMetro WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

/// Parse and normalize a document without creating an editor. Returns
/// `{"ok":true,"stations":N}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(source: &str) -> String {
    let outcome = parse_document(source);
    match outcome.notice {
        None => serde_json::json!({
            "ok": true,
            "stations": outcome.document.station_count(),
        })
        .to_string(),
        Some(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r##"{
        "metro_map": {
            "lines": [{
                "id": "L1", "name": "Red", "color": "#ff0000",
                "stations": [
                    { "id": "S1", "name": "A", "x": 0, "y": 0 },
                    { "id": "S2", "name": "B", "x": 100, "y": 0 }
                ]
            }]
        }
    }"##;

    #[test]
    fn load_and_edit_through_bridge() {
        let mut canvas = MetroCanvas::new(800.0, 600.0);
        assert_eq!(canvas.load_json(DOC), r#"{"ok":true}"#);
        assert!(canvas.rename_station("S1", "Alpha"));
        assert!(canvas.can_undo());
        assert!(canvas.undo());
        assert!(!canvas.can_undo());
    }

    #[test]
    fn curves_are_added_once_and_undone_in_one_step() {
        let mut canvas = MetroCanvas::new(800.0, 600.0);
        canvas.load_json(DOC);
        assert!(canvas.add_curve("S2", "S1"));
        assert!(!canvas.add_curve("S1", "S2"));
        assert!(canvas.undo());
        assert!(!canvas.can_undo());
        assert!(canvas.add_curve("S1", "S2"));
    }

    #[test]
    fn malformed_json_reports_error() {
        let mut canvas = MetroCanvas::new(800.0, 600.0);
        let out: serde_json::Value = serde_json::from_str(&canvas.load_json("{nope")).unwrap();
        assert_eq!(out["ok"], false);
        assert!(out["error"].is_string());
    }

    #[test]
    fn selection_is_reported_as_json() {
        let mut canvas = MetroCanvas::new(800.0, 600.0);
        canvas.load_json(DOC);
        assert!(canvas.select_station("L1", "S2"));
        let sel: serde_json::Value = serde_json::from_str(&canvas.get_selection()).unwrap();
        assert_eq!(sel["kind"], "station");
        assert_eq!(sel["station"], "S2");

        // unknown targets clear the selection
        canvas.select_station("L1", "ghost");
        let sel: serde_json::Value = serde_json::from_str(&canvas.get_selection()).unwrap();
        assert_eq!(sel["kind"], "none");
    }

    #[test]
    fn section_keys_round_trip() {
        let mut canvas = MetroCanvas::new(800.0, 600.0);
        canvas.load_json(DOC);
        assert!(canvas.set_active_section("tram_map"));
        assert_eq!(canvas.active_section(), "tram_map");
        assert!(!canvas.set_active_section("bus_map"));
    }

    #[test]
    fn unknown_layer_name_is_rejected() {
        assert_eq!(layer_toggle("labels"), Some(LayerToggle::Labels));
        assert_eq!(layer_toggle("rivers"), None);
    }
}
