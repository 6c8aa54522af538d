//! Direct-manipulation controller.
//!
//! [`Editor`] owns the whole editing session: document engine, camera,
//! selection, retained scene and the active gesture. Hosts feed it
//! [`EditorEvent`]s; [`Editor::handle`] runs the transition for the current
//! [`Mode`] and reports whether the canvas should be repainted.
//!
//! Station drags are render-only until release: pointer moves store a
//! pending target, the next `Frame` applies it to the scene, and
//! `PointerUp` commits one `MoveStation` mutation.

use crate::config::EditorConfig;
use crate::engine::{ChangeSink, MapEngine};
use crate::input::EditorEvent;
use crate::mutation::{MapMutation, RegenerateScope};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use metro_core::settings::clamp_snap_step;
use metro_core::{
    Background, EditorSettings, ExportOptions, LineId, LintDiagnostic, LoadOutcome, MapDocument,
    MapError, MapSection, Point as MapPoint, SectionKind, SegmentRef, Selection, StationId,
    TransferId, export_document, export_file_name, lint_document, parse_document,
};
use metro_render::background::is_data_url;
use metro_render::camera::{ZOOM_STEP, valid_coordinate_scale};
use metro_render::{
    BackgroundImage, Camera, HitTarget, MapScene, Point, Rect, SceneContext, Size, Vec2,
    decode_data_url, hit_test,
};

/// Wheel zoom step per notch.
pub const WHEEL_ZOOM_STEP: f64 = 0.1;

/// The gesture in progress. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    DraggingStation {
        line: LineId,
        station: StationId,
        /// Pointer minus marker centre at grab time (scene units).
        offset: Vec2,
        /// Latest target not yet applied to the scene.
        pending: Option<Point>,
    },
    DraggingControlPoint {
        segment: SegmentRef,
        index: usize,
    },
    Panning {
        start_pointer: Point,
        start_pan: Vec2,
    },
    AddingRiver,
}

/// Layer toggles persisted in the document settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerToggle {
    Grid,
    Lines,
    Transfers,
    Stations,
    Labels,
}

/// `round(v / step) * step` on both axes.
pub fn snap_point(p: Point, step: f64) -> Point {
    let step = clamp_snap_step(step);
    Point::new((p.x / step).round() * step, (p.y / step).round() * step)
}

// ─── State ───────────────────────────────────────────────────────────────

/// Everything except the scene, so a [`SceneContext`] can borrow it while
/// the scene is rebuilt.
struct EditorState<S: ChangeSink> {
    engine: MapEngine<S>,
    config: EditorConfig,
    settings: EditorSettings,
    selection: Selection,
    camera: Camera,
    viewport: Size,
    river_points: Vec<MapPoint>,
    background_available: bool,
}

impl<S: ChangeSink> EditorState<S> {
    fn ctx(&self) -> SceneContext<'_> {
        SceneContext {
            section: self.engine.section(),
            selection: self.selection,
            settings: &self.settings,
            visible_world: self.camera.visible_world(self.viewport),
            river_preview: &self.river_points,
            background_available: self.background_available,
        }
    }

    /// Copy the live camera and toggles into the document settings.
    fn persist_settings(&mut self) {
        self.settings.canvas_view.scale = self.camera.zoom;
        self.settings.canvas_view.pos_x = self.camera.pan.x;
        self.settings.canvas_view.pos_y = self.camera.pan.y;
        self.engine.store_settings(self.settings.clone());
    }
}

// ─── Editor ──────────────────────────────────────────────────────────────

pub struct Editor<S: ChangeSink> {
    state: EditorState<S>,
    scene: MapScene,
    mode: Mode,
    background: Option<BackgroundImage>,
}

impl<S: ChangeSink> Editor<S> {
    pub fn new(config: EditorConfig, sink: S) -> Self {
        let engine = MapEngine::new(sink, config.history_depth, config.save_quiet_ms);
        let mut settings = EditorSettings::default();
        settings.snap_step = config.clamped_snap_step();
        let viewport = config.viewport;
        let mut editor = Self {
            state: EditorState {
                engine,
                config,
                settings,
                selection: Selection::None,
                camera: Camera::default(),
                viewport,
                river_points: Vec::new(),
                background_available: false,
            },
            scene: MapScene::new(),
            mode: Mode::Idle,
            background: None,
        };
        let scale = editor.state.config.coordinate_scale;
        let ctx = editor.state.ctx();
        if !editor.scene.set_coordinate_scale(scale, &ctx) {
            editor.scene.rebuild_all(&ctx);
        }
        editor
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Replace the document and reset the session around it. Saved view
    /// settings are restored; without them the camera fits the content.
    pub fn load(&mut self, outcome: LoadOutcome) -> Option<MapError> {
        self.reset_transient();
        self.state.selection = Selection::None;
        let saved = outcome.document.info.editor_settings.clone();
        let notice = self.state.engine.load(outcome);

        match saved {
            Some(settings) => {
                let view = settings.canvas_view;
                self.state.settings = settings;
                self.state.settings.snap_step = self.state.settings.clamped_snap_step();
                if view.scale.is_finite() && view.scale > 0.0 {
                    self.state.camera.zoom = Camera::clamp_zoom(view.scale);
                    self.state.camera.pan = Vec2::new(
                        if view.pos_x.is_finite() { view.pos_x } else { 0.0 },
                        if view.pos_y.is_finite() { view.pos_y } else { 0.0 },
                    );
                } else {
                    self.fit_camera();
                }
            }
            None => {
                let mut settings = EditorSettings::default();
                settings.snap_step = self.state.config.clamped_snap_step();
                self.state.settings = settings;
                self.fit_camera();
            }
        }
        self.load_background();
        self.rebuild_all();
        notice
    }

    /// Parse JSON text and load it; unusable input loads the empty skeleton.
    pub fn load_json(&mut self, text: &str) -> Option<MapError> {
        self.load(parse_document(text))
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn document(&self) -> &MapDocument {
        self.state.engine.document()
    }

    pub fn section(&self) -> Option<&MapSection> {
        self.state.engine.section()
    }

    pub fn active_section(&self) -> SectionKind {
        self.state.engine.active_section()
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn camera(&self) -> &Camera {
        &self.state.camera
    }

    pub fn scene(&self) -> &MapScene {
        &self.scene
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.state.settings
    }

    pub fn config(&self) -> &EditorConfig {
        &self.state.config
    }

    pub fn background_image(&self) -> Option<&BackgroundImage> {
        self.background.as_ref()
    }

    pub fn river_points(&self) -> &[MapPoint] {
        &self.state.river_points
    }

    pub fn history_len(&self) -> usize {
        self.state.engine.history_len()
    }

    pub fn can_undo(&self) -> bool {
        self.state.engine.can_undo()
    }

    pub fn sink(&self) -> &S {
        self.state.engine.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.state.engine.sink_mut()
    }

    // ─── Event reducer ───────────────────────────────────────────────────

    /// Feed one event. Returns `true` when the canvas should be repainted.
    pub fn handle(&mut self, event: EditorEvent) -> bool {
        match event {
            EditorEvent::PointerDown { x, y } => self.pointer_down(Point::new(x, y)),
            EditorEvent::PointerMove { x, y } => self.pointer_move(Point::new(x, y)),
            EditorEvent::PointerUp { .. } => self.pointer_up(),
            EditorEvent::Wheel { x, y, delta_y } => self.wheel(Point::new(x, y), delta_y),
            EditorEvent::Key {
                key,
                ctrl,
                shift,
                alt,
                meta,
            } => match ShortcutMap::resolve(&key, ctrl, shift, alt, meta) {
                Some(action) => self.shortcut(action),
                None => false,
            },
            EditorEvent::ToggleRiver => self.toggle_river(),
            EditorEvent::Frame { now_ms } => self.frame(now_ms),
            EditorEvent::Resize { width, height } => self.resize(Size::new(width, height)),
            EditorEvent::MutationCommitted(m) => self.apply(m),
        }
    }

    fn pointer_down(&mut self, screen: Point) -> bool {
        if self.mode != Mode::Idle {
            return false;
        }
        let at = self.state.camera.to_world(screen);
        let (hit, marker) = match self.state.engine.section() {
            Some(section) => {
                let hit = hit_test(
                    &self.scene,
                    section,
                    &self.state.selection,
                    at,
                    self.state.camera.zoom,
                );
                let marker = match hit {
                    Some(HitTarget::Station { station, .. }) => {
                        self.scene.station_position(section, station)
                    }
                    _ => None,
                };
                (hit, marker)
            }
            None => (None, None),
        };

        match hit {
            Some(HitTarget::Station { line, station }) => {
                let Some(marker) = marker else {
                    return false;
                };
                self.state.selection = Selection::Station { line, station };
                self.mode = Mode::DraggingStation {
                    line,
                    station,
                    offset: at - marker,
                    pending: None,
                };
            }
            Some(HitTarget::ControlPoint { segment, index }) => {
                self.state.selection = Selection::ControlPoint { segment, index };
                self.state.engine.begin_batch();
                self.mode = Mode::DraggingControlPoint { segment, index };
            }
            Some(other) => {
                self.state.selection = other.into();
            }
            None => {
                self.state.selection = Selection::None;
                self.mode = Mode::Panning {
                    start_pointer: screen,
                    start_pan: self.state.camera.pan,
                };
            }
        }
        self.rebuild_selection();
        true
    }

    fn pointer_move(&mut self, screen: Point) -> bool {
        let at = self.state.camera.to_world(screen);
        match self.mode {
            Mode::Idle => false,

            Mode::DraggingStation {
                line,
                station,
                offset,
                ..
            } => {
                let mut target = at - offset;
                if self.state.config.snap_to_grid {
                    target = snap_point(target, self.state.settings.snap_step);
                }
                self.mode = Mode::DraggingStation {
                    line,
                    station,
                    offset,
                    pending: Some(target),
                };
                true
            }

            Mode::DraggingControlPoint { segment, index } => {
                let logical = self.scene.to_logical(at);
                let changed = self.state.engine.execute(MapMutation::SetCurvePoint {
                    a: segment.a,
                    b: segment.b,
                    index,
                    at: logical,
                });
                if changed {
                    let ctx = self.state.ctx();
                    self.scene.rebuild_for_station(&ctx, segment.a);
                }
                changed
            }

            Mode::Panning {
                start_pointer,
                start_pan,
            } => {
                self.state.camera.pan = start_pan + (screen - start_pointer);
                let ctx = self.state.ctx();
                self.scene.rebuild_grid(&ctx);
                true
            }

            Mode::AddingRiver => {
                let logical = self.scene.to_logical(at);
                if !logical.is_finite() {
                    return false;
                }
                self.state.river_points.push(logical);
                let ctx = self.state.ctx();
                self.scene.rebuild_rivers(&ctx);
                true
            }
        }
    }

    fn pointer_up(&mut self) -> bool {
        match self.mode {
            Mode::DraggingStation {
                station, pending, ..
            } => {
                self.mode = Mode::Idle;
                let rendered = pending.or_else(|| {
                    self.scene
                        .drag_position()
                        .filter(|(id, _)| *id == station)
                        .map(|(_, at)| at)
                });
                self.scene.clear_drag();
                if let Some(rendered) = rendered {
                    let to = self.scene.to_logical(rendered);
                    self.state
                        .engine
                        .execute(MapMutation::MoveStation { station, to });
                }
                let ctx = self.state.ctx();
                self.scene.rebuild_for_station(&ctx, station);
                true
            }
            Mode::DraggingControlPoint { .. } => {
                self.mode = Mode::Idle;
                self.state.engine.end_batch();
                true
            }
            Mode::Panning { .. } => {
                self.mode = Mode::Idle;
                false
            }
            Mode::Idle | Mode::AddingRiver => false,
        }
    }

    fn wheel(&mut self, anchor: Point, delta_y: f64) -> bool {
        let dragging = matches!(
            self.mode,
            Mode::DraggingStation { .. } | Mode::DraggingControlPoint { .. } | Mode::Panning { .. }
        );
        if dragging || delta_y == 0.0 || !delta_y.is_finite() {
            return false;
        }
        let factor = 1.0 - delta_y.signum() * WHEEL_ZOOM_STEP;
        self.zoom_by(anchor, factor)
    }

    fn shortcut(&mut self, action: ShortcutAction) -> bool {
        match action {
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Deselect => self.select(Selection::None),
            ShortcutAction::ZoomIn => self.zoom_in(),
            ShortcutAction::ZoomOut => self.zoom_out(),
            ShortcutAction::ZoomToFit => self.fit_to_content(),
            ShortcutAction::ToggleRiver => self.toggle_river(),
        }
    }

    fn toggle_river(&mut self) -> bool {
        match self.mode {
            Mode::Idle => {
                self.state.river_points.clear();
                self.mode = Mode::AddingRiver;
                true
            }
            Mode::AddingRiver => {
                self.mode = Mode::Idle;
                let points = std::mem::take(&mut self.state.river_points);
                if points.len() >= 2 && self.state.engine.execute(MapMutation::new_river(points)) {
                    self.after_document_change();
                } else {
                    let ctx = self.state.ctx();
                    self.scene.rebuild_rivers(&ctx);
                }
                true
            }
            _ => false,
        }
    }

    /// Apply the coalesced drag target and deliver a due save.
    fn frame(&mut self, now_ms: f64) -> bool {
        let mut redraw = false;
        if let Mode::DraggingStation {
            line,
            station,
            offset,
            pending: Some(target),
        } = self.mode
        {
            self.mode = Mode::DraggingStation {
                line,
                station,
                offset,
                pending: None,
            };
            self.scene.set_drag_position(station, target);
            let ctx = self.state.ctx();
            self.scene.rebuild_for_station(&ctx, station);
            redraw = true;
        }
        self.state.engine.tick(now_ms);
        redraw
    }

    fn resize(&mut self, size: Size) -> bool {
        if !(size.width.is_finite() && size.height.is_finite()) || size == self.state.viewport {
            return false;
        }
        self.state.viewport = Size::new(size.width.max(0.0), size.height.max(0.0));
        let ctx = self.state.ctx();
        self.scene.rebuild_grid(&ctx);
        true
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    /// Commit a structural mutation to the active section.
    pub fn apply(&mut self, mutation: MapMutation) -> bool {
        if !self.state.engine.execute(mutation) {
            return false;
        }
        self.after_document_change();
        true
    }

    /// Undo the last step. A drag or pan in progress ends first: a station
    /// drag is dropped uncommitted and a control-point drag closes its batch,
    /// so that batch is what gets undone.
    pub fn undo(&mut self) -> bool {
        let interrupted = self.end_gesture();
        if !self.state.engine.undo() {
            if interrupted {
                self.rebuild_all();
            }
            return interrupted;
        }
        self.after_document_change();
        true
    }

    pub fn add_curve(&mut self, a: StationId, b: StationId) -> bool {
        self.apply(MapMutation::AddCurve { a, b })
    }

    /// Add a line named after its position; it becomes the selection.
    pub fn add_line(&mut self) -> Option<LineId> {
        let mutation = MapMutation::new_line(self.section());
        let MapMutation::AddLine(line) = &mutation else {
            return None;
        };
        let id = line.id;
        self.apply(mutation).then(|| {
            self.select(Selection::Line(id));
            id
        })
    }

    /// Append a station to the selected line.
    pub fn add_station(&mut self) -> Option<StationId> {
        let line_id = self.state.selection.line()?;
        let line = self.section()?.line(line_id)?;
        let mutation = MapMutation::new_station(line, self.state.config.default_neighbor_time);
        let MapMutation::AddStation { station, .. } = &mutation else {
            return None;
        };
        let id = station.id;
        self.apply(mutation).then(|| {
            self.select(Selection::Station {
                line: line_id,
                station: id,
            });
            id
        })
    }

    pub fn add_transfer(&mut self, stations: Vec<StationId>, time: f64) -> Option<TransferId> {
        let mutation = MapMutation::new_transfer(stations, time);
        let MapMutation::AddTransfer(transfer) = &mutation else {
            return None;
        };
        let id = transfer.id;
        self.apply(mutation).then_some(id)
    }

    pub fn regenerate_neighbors(&mut self, scope: RegenerateScope) -> bool {
        let time = self.state.config.default_neighbor_time;
        self.apply(MapMutation::RegenerateNeighbors { scope, time })
    }

    /// Switch the edited transport mode. Clears the selection.
    pub fn set_active_section(&mut self, kind: SectionKind) {
        if kind == self.active_section() {
            return;
        }
        self.reset_transient();
        self.state.engine.set_active_section(kind);
        self.state.selection = Selection::None;
        self.rebuild_all();
    }

    /// Change the selection; stale targets clear it.
    pub fn select(&mut self, selection: Selection) -> bool {
        let selection = if selection_exists(self.section(), &selection) {
            selection
        } else {
            Selection::None
        };
        if selection == self.state.selection {
            return false;
        }
        self.state.selection = selection;
        self.rebuild_selection();
        true
    }

    // ─── View ────────────────────────────────────────────────────────────

    fn zoom_by(&mut self, anchor: Point, factor: f64) -> bool {
        if !self.state.camera.zoom_at(anchor, factor) {
            return false;
        }
        let ctx = self.state.ctx();
        self.scene.rebuild_grid(&ctx);
        true
    }

    fn viewport_center(&self) -> Point {
        Point::new(
            self.state.viewport.width / 2.0,
            self.state.viewport.height / 2.0,
        )
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_by(self.viewport_center(), ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_by(self.viewport_center(), 1.0 / ZOOM_STEP)
    }

    /// Absolute zoom about the viewport centre, clamped to the zoom range.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        if !self.state.camera.set_zoom_at(self.viewport_center(), zoom) {
            return false;
        }
        let ctx = self.state.ctx();
        self.scene.rebuild_grid(&ctx);
        true
    }

    /// Frame every station of the active section. No-op without stations
    /// or with non-finite coordinates.
    pub fn fit_to_content(&mut self) -> bool {
        if !self.fit_camera() {
            return false;
        }
        let ctx = self.state.ctx();
        self.scene.rebuild_grid(&ctx);
        true
    }

    fn fit_camera(&mut self) -> bool {
        let Some(bounds) = self.content_bounds() else {
            return false;
        };
        let padding = self.state.config.fit_padding;
        self.state
            .camera
            .fit_to(bounds, self.state.viewport, padding)
    }

    fn content_bounds(&self) -> Option<Rect> {
        let section = self.section()?;
        let mut points = section.stations().map(|s| self.scene.to_scene(s.position()));
        let first = points.next()?;
        let bounds = points.fold(Rect::from_points(first, first), |r, p| {
            r.union_pt(p)
        });
        let finite = [bounds.x0, bounds.y0, bounds.x1, bounds.y1]
            .iter()
            .all(|v| v.is_finite());
        finite.then_some(bounds)
    }

    /// Change the logical → scene multiplier; every layer is rebuilt.
    pub fn set_coordinate_scale(&mut self, scale: f64) -> bool {
        if !valid_coordinate_scale(scale) {
            return false;
        }
        self.state.config.coordinate_scale = scale;
        let ctx = self.state.ctx();
        self.scene.set_coordinate_scale(scale, &ctx)
    }

    // ─── Settings ────────────────────────────────────────────────────────

    pub fn set_snap_to_grid(&mut self, on: bool) {
        self.state.config.snap_to_grid = on;
    }

    pub fn set_snap_step(&mut self, step: f64) -> bool {
        let step = clamp_snap_step(step);
        if step == self.state.settings.snap_step {
            return false;
        }
        self.state.settings.snap_step = step;
        self.state.config.snap_step = step;
        self.state.persist_settings();
        let ctx = self.state.ctx();
        self.scene.rebuild_grid(&ctx);
        true
    }

    pub fn set_layer_visible(&mut self, toggle: LayerToggle, visible: bool) -> bool {
        let s = &mut self.state.settings;
        let flag = match toggle {
            LayerToggle::Grid => &mut s.show_grid,
            LayerToggle::Lines => &mut s.show_lines,
            LayerToggle::Transfers => &mut s.show_transfers,
            LayerToggle::Stations => &mut s.show_stations,
            LayerToggle::Labels => &mut s.show_labels,
        };
        if *flag == visible {
            return false;
        }
        *flag = visible;
        self.state.persist_settings();
        self.scene.apply_visibility(&self.state.settings);
        if toggle == LayerToggle::Labels {
            let ctx = self.state.ctx();
            self.scene.rebuild_stations(&ctx);
        }
        true
    }

    pub fn set_background(&mut self, background: Background) -> bool {
        if background == self.state.settings.background {
            return false;
        }
        self.state.settings.background = background;
        self.state.persist_settings();
        self.load_background();
        let ctx = self.state.ctx();
        self.scene.rebuild_background(&ctx);
        true
    }

    /// Host-side loading of a non-`data:` background finished. A failure
    /// hides the background layer; the document is left alone.
    pub fn set_background_loaded(&mut self, ok: bool) {
        if !ok {
            log::warn!(
                "background {} failed to load; layer hidden",
                self.state.settings.background.url
            );
        }
        self.state.background_available = ok && self.state.settings.background.is_visible();
        let ctx = self.state.ctx();
        self.scene.rebuild_background(&ctx);
    }

    fn load_background(&mut self) {
        let url = self.state.settings.background.url.clone();
        self.background = None;
        if url.is_empty() {
            self.state.background_available = false;
            return;
        }
        if !is_data_url(&url) {
            // resolved by the host through `set_background_loaded`
            self.state.background_available = true;
            return;
        }
        match decode_data_url(&url) {
            Ok(img) => {
                self.background = Some(img);
                self.state.background_available = true;
            }
            Err(e) => {
                log::warn!("background decode failed: {e}; layer hidden");
                self.state.background_available = false;
            }
        }
    }

    // ─── Output ──────────────────────────────────────────────────────────

    pub fn export(&self) -> Result<String, MapError> {
        let opts = ExportOptions {
            auto_neighbors: self.state.config.auto_neighbors_on_save,
            default_time: self.state.config.default_neighbor_time,
        };
        export_document(self.document(), &opts)
    }

    pub fn export_file_name(&self) -> String {
        export_file_name(self.document())
    }

    pub fn lint(&self) -> Vec<LintDiagnostic> {
        lint_document(self.document())
    }

    /// Hand the document to the sink now instead of waiting for the quiet
    /// period.
    pub fn flush(&mut self) -> bool {
        self.state.engine.flush_now()
    }

    /// End the session: drop pending work, transient gesture state and the
    /// retained scene.
    pub fn teardown(&mut self) {
        self.reset_transient();
        self.state.engine.cancel_pending();
        self.state.selection = Selection::None;
        self.background = None;
        self.scene.clear();
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn end_gesture(&mut self) -> bool {
        match self.mode {
            Mode::DraggingStation { .. } => self.scene.clear_drag(),
            Mode::DraggingControlPoint { .. } => {
                self.state.engine.end_batch();
            }
            Mode::Panning { .. } => {}
            Mode::Idle | Mode::AddingRiver => return false,
        }
        self.mode = Mode::Idle;
        true
    }

    fn reset_transient(&mut self) {
        if let Mode::DraggingControlPoint { .. } = self.mode {
            self.state.engine.end_batch();
        }
        self.mode = Mode::Idle;
        self.state.river_points.clear();
        self.scene.clear_drag();
    }

    fn after_document_change(&mut self) {
        if !selection_exists(self.section(), &self.state.selection) {
            self.state.selection = Selection::None;
        }
        self.rebuild_all();
    }

    fn rebuild_all(&mut self) {
        let ctx = self.state.ctx();
        self.scene.rebuild_all(&ctx);
    }

    /// Layers whose look depends on the selection.
    fn rebuild_selection(&mut self) {
        let ctx = self.state.ctx();
        self.scene.rebuild_lines(&ctx);
        self.scene.rebuild_transfers(&ctx);
        self.scene.rebuild_stations(&ctx);
        self.scene.rebuild_neighbors(&ctx);
        self.scene.rebuild_controls(&ctx);
    }
}

fn selection_exists(section: Option<&MapSection>, selection: &Selection) -> bool {
    let Some(s) = section else {
        return selection.is_none();
    };
    match *selection {
        Selection::None => true,
        Selection::Line(l) => s.line(l).is_some(),
        Selection::Station { line, station } => s.line(line).is_some_and(|l| l.contains(station)),
        Selection::Transfer(t) => s.transfer(t).is_some(),
        Selection::Segment(seg) | Selection::ControlPoint { segment: seg, .. } => {
            s.line(seg.line).is_some_and(|l| {
                l.segments()
                    .into_iter()
                    .any(|(a, b)| seg.matches(l.id, a, b))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullSink;
    use metro_core::{Id, load_document};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn editor() -> Editor<NullSink> {
        let mut e = Editor::new(EditorConfig::default(), NullSink);
        e.load(load_document(json!({
            "info": { "name": "t", "editorSettings": { "canvasView": { "scale": 1, "posX": 0, "posY": 0 } } },
            "metro_map": { "lines": [{ "id": "L", "stations": [
                { "id": "A", "x": 100, "y": 100 },
                { "id": "B", "x": 300, "y": 100 }
            ]}]}
        })));
        e
    }

    #[test]
    fn snap_rounds_to_nearest_multiple() {
        assert_eq!(snap_point(Point::new(150.0, 120.0), 7.0), Point::new(147.0, 119.0));
        assert_eq!(snap_point(Point::new(14.0, 16.0), 10.0), Point::new(10.0, 20.0));
    }

    #[test]
    fn empty_canvas_press_pans_and_clears_selection() {
        let mut e = editor();
        e.select(Selection::Line(Id::intern("L")));
        assert!(e.handle(EditorEvent::PointerDown { x: 500.0, y: 500.0 }));
        assert_eq!(e.selection(), Selection::None);
        e.handle(EditorEvent::PointerMove { x: 520.0, y: 490.0 });
        assert_eq!(e.camera().pan, Vec2::new(20.0, -10.0));
        e.handle(EditorEvent::PointerUp { x: 520.0, y: 490.0 });
        assert_eq!(e.mode(), Mode::Idle);
        assert_eq!(e.history_len(), 0);
    }

    #[test]
    fn stale_selection_is_dropped() {
        let mut e = editor();
        assert!(!e.select(Selection::Transfer(Id::intern("nope"))));
        assert_eq!(e.selection(), Selection::None);
        e.select(Selection::Station {
            line: Id::intern("L"),
            station: Id::intern("B"),
        });
        e.apply(MapMutation::RemoveStation(Id::intern("B")));
        assert_eq!(e.selection(), Selection::None);
    }

    #[test]
    fn river_needs_two_points() {
        let mut e = editor();
        e.handle(EditorEvent::key("r"));
        assert_eq!(e.mode(), Mode::AddingRiver);
        e.handle(EditorEvent::PointerMove { x: 10.0, y: 10.0 });
        e.handle(EditorEvent::ToggleRiver);
        assert_eq!(e.mode(), Mode::Idle);
        assert!(e.section().unwrap().rivers.is_empty());
        assert!(e.river_points().is_empty());
    }

    #[test]
    fn wheel_is_ignored_mid_drag() {
        let mut e = editor();
        e.handle(EditorEvent::PointerDown { x: 100.0, y: 100.0 });
        assert!(matches!(e.mode(), Mode::DraggingStation { .. }));
        assert!(!e.handle(EditorEvent::Wheel {
            x: 0.0,
            y: 0.0,
            delta_y: -100.0
        }));
        assert_eq!(e.camera().zoom, 1.0);
    }

    #[test]
    fn undo_mid_drag_drops_the_drag_and_undoes() {
        let mut e = editor();
        let (a, b) = (Id::intern("A"), Id::intern("B"));
        assert!(e.apply(MapMutation::MoveStation {
            station: b,
            to: MapPoint::new(300.0, 200.0),
        }));
        e.handle(EditorEvent::PointerDown { x: 100.0, y: 100.0 });
        e.handle(EditorEvent::PointerMove { x: 150.0, y: 160.0 });
        e.handle(EditorEvent::Frame { now_ms: 16.0 });
        assert!(e.scene().drag_position().is_some());

        assert!(e.handle(EditorEvent::ctrl_key("z")));
        assert!(matches!(e.mode(), Mode::Idle));
        assert_eq!(e.history_len(), 0);
        assert!(e.scene().drag_position().is_none());
        let section = e.section().unwrap();
        assert_eq!(section.station(a).unwrap().position(), MapPoint::new(100.0, 100.0));
        assert_eq!(section.station(b).unwrap().position(), MapPoint::new(300.0, 100.0));

        // the release after the shortcut must not commit the dropped drag
        assert!(!e.handle(EditorEvent::PointerUp { x: 150.0, y: 160.0 }));
        assert_eq!(e.history_len(), 0);
    }

    #[test]
    fn undo_mid_pan_stops_panning() {
        let mut e = editor();
        assert!(e.add_curve(Id::intern("A"), Id::intern("B")));
        e.handle(EditorEvent::PointerDown { x: 700.0, y: 500.0 });
        assert!(matches!(e.mode(), Mode::Panning { .. }));
        assert!(e.handle(EditorEvent::ctrl_key("z")));
        assert!(matches!(e.mode(), Mode::Idle));
        assert!(e.section().unwrap().intermediate_points.is_empty());
    }

    #[test]
    fn set_zoom_clamps_and_keeps_centre() {
        let mut e = editor();
        let centre = Point::new(500.0, 350.0);
        let world = e.camera().to_world(centre);
        assert!(e.set_zoom(40.0));
        assert_eq!(e.camera().zoom, 5.0);
        let back = e.camera().to_screen(world);
        assert!((back.x - centre.x).abs() < 1e-9 && (back.y - centre.y).abs() < 1e-9);
        assert!(!e.set_zoom(5.0));
        assert!(!e.set_zoom(f64::NAN));
    }
}
