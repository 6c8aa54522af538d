//! Retained, layered map scene.
//!
//! The scene turns the active [`MapSection`] into keyed items of paint
//! primitives grouped into fixed layers. Layers can be rebuilt one at a
//! time, and [`MapScene::rebuild_for_station`] touches only what a single
//! dragged station affects. Painters (Vello, Canvas2D) walk the result.
//!
//! All geometry is in *scene units*: logical coordinates multiplied by the
//! coordinate scale. The camera is applied by the painters.

use crate::camera::valid_coordinate_scale;
use crate::color::Rgba;
use kurbo::{BezPath, CubicBez, Line as Chord, Point, Rect};
use metro_core::{
    DEFAULT_HANDLE_FRACTIONS, EditorSettings, Id, Line, LineId, MapSection, Point as MapPoint,
    SegmentRef, Selection, StationId, TextPosition,
};

// ─── Style ───────────────────────────────────────────────────────────────

pub const LINE_WIDTH: f64 = 6.0;
pub const DEFAULT_LINE_COLOR: Rgba = Rgba::rgb8(0xcc, 0xcc, 0xcc);
pub const SELECTED_SEGMENT_WIDTH: f64 = 10.0;
pub const SELECTED_SEGMENT_COLOR: Rgba = Rgba::rgb8(0xff, 0xcc, 0x00);
pub const TRANSFER_WIDTH: f64 = 2.0;
pub const TRANSFER_COLOR: Rgba = Rgba::rgb8(0x88, 0x88, 0x88);
pub const SELECTED_TRANSFER_WIDTH: f64 = 5.0;
pub const HIGHLIGHT_COLOR: Rgba = Rgba::rgb8(0xff, 0xd4, 0x00);
pub const STATION_RADIUS: f64 = 5.0;
pub const STATION_COLOR: Rgba = Rgba::rgb8(0x11, 0x11, 0x11);
pub const SELECTED_STATION_COLOR: Rgba = Rgba::rgb8(0x00, 0xe0, 0xff);
pub const NEIGHBOR_COLOR: Rgba = Rgba::rgb8(0xff, 0xaa, 0x00);
pub const LABEL_SIZE: f64 = 12.0;
pub const LABEL_PAD: f64 = 12.0;
pub const LABEL_COLOR: Rgba = Rgba::rgb8(0x11, 0x11, 0x11);
pub const NEIGHBOR_DASH: [f64; 2] = [5.0, 5.0];
pub const NEIGHBOR_WIDTH: f64 = 2.0;
pub const NEIGHBOR_ALPHA: f32 = 0.6;
pub const CONTROL_RADIUS: f64 = 6.0;
pub const RIVER_WIDTH: f64 = 6.0;
pub const RIVER_COLOR: Rgba = Rgba::rgb8(0x5d, 0xad, 0xe2);
pub const RIVER_ALPHA: f32 = 0.7;
pub const RIVER_PREVIEW_ALPHA: f32 = 0.5;
pub const GRID_COLOR: Rgba = Rgba::rgb8(0xe5, 0xe7, 0xeb);
pub const GRID_WIDTH: f64 = 1.0;
/// Grid is skipped when more lines than this would be needed per axis.
const MAX_GRID_LINES: f64 = 1000.0;

// ─── Scene types ─────────────────────────────────────────────────────────

/// Paint layers, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Background,
    Grid,
    Rivers,
    Lines,
    Transfers,
    Stations,
    Neighbors,
    Controls,
}

impl Layer {
    pub const ALL: [Layer; 8] = [
        Layer::Background,
        Layer::Grid,
        Layer::Rivers,
        Layer::Lines,
        Layer::Transfers,
        Layer::Stations,
        Layer::Neighbors,
        Layer::Controls,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Identity of a scene item within its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Background,
    Grid,
    River(Id),
    RiverPreview,
    Line(LineId),
    SelectedSegment,
    Transfer(Id),
    Station { line: LineId, station: StationId },
    Neighbors,
    Controls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Stroke {
        path: BezPath,
        width: f64,
        color: Rgba,
        dash: Option<[f64; 2]>,
    },
    Disc {
        center: Point,
        radius: f64,
        color: Rgba,
    },
    /// Text centred vertically on `at`; painted with a white halo.
    Label {
        text: String,
        at: Point,
        size: f64,
        color: Rgba,
        align: TextAlign,
    },
    /// The background image stretched over `rect`.
    Image { rect: Rect, alpha: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    pub key: ItemKey,
    pub primitives: Vec<Primitive>,
    /// Bumped every time the item is rebuilt.
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerContent {
    pub visible: bool,
    pub items: Vec<SceneItem>,
}

impl Default for LayerContent {
    fn default() -> Self {
        Self {
            visible: true,
            items: Vec::new(),
        }
    }
}

/// Geometry of one station-to-station segment in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentGeometry {
    Straight(Chord),
    Curved(CubicBez),
}

impl SegmentGeometry {
    pub fn start(&self) -> Point {
        match self {
            Self::Straight(l) => l.p0,
            Self::Curved(c) => c.p0,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Self::Straight(l) => l.p1,
            Self::Curved(c) => c.p3,
        }
    }

    fn append_to(&self, path: &mut BezPath) {
        match self {
            Self::Straight(l) => path.line_to(l.p1),
            Self::Curved(c) => path.curve_to(c.p1, c.p2, c.p3),
        }
    }
}

/// Everything a rebuild reads besides the scene itself.
#[derive(Debug, Clone, Copy)]
pub struct SceneContext<'a> {
    pub section: Option<&'a MapSection>,
    pub selection: Selection,
    pub settings: &'a EditorSettings,
    /// Scene rectangle currently on screen, for the grid.
    pub visible_world: Rect,
    /// Logical points of a river being drawn.
    pub river_preview: &'a [MapPoint],
    /// False when the background image could not be loaded.
    pub background_available: bool,
}

// ─── Scene ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MapScene {
    layers: [LayerContent; 8],
    coordinate_scale: f64,
    drag: Option<(StationId, Point)>,
    revision: u64,
}

impl Default for MapScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MapScene {
    pub fn new() -> Self {
        Self {
            layers: Default::default(),
            coordinate_scale: 1.0,
            drag: None,
            revision: 0,
        }
    }

    pub fn layer(&self, layer: Layer) -> &LayerContent {
        &self.layers[layer.index()]
    }

    pub fn item(&self, layer: Layer, key: ItemKey) -> Option<&SceneItem> {
        self.layer(layer).items.iter().find(|i| i.key == key)
    }

    pub fn set_layer_visible(&mut self, layer: Layer, visible: bool) {
        self.layers[layer.index()].visible = visible;
    }

    /// Sync layer flags with persisted settings.
    pub fn apply_visibility(&mut self, settings: &EditorSettings) {
        self.set_layer_visible(Layer::Grid, settings.show_grid);
        self.set_layer_visible(Layer::Lines, settings.show_lines);
        self.set_layer_visible(Layer::Transfers, settings.show_transfers);
        self.set_layer_visible(Layer::Stations, settings.show_stations);
    }

    /// Drop every item and the drag override.
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.items.clear();
        }
        self.drag = None;
    }

    // ─── Coordinates ─────────────────────────────────────────────────────

    pub fn coordinate_scale(&self) -> f64 {
        self.coordinate_scale
    }

    /// Change the logical → scene multiplier and rebuild every layer.
    /// Values outside `(0, 5]` or equal to the current one are ignored.
    pub fn set_coordinate_scale(&mut self, scale: f64, ctx: &SceneContext<'_>) -> bool {
        if !valid_coordinate_scale(scale) || scale == self.coordinate_scale {
            return false;
        }
        log::debug!("coordinate scale {} -> {scale}", self.coordinate_scale);
        self.coordinate_scale = scale;
        self.rebuild_all(ctx);
        true
    }

    pub fn to_scene(&self, p: MapPoint) -> Point {
        Point::new(p.x * self.coordinate_scale, p.y * self.coordinate_scale)
    }

    pub fn to_logical(&self, p: Point) -> MapPoint {
        MapPoint::new(p.x / self.coordinate_scale, p.y / self.coordinate_scale)
    }

    /// Render-only position of a station being dragged.
    pub fn set_drag_position(&mut self, station: StationId, at: Point) {
        self.drag = Some((station, at));
    }

    pub fn clear_drag(&mut self) {
        self.drag = None;
    }

    pub fn drag_position(&self) -> Option<(StationId, Point)> {
        self.drag
    }

    /// Scene position of a station, honouring the drag override.
    pub fn station_position(&self, section: &MapSection, id: StationId) -> Option<Point> {
        if let Some((dragged, at)) = self.drag
            && dragged == id
        {
            return Some(at);
        }
        section.station(id).map(|s| self.to_scene(s.position()))
    }

    /// Straight or curved geometry between two stations; `None` when either
    /// station is missing.
    pub fn segment_geometry(
        &self,
        section: &MapSection,
        a: StationId,
        b: StationId,
    ) -> Option<SegmentGeometry> {
        let p0 = self.station_position(section, a)?;
        let p3 = self.station_position(section, b)?;
        let geom = match section.curve(a, b).and_then(|c| c.controls_from(a)) {
            Some((c1, c2)) => {
                SegmentGeometry::Curved(CubicBez::new(p0, self.to_scene(c1), self.to_scene(c2), p3))
            }
            None => SegmentGeometry::Straight(Chord::new(p0, p3)),
        };
        Some(geom)
    }

    /// Bezier handle positions of a segment: the curve's control points, or
    /// 1/3 and 2/3 along the chord when it is still straight.
    pub fn control_handles(&self, section: &MapSection, seg: &SegmentRef) -> Option<[Point; 2]> {
        match self.segment_geometry(section, seg.a, seg.b)? {
            SegmentGeometry::Curved(c) => Some([c.p1, c.p2]),
            SegmentGeometry::Straight(l) => {
                let [t1, t2] = DEFAULT_HANDLE_FRACTIONS;
                Some([l.p0.lerp(l.p1, t1), l.p0.lerp(l.p1, t2)])
            }
        }
    }

    // ─── Rebuilds ────────────────────────────────────────────────────────

    pub fn rebuild_all(&mut self, ctx: &SceneContext<'_>) {
        self.apply_visibility(ctx.settings);
        self.rebuild_background(ctx);
        self.rebuild_grid(ctx);
        self.rebuild_rivers(ctx);
        self.rebuild_lines(ctx);
        self.rebuild_transfers(ctx);
        self.rebuild_stations(ctx);
        self.rebuild_neighbors(ctx);
        self.rebuild_controls(ctx);
    }

    pub fn rebuild_background(&mut self, ctx: &SceneContext<'_>) {
        self.clear_layer(Layer::Background);
        let bg = &ctx.settings.background;
        if !bg.is_visible() || !ctx.background_available {
            return;
        }
        let rect = Rect::new(bg.x, bg.y, bg.x + bg.w, bg.y + bg.h);
        let prim = Primitive::Image {
            rect,
            alpha: bg.clamped_alpha(),
        };
        self.put(Layer::Background, ItemKey::Background, vec![prim]);
    }

    pub fn rebuild_grid(&mut self, ctx: &SceneContext<'_>) {
        self.clear_layer(Layer::Grid);
        let step = ctx.settings.clamped_snap_step();
        let r = ctx.visible_world;
        if r.width() / step > MAX_GRID_LINES || r.height() / step > MAX_GRID_LINES {
            log::trace!("grid skipped: step {step} too dense for {r:?}");
            return;
        }
        let mut path = BezPath::new();
        let mut x = (r.x0 / step).floor() * step;
        while x <= r.x1 {
            path.move_to((x, r.y0));
            path.line_to((x, r.y1));
            x += step;
        }
        let mut y = (r.y0 / step).floor() * step;
        while y <= r.y1 {
            path.move_to((r.x0, y));
            path.line_to((r.x1, y));
            y += step;
        }
        let prim = Primitive::Stroke {
            path,
            width: GRID_WIDTH,
            color: GRID_COLOR,
            dash: None,
        };
        self.put(Layer::Grid, ItemKey::Grid, vec![prim]);
    }

    pub fn rebuild_rivers(&mut self, ctx: &SceneContext<'_>) {
        self.clear_layer(Layer::Rivers);
        if let Some(section) = ctx.section {
            for river in &section.rivers {
                if let Some(prim) = self.polyline(&river.points, RIVER_COLOR.with_alpha(RIVER_ALPHA)) {
                    self.put(Layer::Rivers, ItemKey::River(river.id), vec![prim]);
                }
            }
        }
        if let Some(prim) = self.polyline(
            ctx.river_preview,
            RIVER_COLOR.with_alpha(RIVER_PREVIEW_ALPHA),
        ) {
            self.put(Layer::Rivers, ItemKey::RiverPreview, vec![prim]);
        }
    }

    pub fn rebuild_lines(&mut self, ctx: &SceneContext<'_>) {
        self.clear_layer(Layer::Lines);
        let Some(section) = ctx.section else { return };
        for line in &section.lines {
            let prims = self.build_line(section, line);
            self.put(Layer::Lines, ItemKey::Line(line.id), prims);
        }
        self.rebuild_selected_segment(ctx);
    }

    pub fn rebuild_transfers(&mut self, ctx: &SceneContext<'_>) {
        self.clear_layer(Layer::Transfers);
        let Some(section) = ctx.section else { return };
        let selected = ctx.selection.transfer();
        for t in &section.transfers {
            let (width, color) = if selected == Some(t.id) {
                (SELECTED_TRANSFER_WIDTH, HIGHLIGHT_COLOR)
            } else {
                (TRANSFER_WIDTH, TRANSFER_COLOR)
            };
            let mut path = BezPath::new();
            for (a, b) in t.links() {
                match (
                    self.station_position(section, a),
                    self.station_position(section, b),
                ) {
                    (Some(pa), Some(pb)) => {
                        path.move_to(pa);
                        path.line_to(pb);
                    }
                    _ => log::trace!("transfer {} skips dangling link {a}-{b}", t.id),
                }
            }
            let prim = Primitive::Stroke {
                path,
                width,
                color,
                dash: None,
            };
            self.put(Layer::Transfers, ItemKey::Transfer(t.id), vec![prim]);
        }
    }

    pub fn rebuild_stations(&mut self, ctx: &SceneContext<'_>) {
        self.clear_layer(Layer::Stations);
        let Some(section) = ctx.section else { return };
        for line in &section.lines {
            for station in &line.stations {
                self.put_station(ctx, section, line.id, station.id);
            }
        }
    }

    pub fn rebuild_neighbors(&mut self, ctx: &SceneContext<'_>) {
        self.clear_layer(Layer::Neighbors);
        let (Some(section), Some(selected)) = (ctx.section, ctx.selection.station()) else {
            return;
        };
        let (Some(station), Some(from)) = (
            section.station(selected),
            self.station_position(section, selected),
        ) else {
            return;
        };

        let color = NEIGHBOR_COLOR.with_alpha(NEIGHBOR_ALPHA);
        let mut prims = Vec::new();
        for n in station.neighbors() {
            let Some(to) = self.station_position(section, n.id) else {
                continue;
            };
            let mut path = BezPath::new();
            path.move_to(from);
            path.line_to(to);
            prims.push(Primitive::Stroke {
                path,
                width: NEIGHBOR_WIDTH,
                color,
                dash: Some(NEIGHBOR_DASH),
            });
            if n.time > 0.0 {
                prims.push(Primitive::Label {
                    text: format!("{}s", format_seconds(n.time)),
                    at: from.midpoint(to),
                    size: 10.0,
                    color: NEIGHBOR_COLOR,
                    align: TextAlign::Center,
                });
            }
        }
        self.put(Layer::Neighbors, ItemKey::Neighbors, prims);
    }

    pub fn rebuild_controls(&mut self, ctx: &SceneContext<'_>) {
        self.clear_layer(Layer::Controls);
        let (Some(section), Some(seg)) = (ctx.section, ctx.selection.segment()) else {
            return;
        };
        let Some(handles) = self.control_handles(section, &seg) else {
            return;
        };
        let prims = handles
            .iter()
            .map(|&center| Primitive::Disc {
                center,
                radius: CONTROL_RADIUS,
                color: HIGHLIGHT_COLOR,
            })
            .collect();
        self.put(Layer::Controls, ItemKey::Controls, prims);
    }

    /// Partial rebuild after `station` moved: its incident lines, all
    /// transfers, the neighbor overlay and its own markers.
    pub fn rebuild_for_station(&mut self, ctx: &SceneContext<'_>, station: StationId) {
        let Some(section) = ctx.section else { return };
        for line in section.lines.iter().filter(|l| l.contains(station)) {
            let prims = self.build_line(section, line);
            self.put(Layer::Lines, ItemKey::Line(line.id), prims);
            self.put_station(ctx, section, line.id, station);
        }
        if ctx.selection.segment().is_some_and(|s| s.involves(station)) {
            self.rebuild_selected_segment(ctx);
            self.rebuild_controls(ctx);
        }
        self.rebuild_transfers(ctx);
        self.rebuild_neighbors(ctx);
    }

    // ─── Builders ────────────────────────────────────────────────────────

    fn build_line(&self, section: &MapSection, line: &Line) -> Vec<Primitive> {
        let color = Rgba::from_hex_or(line.color_or_default(), DEFAULT_LINE_COLOR);
        let mut path = BezPath::new();
        let mut cursor: Option<Point> = None;
        for (a, b) in line.segments() {
            let Some(geom) = self.segment_geometry(section, a, b) else {
                cursor = None;
                continue;
            };
            if cursor != Some(geom.start()) {
                path.move_to(geom.start());
            }
            geom.append_to(&mut path);
            cursor = Some(geom.end());
        }
        vec![Primitive::Stroke {
            path,
            width: LINE_WIDTH,
            color,
            dash: None,
        }]
    }

    fn rebuild_selected_segment(&mut self, ctx: &SceneContext<'_>) {
        self.remove(Layer::Lines, ItemKey::SelectedSegment);
        let (Some(section), Some(seg)) = (ctx.section, ctx.selection.segment()) else {
            return;
        };
        let Some(geom) = self.segment_geometry(section, seg.a, seg.b) else {
            return;
        };
        let mut path = BezPath::new();
        path.move_to(geom.start());
        geom.append_to(&mut path);
        let prim = Primitive::Stroke {
            path,
            width: SELECTED_SEGMENT_WIDTH,
            color: SELECTED_SEGMENT_COLOR,
            dash: None,
        };
        self.put(Layer::Lines, ItemKey::SelectedSegment, vec![prim]);
    }

    fn put_station(
        &mut self,
        ctx: &SceneContext<'_>,
        section: &MapSection,
        line: LineId,
        id: StationId,
    ) {
        let (Some(station), Some(center)) = (
            section.line(line).and_then(|l| l.station(id)),
            self.station_position(section, id),
        ) else {
            return;
        };

        let selected = ctx.selection.station();
        let is_neighbor = selected
            .and_then(|s| section.station(s))
            .is_some_and(|s| s.has_neighbor(id));
        let color = if selected == Some(id) {
            SELECTED_STATION_COLOR
        } else if is_neighbor {
            NEIGHBOR_COLOR
        } else {
            STATION_COLOR
        };

        let mut prims = vec![Primitive::Disc {
            center,
            radius: STATION_RADIUS,
            color,
        }];
        let position = station.text_position.unwrap_or_default();
        if ctx.settings.show_labels
            && !station.name.is_empty()
            && let Some(label) = label_for(&station.name, center, position)
        {
            prims.push(label);
        }
        self.put(Layer::Stations, ItemKey::Station { line, station: id }, prims);
    }

    fn polyline(&self, points: &[MapPoint], color: Rgba) -> Option<Primitive> {
        let (first, rest) = points.split_first()?;
        if rest.is_empty() {
            return None;
        }
        let mut path = BezPath::new();
        path.move_to(self.to_scene(*first));
        for p in rest {
            path.line_to(self.to_scene(*p));
        }
        Some(Primitive::Stroke {
            path,
            width: RIVER_WIDTH,
            color,
            dash: None,
        })
    }

    // ─── Item storage ────────────────────────────────────────────────────

    fn clear_layer(&mut self, layer: Layer) {
        self.layers[layer.index()].items.clear();
    }

    fn remove(&mut self, layer: Layer, key: ItemKey) {
        self.layers[layer.index()].items.retain(|i| i.key != key);
    }

    /// Replace the item with `key` in place, or append it.
    fn put(&mut self, layer: Layer, key: ItemKey, primitives: Vec<Primitive>) {
        self.revision += 1;
        let item = SceneItem {
            key,
            primitives,
            revision: self.revision,
        };
        let items = &mut self.layers[layer.index()].items;
        match items.iter_mut().find(|i| i.key == key) {
            Some(slot) => *slot = item,
            None => {
                // the selected-segment overlay stays on top of its layer
                let at = items
                    .iter()
                    .position(|i| i.key == ItemKey::SelectedSegment)
                    .unwrap_or(items.len());
                items.insert(at, item);
            }
        }
    }
}

fn label_for(text: &str, center: Point, position: TextPosition) -> Option<Primitive> {
    let (dx, dy) = position.label_offset(LABEL_PAD)?;
    let align = if dx > 0.0 {
        TextAlign::Start
    } else if dx < 0.0 {
        TextAlign::End
    } else {
        TextAlign::Center
    };
    Some(Primitive::Label {
        text: text.to_owned(),
        at: Point::new(center.x + dx, center.y + dy),
        size: LABEL_SIZE,
        color: LABEL_COLOR,
        align,
    })
}

fn format_seconds(t: f64) -> String {
    if t.fract() == 0.0 {
        format!("{}", t as i64)
    } else {
        format!("{t}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metro_core::{LoadOutcome, SectionKind, load_document};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn section() -> MapSection {
        let LoadOutcome { document, .. } = load_document(json!({ "metro_map": {
            "lines": [
                { "id": "L1", "color": "#ff0000", "stations": [
                    { "id": "A", "name": "Alpha", "x": 0, "y": 0, "textPosition": 2, "neighbors": [["B", 5]] },
                    { "id": "B", "name": "Beta", "x": 100, "y": 0, "neighbors": [["A", 5]] },
                    { "id": "C", "name": "Gamma", "x": 100, "y": 100, "textPosition": 9 }
                ]},
                { "id": "L2", "color": "bogus", "stations": [
                    { "id": "D", "name": "Delta", "x": 300, "y": 0 },
                    { "id": "E", "name": "Echo", "x": 400, "y": 0 }
                ]}
            ],
            "transfers": [{ "id": "T", "stations": ["B", "D", "ghost"], "time": 2 }],
            "intermediatePoints": [
                { "neighborsId": ["C", "B"], "points": [{ "x": 120, "y": 60 }, { "x": 130, "y": 30 }] }
            ]
        }}));
        document
            .section(SectionKind::Metro)
            .cloned()
            .unwrap_or_default()
    }

    fn ctx<'a>(section: &'a MapSection, settings: &'a EditorSettings, selection: Selection) -> SceneContext<'a> {
        SceneContext {
            section: Some(section),
            selection,
            settings,
            visible_world: Rect::new(0.0, 0.0, 100.0, 100.0),
            river_preview: &[],
            background_available: true,
        }
    }

    fn disc_center(scene: &MapScene, line: &str, station: &str) -> Point {
        let item = scene
            .item(
                Layer::Stations,
                ItemKey::Station {
                    line: Id::intern(line),
                    station: Id::intern(station),
                },
            )
            .unwrap();
        match &item.primitives[0] {
            Primitive::Disc { center, .. } => *center,
            other => panic!("expected disc, got {other:?}"),
        }
    }

    #[test]
    fn coordinate_scale_doubles_positions() {
        let s = section();
        let settings = EditorSettings::default();
        let c = ctx(&s, &settings, Selection::None);
        let mut scene = MapScene::new();
        scene.rebuild_all(&c);
        assert_eq!(disc_center(&scene, "L1", "B"), Point::new(100.0, 0.0));

        assert!(scene.set_coordinate_scale(2.0, &c));
        assert_eq!(disc_center(&scene, "L1", "B"), Point::new(200.0, 0.0));
        assert_eq!(disc_center(&scene, "L2", "E"), Point::new(800.0, 0.0));
        assert_eq!(s.station(Id::intern("B")).unwrap().x, 100.0);

        assert!(!scene.set_coordinate_scale(2.0, &c));
        assert!(!scene.set_coordinate_scale(0.0, &c));
        assert!(!scene.set_coordinate_scale(6.0, &c));
    }

    #[test]
    fn station_colours_follow_selection() {
        let s = section();
        let settings = EditorSettings::default();
        let sel = Selection::Station {
            line: Id::intern("L1"),
            station: Id::intern("A"),
        };
        let mut scene = MapScene::new();
        scene.rebuild_all(&ctx(&s, &settings, sel));
        let color = |line: &str, st: &str| {
            let item = scene
                .item(
                    Layer::Stations,
                    ItemKey::Station {
                        line: Id::intern(line),
                        station: Id::intern(st),
                    },
                )
                .unwrap();
            match &item.primitives[0] {
                Primitive::Disc { color, .. } => *color,
                _ => unreachable!(),
            }
        };
        assert_eq!(color("L1", "A"), SELECTED_STATION_COLOR);
        assert_eq!(color("L1", "B"), NEIGHBOR_COLOR);
        assert_eq!(color("L1", "C"), STATION_COLOR);

        let overlay = scene.item(Layer::Neighbors, ItemKey::Neighbors).unwrap();
        assert_eq!(overlay.primitives.len(), 2);
        assert!(matches!(
            &overlay.primitives[1],
            Primitive::Label { text, at, .. } if text == "5s" && *at == Point::new(50.0, 0.0)
        ));
    }

    #[test]
    fn labels_respect_position_and_visibility() {
        let s = section();
        let mut settings = EditorSettings::default();
        let mut scene = MapScene::new();
        scene.rebuild_all(&ctx(&s, &settings, Selection::None));
        let a = scene
            .item(
                Layer::Stations,
                ItemKey::Station {
                    line: Id::intern("L1"),
                    station: Id::intern("A"),
                },
            )
            .unwrap();
        assert!(matches!(
            &a.primitives[1],
            Primitive::Label { at, align: TextAlign::Start, .. } if *at == Point::new(12.0, 0.0)
        ));
        let c = scene
            .item(
                Layer::Stations,
                ItemKey::Station {
                    line: Id::intern("L1"),
                    station: Id::intern("C"),
                },
            )
            .unwrap();
        assert_eq!(c.primitives.len(), 1, "position 9 hides the label");

        settings.show_labels = false;
        scene.rebuild_stations(&ctx(&s, &settings, Selection::None));
        assert!(
            scene
                .layer(Layer::Stations)
                .items
                .iter()
                .all(|i| i.primitives.len() == 1)
        );
    }

    #[test]
    fn transfers_skip_dangling_members() {
        let s = section();
        let settings = EditorSettings::default();
        let mut scene = MapScene::new();
        scene.rebuild_all(&ctx(&s, &settings, Selection::Transfer(Id::intern("T"))));
        let t = scene
            .item(Layer::Transfers, ItemKey::Transfer(Id::intern("T")))
            .unwrap();
        match &t.primitives[0] {
            Primitive::Stroke { path, width, color, .. } => {
                assert_eq!(*width, SELECTED_TRANSFER_WIDTH);
                assert_eq!(*color, HIGHLIGHT_COLOR);
                // only B-D resolves: one move_to + one line_to
                assert_eq!(path.elements().len(), 2);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn segment_selection_adds_overlay_and_handles() {
        let s = section();
        let settings = EditorSettings::default();
        let seg = SegmentRef::new(Id::intern("L1"), Id::intern("A"), Id::intern("B"));
        let mut scene = MapScene::new();
        scene.rebuild_all(&ctx(&s, &settings, Selection::Segment(seg)));

        let lines = &scene.layer(Layer::Lines).items;
        assert_eq!(lines.last().map(|i| i.key), Some(ItemKey::SelectedSegment));
        let controls = scene.item(Layer::Controls, ItemKey::Controls).unwrap();
        assert!(matches!(
            controls.primitives[0],
            Primitive::Disc { center, radius, .. }
                if (center.x - 100.0 / 3.0).abs() < 1e-9 && radius == CONTROL_RADIUS
        ));

        // curved segment B-C, stored as (C, B): handles oriented from B
        let seg = SegmentRef::new(Id::intern("L1"), Id::intern("B"), Id::intern("C"));
        assert_eq!(
            scene.control_handles(&s, &seg),
            Some([Point::new(130.0, 30.0), Point::new(120.0, 60.0)])
        );
    }

    #[test]
    fn partial_rebuild_leaves_other_lines_alone() {
        let s = section();
        let settings = EditorSettings::default();
        let c = ctx(&s, &settings, Selection::None);
        let mut scene = MapScene::new();
        scene.rebuild_all(&c);
        let l2_before = scene
            .item(Layer::Lines, ItemKey::Line(Id::intern("L2")))
            .unwrap()
            .revision;
        let l1_before = scene
            .item(Layer::Lines, ItemKey::Line(Id::intern("L1")))
            .unwrap()
            .revision;

        scene.set_drag_position(Id::intern("A"), Point::new(-50.0, 10.0));
        scene.rebuild_for_station(&c, Id::intern("A"));

        let l2_after = scene
            .item(Layer::Lines, ItemKey::Line(Id::intern("L2")))
            .unwrap()
            .revision;
        let l1_after = scene
            .item(Layer::Lines, ItemKey::Line(Id::intern("L1")))
            .unwrap()
            .revision;
        assert_eq!(l2_before, l2_after);
        assert!(l1_after > l1_before);
        assert_eq!(disc_center(&scene, "L1", "A"), Point::new(-50.0, 10.0));
        assert_eq!(s.station(Id::intern("A")).unwrap().x, 0.0);
    }

    #[test]
    fn invalid_line_colour_falls_back() {
        let s = section();
        let settings = EditorSettings::default();
        let mut scene = MapScene::new();
        scene.rebuild_lines(&ctx(&s, &settings, Selection::None));
        let l2 = scene
            .item(Layer::Lines, ItemKey::Line(Id::intern("L2")))
            .unwrap();
        assert!(matches!(
            l2.primitives[0],
            Primitive::Stroke { color, width, .. } if color == DEFAULT_LINE_COLOR && width == LINE_WIDTH
        ));
    }

    #[test]
    fn background_hidden_without_url_or_on_failure() {
        let s = section();
        let mut settings = EditorSettings::default();
        let mut scene = MapScene::new();
        scene.rebuild_background(&ctx(&s, &settings, Selection::None));
        assert!(scene.layer(Layer::Background).items.is_empty());

        settings.background.url = "https://example.com/bg.png".into();
        settings.background.alpha = 2.0;
        scene.rebuild_background(&ctx(&s, &settings, Selection::None));
        let bg = scene.item(Layer::Background, ItemKey::Background).unwrap();
        assert!(matches!(bg.primitives[0], Primitive::Image { alpha, .. } if alpha == 1.0));

        let mut failed = ctx(&s, &settings, Selection::None);
        failed.background_available = false;
        scene.rebuild_background(&failed);
        assert!(scene.layer(Layer::Background).items.is_empty());
    }
}
