//! Core data model for transit-map documents.
//!
//! A document holds one section per transport mode (metro, suburban rail,
//! river tram, tram). Each section is a list of lines (ordered station
//! sequences) plus the walking transfers, Bezier control points for curved
//! segments and decorative rivers drawn on top of them.
//!
//! Station coordinates are *logical*: they are stored unscaled and the
//! renderer multiplies them by the editor's `coordinateScale`.
//!
//! Every struct keeps unknown JSON keys in `extra` so that documents
//! produced by other tools survive a load → edit → export cycle.

use crate::id::{Id, LineId, StationId, TransferId};
use crate::settings::EditorSettings;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Default line colour when a line carries none.
pub const DEFAULT_LINE_COLOR: &str = "#cccccc";

// ─── Numbers ─────────────────────────────────────────────────────────────

/// Serialize whole numbers as JSON integers (`5`, not `5.0`).
pub(crate) fn serialize_number<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < MAX_SAFE {
        s.serialize_i64(*v as i64)
    } else {
        s.serialize_f64(*v)
    }
}

/// Newtype so tuple elements can reuse [`serialize_number`].
struct Num(f64);

impl Serialize for Num {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        serialize_number(&self.0, s)
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// A point in logical (unscaled) map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    #[serde(default, serialize_with = "serialize_number")]
    pub x: f64,
    #[serde(default, serialize_with = "serialize_number")]
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ─── Station ─────────────────────────────────────────────────────────────

/// Clock-position of a station label around its marker.
///
/// `0` is north and the values walk clockwise to `7` (north-west), `8`
/// centres the label on the marker and `9` hides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextPosition(pub u8);

impl TextPosition {
    pub const HIDDEN: TextPosition = TextPosition(9);

    pub fn is_hidden(self) -> bool {
        self.0 >= Self::HIDDEN.0
    }

    /// Label offset from the marker centre for a given padding, or `None`
    /// when the label is hidden.
    pub fn label_offset(self, pad: f64) -> Option<(f64, f64)> {
        let offset = match self.0 {
            0 => (0.0, -pad),
            1 => (pad, -pad),
            2 => (pad, 0.0),
            3 => (pad, pad),
            4 => (0.0, pad),
            5 => (-pad, pad),
            6 => (-pad, 0.0),
            7 => (-pad, -pad),
            8 => (0.0, 0.0),
            _ => return None,
        };
        Some(offset)
    }
}

/// A directed adjacency link with a travel time in seconds.
/// Serialized as a `[stationId, seconds]` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: StationId,
    pub time: f64,
}

impl Neighbor {
    pub fn new(id: StationId, time: f64) -> Self {
        Self { id, time }
    }
}

impl Serialize for Neighbor {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut tup = s.serialize_tuple(2)?;
        tup.serialize_element(&self.id)?;
        tup.serialize_element(&Num(self.time))?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for Neighbor {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let (id, time) = <(Id, Option<f64>)>::deserialize(d)?;
        Ok(Neighbor {
            id,
            time: time.unwrap_or(0.0),
        })
    }
}

pub type NeighborList = SmallVec<[Neighbor; 2]>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Station {
    #[serde(default)]
    pub id: StationId,
    #[serde(default)]
    pub name: String,
    #[serde(default, serialize_with = "serialize_number")]
    pub x: f64,
    #[serde(default, serialize_with = "serialize_number")]
    pub y: f64,
    #[serde(
        rename = "textPosition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub text_position: Option<TextPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbors: Option<NeighborList>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Station {
    pub fn new(id: StationId, name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id,
            name: name.into(),
            x,
            y,
            text_position: Some(TextPosition::default()),
            neighbors: Some(NeighborList::new()),
            extra: Map::new(),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Neighbor links; empty when the station has no `neighbors` array.
    pub fn neighbors(&self) -> &[Neighbor] {
        self.neighbors.as_deref().unwrap_or(&[])
    }

    /// Mutable neighbor list, created on first use.
    pub fn neighbors_mut(&mut self) -> &mut NeighborList {
        self.neighbors.get_or_insert_with(NeighborList::new)
    }

    pub fn has_neighbor(&self, id: StationId) -> bool {
        self.neighbors().iter().any(|n| n.id == id)
    }

    pub fn label_hidden(&self) -> bool {
        self.text_position.is_some_and(TextPosition::is_hidden)
    }
}

// ─── Line ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub id: LineId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub stations: Vec<Station>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Line {
    pub fn new(id: LineId, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            stations: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn station_mut(&mut self, id: StationId) -> Option<&mut Station> {
        self.stations.iter_mut().find(|s| s.id == id)
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.stations.iter().any(|s| s.id == id)
    }

    /// Colour string, falling back to [`DEFAULT_LINE_COLOR`].
    pub fn color_or_default(&self) -> &str {
        if self.color.is_empty() {
            DEFAULT_LINE_COLOR
        } else {
            &self.color
        }
    }

    /// A circular line: at least three stations and the first and last
    /// stations list each other as neighbors.
    pub fn is_ring(&self) -> bool {
        match (self.stations.first(), self.stations.last()) {
            (Some(first), Some(last)) if self.stations.len() > 2 => {
                first.has_neighbor(last.id) && last.has_neighbor(first.id)
            }
            _ => false,
        }
    }

    /// Rendered station pairs in drawing order: consecutive pairs, then the
    /// closing `(last, first)` pair for rings.
    pub fn segments(&self) -> Vec<(StationId, StationId)> {
        let mut out: Vec<_> = self
            .stations
            .windows(2)
            .map(|w| (w[0].id, w[1].id))
            .collect();
        if self.is_ring()
            && let (Some(first), Some(last)) = (self.stations.first(), self.stations.last())
        {
            out.push((last.id, first.id));
        }
        out
    }
}

// ─── Transfer ────────────────────────────────────────────────────────────

/// Kind of walking transfer. Unknown kinds (e.g. `TR_6`) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransferKind {
    #[default]
    Default,
    CrossPlatform,
    Ground,
    Custom(String),
}

impl From<String> for TransferKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "default" => Self::Default,
            "crossplatform" => Self::CrossPlatform,
            "ground" => Self::Ground,
            _ => Self::Custom(s),
        }
    }
}

impl From<TransferKind> for String {
    fn from(k: TransferKind) -> Self {
        match k {
            TransferKind::Default => "default".into(),
            TransferKind::CrossPlatform => "crossplatform".into(),
            TransferKind::Ground => "ground".into(),
            TransferKind::Custom(s) => s,
        }
    }
}

/// A walking link among two or more stations, possibly on different lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transfer {
    #[serde(default)]
    pub id: TransferId,
    #[serde(default)]
    pub stations: Vec<StationId>,
    #[serde(default, serialize_with = "serialize_number")]
    pub time: f64,
    #[serde(rename = "type", default)]
    pub kind: TransferKind,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transfer {
    pub fn new(id: TransferId, stations: Vec<StationId>, time: f64, kind: TransferKind) -> Self {
        Self {
            id,
            stations,
            time,
            kind,
            extra: Map::new(),
        }
    }

    /// Every unordered pair of member stations: N·(N−1)/2 links.
    pub fn links(&self) -> Vec<(StationId, StationId)> {
        let mut out = Vec::new();
        for (i, a) in self.stations.iter().enumerate() {
            for b in &self.stations[i + 1..] {
                out.push((*a, *b));
            }
        }
        out
    }

    pub fn involves(&self, station: StationId) -> bool {
        self.stations.contains(&station)
    }
}

// ─── Curves & rivers ─────────────────────────────────────────────────────

/// Chord fractions of the handles on a segment that has no curve entry yet.
pub const DEFAULT_HANDLE_FRACTIONS: [f64; 2] = [1.0 / 3.0, 2.0 / 3.0];

/// The two cubic-Bezier control points bending the segment between a
/// station pair. The pair is undirected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveEntry {
    #[serde(rename = "neighborsId")]
    pub neighbors_id: [StationId; 2],
    #[serde(default)]
    pub points: Vec<Point>,
}

impl CurveEntry {
    pub fn new(a: StationId, b: StationId, c1: Point, c2: Point) -> Self {
        Self {
            neighbors_id: [a, b],
            points: vec![c1, c2],
        }
    }

    /// Entry with both handles on the chord from `pa` to `pb`, at
    /// [`DEFAULT_HANDLE_FRACTIONS`].
    pub fn on_chord(a: StationId, pa: Point, b: StationId, pb: Point) -> Self {
        let [t1, t2] = DEFAULT_HANDLE_FRACTIONS;
        Self::new(a, b, pa.lerp(pb, t1), pa.lerp(pb, t2))
    }

    /// Order-independent pair match.
    pub fn connects(&self, a: StationId, b: StationId) -> bool {
        let [x, y] = self.neighbors_id;
        (x == a && y == b) || (x == b && y == a)
    }

    pub fn involves(&self, station: StationId) -> bool {
        self.neighbors_id.contains(&station)
    }

    /// Control points as `(c1, c2)` oriented for drawing from `from`.
    /// Entries without exactly two points are treated as straight.
    pub fn controls_from(&self, from: StationId) -> Option<(Point, Point)> {
        match self.points.as_slice() {
            [c1, c2] if self.neighbors_id[0] == from => Some((*c1, *c2)),
            [c1, c2] => Some((*c2, *c1)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct River {
    #[serde(default)]
    pub id: Id,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ─── Sections ────────────────────────────────────────────────────────────

/// Transport mode of a section, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SectionKind {
    #[default]
    Metro,
    Suburban,
    RiverTram,
    Tram,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Metro,
        SectionKind::Suburban,
        SectionKind::RiverTram,
        SectionKind::Tram,
    ];

    /// JSON key of the section in the document.
    pub fn key(self) -> &'static str {
        match self {
            Self::Metro => "metro_map",
            Self::Suburban => "suburban_map",
            Self::RiverTram => "rivertram_map",
            Self::Tram => "tram_map",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

/// One transport mode's sub-map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapSection {
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<Transfer>,
    #[serde(
        rename = "intermediatePoints",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub intermediate_points: Vec<CurveEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rivers: Vec<River>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapSection {
    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn line_mut(&mut self, id: LineId) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.id == id)
    }

    /// Find a station and the first line that carries it.
    pub fn station_with_line(&self, id: StationId) -> Option<(&Line, &Station)> {
        self.lines
            .iter()
            .find_map(|l| l.station(id).map(|s| (l, s)))
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.station_with_line(id).map(|(_, s)| s)
    }

    /// Every station on every line, in line order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.lines.iter().flat_map(|l| l.stations.iter())
    }

    pub fn station_count(&self) -> usize {
        self.lines.iter().map(|l| l.stations.len()).sum()
    }

    pub fn transfer(&self, id: TransferId) -> Option<&Transfer> {
        self.transfers.iter().find(|t| t.id == id)
    }

    /// Order-independent curve lookup: `curve(a, b) == curve(b, a)`.
    pub fn curve(&self, a: StationId, b: StationId) -> Option<&CurveEntry> {
        self.intermediate_points.iter().find(|c| c.connects(a, b))
    }

    pub fn curve_mut(&mut self, a: StationId, b: StationId) -> Option<&mut CurveEntry> {
        self.intermediate_points
            .iter_mut()
            .find(|c| c.connects(a, b))
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// Document metadata. `editorSettings` carries persisted view settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "editorSettings",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub editor_settings: Option<EditorSettings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole transit-map project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapDocument {
    #[serde(default)]
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro_map: Option<MapSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburban_map: Option<MapSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rivertram_map: Option<MapSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tram_map: Option<MapSection>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapDocument {
    /// The canonical empty project:
    /// `{ info: { name: "New Map" }, metro_map: { lines: [] } }`.
    pub fn skeleton() -> Self {
        Self {
            info: Info {
                name: Some("New Map".into()),
                ..Info::default()
            },
            metro_map: Some(MapSection::default()),
            ..Self::default()
        }
    }

    fn slot(&self, kind: SectionKind) -> &Option<MapSection> {
        match kind {
            SectionKind::Metro => &self.metro_map,
            SectionKind::Suburban => &self.suburban_map,
            SectionKind::RiverTram => &self.rivertram_map,
            SectionKind::Tram => &self.tram_map,
        }
    }

    fn slot_mut(&mut self, kind: SectionKind) -> &mut Option<MapSection> {
        match kind {
            SectionKind::Metro => &mut self.metro_map,
            SectionKind::Suburban => &mut self.suburban_map,
            SectionKind::RiverTram => &mut self.rivertram_map,
            SectionKind::Tram => &mut self.tram_map,
        }
    }

    pub fn section(&self, kind: SectionKind) -> Option<&MapSection> {
        self.slot(kind).as_ref()
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> Option<&mut MapSection> {
        self.slot_mut(kind).as_mut()
    }

    /// The section, created empty if the document does not have it yet.
    pub fn section_entry(&mut self, kind: SectionKind) -> &mut MapSection {
        self.slot_mut(kind).get_or_insert_with(MapSection::default)
    }

    /// Present sections in document order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionKind, &MapSection)> {
        SectionKind::ALL
            .into_iter()
            .filter_map(|k| self.section(k).map(|s| (k, s)))
    }

    pub fn sections_mut(&mut self) -> impl Iterator<Item = &mut MapSection> {
        [
            &mut self.metro_map,
            &mut self.suburban_map,
            &mut self.rivertram_map,
            &mut self.tram_map,
        ]
        .into_iter()
        .filter_map(Option::as_mut)
    }

    pub fn station_count(&self) -> usize {
        self.sections().map(|(_, s)| s.station_count()).sum()
    }

    pub fn settings(&self) -> EditorSettings {
        self.info.editor_settings.clone().unwrap_or_default()
    }
}
