//! Hit testing: scene point → map entity.
//!
//! Tolerances are screen pixels; they are divided by the camera zoom so a
//! target is equally easy to grab at every zoom level. Targets are tried in
//! priority order: stations, transfer links, control handles, segments.

use crate::scene::{MapScene, SegmentGeometry};
use kurbo::{Line as Chord, ParamCurve, ParamCurveNearest, Point};
use metro_core::{LineId, MapSection, SegmentRef, Selection, StationId, TransferId};

pub const STATION_HIT_RADIUS: f64 = 10.0;
pub const TRANSFER_HIT_TOLERANCE: f64 = 8.0;
pub const CONTROL_HIT_RADIUS: f64 = 8.0;
pub const SEGMENT_HIT_TOLERANCE: f64 = 8.0;
pub const BEZIER_SAMPLES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Station { line: LineId, station: StationId },
    Transfer(TransferId),
    ControlPoint { segment: SegmentRef, index: usize },
    Segment(SegmentRef),
}

impl From<HitTarget> for Selection {
    fn from(hit: HitTarget) -> Self {
        match hit {
            HitTarget::Station { line, station } => Selection::Station { line, station },
            HitTarget::Transfer(t) => Selection::Transfer(t),
            HitTarget::ControlPoint { segment, index } => {
                Selection::ControlPoint { segment, index }
            }
            HitTarget::Segment(seg) => Selection::Segment(seg),
        }
    }
}

/// Find the target under `at` (scene units). Control handles are only
/// hittable while shown, i.e. for the selected segment.
pub fn hit_test(
    scene: &MapScene,
    section: &MapSection,
    selection: &Selection,
    at: Point,
    zoom: f64,
) -> Option<HitTarget> {
    let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
    hit_station(scene, section, at, STATION_HIT_RADIUS / zoom)
        .or_else(|| hit_transfer(scene, section, at, TRANSFER_HIT_TOLERANCE / zoom))
        .or_else(|| hit_control(scene, section, selection, at, CONTROL_HIT_RADIUS / zoom))
        .or_else(|| hit_segment(scene, section, at, SEGMENT_HIT_TOLERANCE / zoom))
}

fn hit_station(scene: &MapScene, section: &MapSection, at: Point, radius: f64) -> Option<HitTarget> {
    let mut best: Option<(f64, HitTarget)> = None;
    for line in &section.lines {
        for station in &line.stations {
            let Some(pos) = scene.station_position(section, station.id) else {
                continue;
            };
            let d = pos.distance(at);
            if d <= radius && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((
                    d,
                    HitTarget::Station {
                        line: line.id,
                        station: station.id,
                    },
                ));
            }
        }
    }
    best.map(|(_, hit)| hit)
}

fn hit_transfer(scene: &MapScene, section: &MapSection, at: Point, tol: f64) -> Option<HitTarget> {
    let mut best: Option<(f64, TransferId)> = None;
    for t in &section.transfers {
        for (a, b) in t.links() {
            let (Some(pa), Some(pb)) = (
                scene.station_position(section, a),
                scene.station_position(section, b),
            ) else {
                continue;
            };
            let d = distance_to_chord(at, pa, pb);
            if d <= tol && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, t.id));
            }
        }
    }
    best.map(|(_, id)| HitTarget::Transfer(id))
}

fn hit_control(
    scene: &MapScene,
    section: &MapSection,
    selection: &Selection,
    at: Point,
    radius: f64,
) -> Option<HitTarget> {
    let segment = selection.segment()?;
    let handles = scene.control_handles(section, &segment)?;
    let (index, d) = handles
        .iter()
        .map(|h| h.distance(at))
        .enumerate()
        .min_by(|x, y| x.1.total_cmp(&y.1))?;
    (d <= radius).then_some(HitTarget::ControlPoint { segment, index })
}

fn hit_segment(scene: &MapScene, section: &MapSection, at: Point, tol: f64) -> Option<HitTarget> {
    let mut best: Option<(f64, SegmentRef)> = None;
    for line in &section.lines {
        for (a, b) in line.segments() {
            let Some(geom) = scene.segment_geometry(section, a, b) else {
                continue;
            };
            let d = distance_to_segment(&geom, at);
            if d <= tol && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, SegmentRef::new(line.id, a, b)));
            }
        }
    }
    best.map(|(_, seg)| HitTarget::Segment(seg))
}

// ─── Geometry ────────────────────────────────────────────────────────────

fn distance_to_chord(p: Point, a: Point, b: Point) -> f64 {
    Chord::new(a, b).nearest(p, 1e-9).distance_sq.sqrt()
}

/// Straight segments use the exact distance; curves are flattened into
/// [`BEZIER_SAMPLES`] chords.
pub fn distance_to_segment(geom: &SegmentGeometry, p: Point) -> f64 {
    match geom {
        SegmentGeometry::Straight(l) => distance_to_chord(p, l.p0, l.p1),
        SegmentGeometry::Curved(c) => {
            let mut prev = c.p0;
            let mut best = f64::INFINITY;
            for i in 1..=BEZIER_SAMPLES {
                let next = c.eval(i as f64 / BEZIER_SAMPLES as f64);
                best = best.min(distance_to_chord(p, prev, next));
                prev = next;
            }
            best
        }
    }
}
