//! Update-at-path helpers over the section → line → station tree.
//!
//! Each helper locates one entity and applies a closure to it in place,
//! returning `false` when the target does not exist. Mutations are built on
//! these so lookups and id-uniqueness checks live in one place.

use crate::id::{LineId, StationId, TransferId};
use crate::model::{CurveEntry, Line, MapDocument, MapSection, Point, Station, Transfer};

// ─── Lookups ─────────────────────────────────────────────────────────────

/// Whether any section of the document already uses `id` for a station.
pub fn station_id_in_use(doc: &MapDocument, id: StationId) -> bool {
    doc.sections().any(|(_, s)| s.station(id).is_some())
}

// ─── Path updates ────────────────────────────────────────────────────────

pub fn update_line(section: &mut MapSection, line: LineId, f: impl FnOnce(&mut Line)) -> bool {
    match section.line_mut(line) {
        Some(l) => {
            f(l);
            true
        }
        None => false,
    }
}

/// Update a station wherever it lives in the section (first match).
pub fn update_station(
    section: &mut MapSection,
    station: StationId,
    f: impl FnOnce(&mut Station),
) -> bool {
    match section
        .lines
        .iter_mut()
        .find_map(|l| l.station_mut(station))
    {
        Some(s) => {
            f(s);
            true
        }
        None => false,
    }
}

pub fn update_transfer(
    section: &mut MapSection,
    transfer: TransferId,
    f: impl FnOnce(&mut Transfer),
) -> bool {
    match section.transfers.iter_mut().find(|t| t.id == transfer) {
        Some(t) => {
            f(t);
            true
        }
        None => false,
    }
}

/// Set control point `index` of the `(a, b)` curve, creating the entry with
/// both points at `point` when the segment is still straight.
pub fn upsert_curve_point(
    section: &mut MapSection,
    a: StationId,
    b: StationId,
    index: usize,
    point: Point,
) -> bool {
    if index > 1 {
        return false;
    }
    match section.curve_mut(a, b) {
        Some(entry) => {
            let oriented = if entry.neighbors_id[0] == a { index } else { 1 - index };
            while entry.points.len() < 2 {
                entry.points.push(point);
            }
            entry.points[oriented] = point;
        }
        None => section
            .intermediate_points
            .push(CurveEntry::new(a, b, point, point)),
    }
    true
}

/// Create the `(a, b)` curve entry with handles on the chord. No-op when the
/// pair already has one or either station is missing.
pub fn add_curve(section: &mut MapSection, a: StationId, b: StationId) -> bool {
    if a == b || section.curve(a, b).is_some() {
        return false;
    }
    let (Some(pa), Some(pb)) = (
        section.station(a).map(|s| s.position()),
        section.station(b).map(|s| s.position()),
    ) else {
        return false;
    };
    section
        .intermediate_points
        .push(CurveEntry::on_chord(a, pa, b, pb));
    true
}

pub fn remove_curve(section: &mut MapSection, a: StationId, b: StationId) -> bool {
    let before = section.intermediate_points.len();
    section.intermediate_points.retain(|c| !c.connects(a, b));
    section.intermediate_points.len() != before
}

/// Drop every reference to `station` from neighbor lists, transfers and
/// curve entries. Transfers that lose a member and drop below two stations
/// are removed.
pub fn remove_station_refs(section: &mut MapSection, station: StationId) {
    for s in section.lines.iter_mut().flat_map(|l| l.stations.iter_mut()) {
        if let Some(list) = s.neighbors.as_mut() {
            list.retain(|n| n.id != station);
        }
    }
    section.transfers.retain_mut(|t| {
        if !t.involves(station) {
            return true;
        }
        t.stations.retain(|id| *id != station);
        t.stations.len() >= 2
    });
    section.intermediate_points.retain(|c| !c.involves(station));
}
