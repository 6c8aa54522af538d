//! Structural document mutations.
//!
//! Every user edit is expressed as a [`MapMutation`] and applied to one
//! section of the document through the path-update helpers in
//! `metro_core::transform`. `apply_mutation` reports whether the target was
//! found; a missing target leaves the document untouched.

use metro_core::transform::{
    add_curve, remove_curve, remove_station_refs, station_id_in_use, update_line, update_station,
    update_transfer, upsert_curve_point,
};
use metro_core::{
    Id, Line, LineId, MapDocument, MapSection, Neighbor, Point, River, SectionKind, Station,
    StationId, TextPosition, Transfer, TransferId, TransferKind, regenerate_line,
    regenerate_section,
};

/// Color given to freshly created lines.
pub const NEW_LINE_COLOR: &str = "#ff0000";
/// Spawn position of the first station on a line; later ones step right.
pub const NEW_STATION_ORIGIN: Point = Point::new(100.0, 100.0);
pub const NEW_STATION_SPACING: f64 = 50.0;

/// How far a neighbor regeneration reaches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegenerateScope {
    Line(LineId),
    Section,
    Document,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapMutation {
    // Lines
    AddLine(Line),
    RemoveLine(LineId),
    RenameLine { line: LineId, name: String },
    RecolorLine { line: LineId, color: String },

    // Stations
    /// Append to a line, linking to its previous last station.
    AddStation {
        line: LineId,
        station: Station,
        link_time: f64,
    },
    RemoveStation(StationId),
    RenameStation { station: StationId, name: String },
    MoveStation { station: StationId, to: Point },
    SetTextPosition {
        station: StationId,
        position: Option<TextPosition>,
    },

    // Transfers
    AddTransfer(Transfer),
    RemoveTransfer(TransferId),
    EditTransfer {
        transfer: TransferId,
        time: Option<f64>,
        kind: Option<TransferKind>,
    },
    AddTransferStations {
        transfer: TransferId,
        stations: Vec<StationId>,
    },
    RemoveTransferStation {
        transfer: TransferId,
        station: StationId,
    },

    // Neighbor lists (directed: only `station`'s own list changes)
    AddNeighbors {
        station: StationId,
        neighbors: Vec<StationId>,
        time: f64,
    },
    RemoveNeighbor {
        station: StationId,
        neighbor: StationId,
    },
    SetNeighborTime {
        station: StationId,
        neighbor: StationId,
        time: f64,
    },
    RegenerateNeighbors { scope: RegenerateScope, time: f64 },

    // Curves
    /// Bend a straight segment: handles start at 1/3 and 2/3 of the chord.
    AddCurve { a: StationId, b: StationId },
    /// Control point `index` counted from `a`'s end of the segment.
    SetCurvePoint {
        a: StationId,
        b: StationId,
        index: usize,
        at: Point,
    },
    RemoveCurve { a: StationId, b: StationId },

    // Rivers
    AddRiver(River),
    RemoveRiver(Id),
}

impl MapMutation {
    /// A new line named after its position in the section.
    pub fn new_line(section: Option<&MapSection>) -> Self {
        let n = section.map_or(0, |s| s.lines.len()) + 1;
        MapMutation::AddLine(Line::new(
            Id::generate("line"),
            format!("Line {n}"),
            NEW_LINE_COLOR,
        ))
    }

    /// A new station appended to `line`, placed to the right of the last one.
    pub fn new_station(line: &Line, link_time: f64) -> Self {
        let n = line.stations.len();
        let station = Station::new(
            Id::generate("station"),
            format!("Station {}", n + 1),
            NEW_STATION_ORIGIN.x + n as f64 * NEW_STATION_SPACING,
            NEW_STATION_ORIGIN.y,
        );
        MapMutation::AddStation {
            line: line.id,
            station,
            link_time,
        }
    }

    pub fn new_transfer(stations: Vec<StationId>, time: f64) -> Self {
        MapMutation::AddTransfer(Transfer::new(
            Id::generate("transfer"),
            stations,
            time,
            TransferKind::Default,
        ))
    }

    pub fn new_river(points: Vec<Point>) -> Self {
        MapMutation::AddRiver(River {
            id: Id::generate("river"),
            points,
            ..River::default()
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            MapMutation::AddLine(_) => "add line",
            MapMutation::RemoveLine(_) => "remove line",
            MapMutation::RenameLine { .. } => "rename line",
            MapMutation::RecolorLine { .. } => "recolor line",
            MapMutation::AddStation { .. } => "add station",
            MapMutation::RemoveStation(_) => "remove station",
            MapMutation::RenameStation { .. } => "rename station",
            MapMutation::MoveStation { .. } => "move station",
            MapMutation::SetTextPosition { .. } => "text position",
            MapMutation::AddTransfer(_) => "add transfer",
            MapMutation::RemoveTransfer(_) => "remove transfer",
            MapMutation::EditTransfer { .. } => "edit transfer",
            MapMutation::AddTransferStations { .. } => "add transfer stations",
            MapMutation::RemoveTransferStation { .. } => "remove transfer station",
            MapMutation::AddNeighbors { .. } => "add neighbors",
            MapMutation::RemoveNeighbor { .. } => "remove neighbor",
            MapMutation::SetNeighborTime { .. } => "neighbor time",
            MapMutation::RegenerateNeighbors { .. } => "regenerate neighbors",
            MapMutation::AddCurve { .. } => "add curve",
            MapMutation::SetCurvePoint { .. } => "curve point",
            MapMutation::RemoveCurve { .. } => "remove curve",
            MapMutation::AddRiver(_) => "add river",
            MapMutation::RemoveRiver(_) => "remove river",
        }
    }
}

/// Apply `mutation` to section `kind` of `doc`. Returns `false` when the
/// target is missing (or an id would collide), leaving `doc` untouched.
pub fn apply_mutation(doc: &mut MapDocument, kind: SectionKind, mutation: MapMutation) -> bool {
    match mutation {
        MapMutation::AddLine(line) => {
            let section = doc.section_entry(kind);
            if section.line(line.id).is_some() {
                return false;
            }
            section.lines.push(line);
            true
        }

        MapMutation::AddStation {
            line,
            station,
            link_time,
        } => {
            if station.id.is_empty() || station_id_in_use(doc, station.id) {
                return false;
            }
            let Some(section) = doc.section_mut(kind) else {
                return false;
            };
            update_line(section, line, |l| append_station(l, station, link_time))
        }

        MapMutation::RegenerateNeighbors {
            scope: RegenerateScope::Document,
            time,
        } => {
            let mut any = false;
            for section in doc.sections_mut() {
                regenerate_section(section, time);
                any = true;
            }
            any
        }

        other => match doc.section_mut(kind) {
            Some(section) => apply_to_section(section, other),
            None => false,
        },
    }
}

fn apply_to_section(section: &mut MapSection, mutation: MapMutation) -> bool {
    match mutation {
        // ─── Lines ───────────────────────────────────────────────────────
        MapMutation::RemoveLine(id) => {
            let Some(pos) = section.lines.iter().position(|l| l.id == id) else {
                return false;
            };
            let line = section.lines.remove(pos);
            for station in &line.stations {
                remove_station_refs(section, station.id);
            }
            true
        }

        MapMutation::RenameLine { line, name } => update_line(section, line, |l| l.name = name),

        MapMutation::RecolorLine { line, color } => {
            update_line(section, line, |l| l.color = color)
        }

        // ─── Stations ────────────────────────────────────────────────────
        MapMutation::RemoveStation(id) => {
            let mut found = false;
            for line in &mut section.lines {
                let before = line.stations.len();
                line.stations.retain(|s| s.id != id);
                found |= line.stations.len() != before;
            }
            if found {
                remove_station_refs(section, id);
            }
            found
        }

        MapMutation::RenameStation { station, name } => {
            update_station(section, station, |s| s.name = name)
        }

        MapMutation::MoveStation { station, to } => update_station(section, station, |s| {
            s.x = finite_or_zero(to.x);
            s.y = finite_or_zero(to.y);
        }),

        MapMutation::SetTextPosition { station, position } => {
            update_station(section, station, |s| s.text_position = position)
        }

        // ─── Transfers ───────────────────────────────────────────────────
        MapMutation::AddTransfer(transfer) => {
            if section.transfer(transfer.id).is_some() {
                return false;
            }
            section.transfers.push(transfer);
            true
        }

        MapMutation::RemoveTransfer(id) => {
            let before = section.transfers.len();
            section.transfers.retain(|t| t.id != id);
            section.transfers.len() != before
        }

        MapMutation::EditTransfer {
            transfer,
            time,
            kind,
        } => update_transfer(section, transfer, |t| {
            if let Some(time) = time {
                t.time = finite_or_zero(time);
            }
            if let Some(kind) = kind {
                t.kind = kind;
            }
        }),

        MapMutation::AddTransferStations { transfer, stations } => {
            update_transfer(section, transfer, |t| {
                for id in stations {
                    if !t.stations.contains(&id) {
                        t.stations.push(id);
                    }
                }
            })
        }

        MapMutation::RemoveTransferStation { transfer, station } => {
            update_transfer(section, transfer, |t| t.stations.retain(|id| *id != station))
        }

        // ─── Neighbors ───────────────────────────────────────────────────
        MapMutation::AddNeighbors {
            station,
            neighbors,
            time,
        } => update_station(section, station, |s| {
            let list = s.neighbors_mut();
            for id in neighbors {
                if id != station && !list.iter().any(|n| n.id == id) {
                    list.push(Neighbor::new(id, time));
                }
            }
        }),

        MapMutation::RemoveNeighbor { station, neighbor } => {
            update_station(section, station, |s| {
                s.neighbors_mut().retain(|n| n.id != neighbor)
            })
        }

        MapMutation::SetNeighborTime {
            station,
            neighbor,
            time,
        } => update_station(section, station, |s| {
            for n in s.neighbors_mut().iter_mut().filter(|n| n.id == neighbor) {
                n.time = finite_or_zero(time);
            }
        }),

        MapMutation::RegenerateNeighbors { scope, time } => match scope {
            RegenerateScope::Line(line) => update_line(section, line, |l| regenerate_line(l, time)),
            RegenerateScope::Section | RegenerateScope::Document => {
                regenerate_section(section, time);
                true
            }
        },

        // ─── Curves ──────────────────────────────────────────────────────
        MapMutation::SetCurvePoint { a, b, index, at } => {
            if !at.is_finite() || section.station(a).is_none() || section.station(b).is_none() {
                return false;
            }
            upsert_curve_point(section, a, b, index, at)
        }

        MapMutation::AddCurve { a, b } => add_curve(section, a, b),

        MapMutation::RemoveCurve { a, b } => remove_curve(section, a, b),

        // ─── Rivers ──────────────────────────────────────────────────────
        MapMutation::AddRiver(river) => {
            if river.points.len() < 2 {
                return false;
            }
            section.rivers.push(river);
            true
        }

        MapMutation::RemoveRiver(id) => {
            let before = section.rivers.len();
            section.rivers.retain(|r| r.id != id);
            section.rivers.len() != before
        }

        // Handled at document level.
        MapMutation::AddLine(_) | MapMutation::AddStation { .. } => false,
    }
}

fn append_station(line: &mut Line, mut station: Station, time: f64) {
    if let Some(prev) = line.stations.last_mut() {
        let new_id = station.id;
        let prev_id = prev.id;
        let list = prev.neighbors_mut();
        list.retain(|n| n.id != new_id);
        list.push(Neighbor::new(new_id, time));
        let list = station.neighbors_mut();
        list.retain(|n| n.id != prev_id);
        list.push(Neighbor::new(prev_id, time));
    }
    line.stations.push(station);
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metro_core::load_document;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc() -> MapDocument {
        load_document(json!({ "metro_map": {
            "lines": [{ "id": "L1", "name": "Red", "color": "#f00", "stations": [
                { "id": "S1", "name": "One", "x": 100, "y": 100, "neighbors": [["S2", 3]] },
                { "id": "S2", "name": "Two", "x": 200, "y": 100, "neighbors": [["S1", 3]] }
            ]}],
            "transfers": [{ "id": "T1", "stations": ["S1", "S2"], "time": 2, "type": "ground" }]
        }}))
        .document
    }

    fn id(s: &str) -> Id {
        Id::intern(s)
    }

    fn metro(doc: &MapDocument) -> &MapSection {
        doc.section(SectionKind::Metro).expect("metro section")
    }

    #[test]
    fn new_station_links_to_previous_last() {
        let mut d = doc();
        let line = metro(&d).line(id("L1")).cloned().unwrap();
        let m = MapMutation::new_station(&line, 4.0);
        let MapMutation::AddStation { station, .. } = &m else {
            panic!("expected AddStation");
        };
        let new_id = station.id;
        assert_eq!((station.x, station.y), (200.0, 100.0));
        assert_eq!(station.name, "Station 3");

        assert!(apply_mutation(&mut d, SectionKind::Metro, m));
        let s = metro(&d);
        assert_eq!(s.station(new_id).unwrap().neighbors(), &[Neighbor::new(id("S2"), 4.0)]);
        assert_eq!(
            s.station(id("S2")).unwrap().neighbors(),
            &[Neighbor::new(id("S1"), 3.0), Neighbor::new(new_id, 4.0)]
        );
    }

    #[test]
    fn duplicate_station_id_is_rejected() {
        let mut d = doc();
        let before = d.clone();
        let m = MapMutation::AddStation {
            line: id("L1"),
            station: Station::new(id("S1"), "Dup", 0.0, 0.0),
            link_time: 3.0,
        };
        assert!(!apply_mutation(&mut d, SectionKind::Metro, m));
        assert_eq!(d, before);
    }

    #[test]
    fn add_line_creates_missing_section() {
        let mut d = doc();
        let m = MapMutation::new_line(d.section(SectionKind::Tram));
        let MapMutation::AddLine(line) = &m else {
            panic!("expected AddLine");
        };
        assert_eq!(line.name, "Line 1");
        assert!(apply_mutation(&mut d, SectionKind::Tram, m));
        assert_eq!(d.section(SectionKind::Tram).unwrap().lines.len(), 1);
    }

    #[test]
    fn removing_station_cleans_references() {
        let mut d = doc();
        assert!(apply_mutation(&mut d, SectionKind::Metro, MapMutation::RemoveStation(id("S2"))));
        let s = metro(&d);
        assert!(s.station(id("S1")).unwrap().neighbors().is_empty());
        assert!(s.transfers.is_empty());
    }

    #[test]
    fn transfer_members_union_and_removal() {
        let mut d = doc();
        let t = id("T1");
        apply_mutation(
            &mut d,
            SectionKind::Metro,
            MapMutation::AddTransferStations {
                transfer: t,
                stations: vec![id("S2"), id("S9")],
            },
        );
        assert_eq!(metro(&d).transfer(t).unwrap().stations, vec![id("S1"), id("S2"), id("S9")]);
        apply_mutation(
            &mut d,
            SectionKind::Metro,
            MapMutation::RemoveTransferStation {
                transfer: t,
                station: id("S1"),
            },
        );
        assert_eq!(metro(&d).transfer(t).unwrap().stations, vec![id("S2"), id("S9")]);
    }

    #[test]
    fn neighbor_edits_are_directed() {
        let mut d = doc();
        apply_mutation(
            &mut d,
            SectionKind::Metro,
            MapMutation::SetNeighborTime {
                station: id("S1"),
                neighbor: id("S2"),
                time: 7.0,
            },
        );
        let s = metro(&d);
        assert_eq!(s.station(id("S1")).unwrap().neighbors(), &[Neighbor::new(id("S2"), 7.0)]);
        assert_eq!(s.station(id("S2")).unwrap().neighbors(), &[Neighbor::new(id("S1"), 3.0)]);
    }

    #[test]
    fn non_finite_coordinates_become_zero() {
        let mut d = doc();
        apply_mutation(
            &mut d,
            SectionKind::Metro,
            MapMutation::MoveStation {
                station: id("S1"),
                to: Point::new(f64::NAN, 42.0),
            },
        );
        assert_eq!(metro(&d).station(id("S1")).unwrap().position(), Point::new(0.0, 42.0));
    }

    #[test]
    fn add_curve_places_handles_on_chord() {
        let mut d = doc();
        let add = |a: &str, b: &str| MapMutation::AddCurve { a: id(a), b: id(b) };
        assert!(apply_mutation(&mut d, SectionKind::Metro, add("S1", "S2")));
        let entry = metro(&d).curve(id("S2"), id("S1")).cloned().unwrap();
        let (c1, c2) = entry.controls_from(id("S1")).unwrap();
        assert!((c1.x - 400.0 / 3.0).abs() < 1e-9 && c1.y == 100.0);
        assert!((c2.x - 500.0 / 3.0).abs() < 1e-9 && c2.y == 100.0);
        // already curved, either order
        assert!(!apply_mutation(&mut d, SectionKind::Metro, add("S2", "S1")));
        assert_eq!(metro(&d).intermediate_points.len(), 1);
        assert!(!apply_mutation(&mut d, SectionKind::Metro, add("S1", "ghost")));
        assert!(!apply_mutation(&mut d, SectionKind::Metro, add("S1", "S1")));
    }

    #[test]
    fn missing_targets_are_noops() {
        let mut d = doc();
        let before = d.clone();
        let ghost = id("ghost");
        for m in [
            MapMutation::RenameLine {
                line: ghost,
                name: "x".into(),
            },
            MapMutation::RemoveStation(ghost),
            MapMutation::RemoveTransfer(ghost),
            MapMutation::SetCurvePoint {
                a: ghost,
                b: id("S1"),
                index: 0,
                at: Point::new(1.0, 1.0),
            },
        ] {
            assert!(!apply_mutation(&mut d, SectionKind::Metro, m));
        }
        assert!(!apply_mutation(
            &mut d,
            SectionKind::Suburban,
            MapMutation::RemoveStation(id("S1"))
        ));
        assert_eq!(d, before);
    }
}
