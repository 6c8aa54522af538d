//! Adjacency regeneration.
//!
//! Rebuilds station `neighbors` lists from line order. Existing lists are
//! discarded; a ring (first and last stations mutually linked before the
//! rebuild, three or more stations) is kept closed.

use crate::model::{Line, MapDocument, MapSection, Neighbor, NeighborList};

/// Default neighbor travel time in seconds.
pub const DEFAULT_NEIGHBOR_TIME: f64 = 3.0;

pub fn regenerate_line(line: &mut Line, time: f64) {
    let had_ring = line.is_ring();
    let stations = &mut line.stations;
    if stations.is_empty() {
        return;
    }

    let ids: Vec<_> = stations.iter().map(|s| s.id).collect();
    for (i, station) in stations.iter_mut().enumerate() {
        let mut list = NeighborList::new();
        if i > 0 {
            list.push(Neighbor::new(ids[i - 1], time));
        }
        if i + 1 < ids.len() {
            list.push(Neighbor::new(ids[i + 1], time));
        }
        station.neighbors = Some(list);
    }

    if had_ring {
        let (first, last) = (ids[0], ids[ids.len() - 1]);
        if let Some(s) = stations.first_mut() {
            s.neighbors_mut().push(Neighbor::new(last, time));
        }
        if let Some(s) = stations.last_mut() {
            s.neighbors_mut().push(Neighbor::new(first, time));
        }
    }
}

pub fn regenerate_section(section: &mut MapSection, time: f64) {
    for line in &mut section.lines {
        regenerate_line(line, time);
    }
    log::debug!("regenerated neighbors for {} lines", section.lines.len());
}

pub fn regenerate_document(doc: &mut MapDocument, time: f64) {
    for section in doc.sections_mut() {
        regenerate_section(section, time);
    }
}

/// Give every station a `neighbors` array without touching existing ones.
pub fn ensure_neighbor_lists(doc: &mut MapDocument) {
    for section in doc.sections_mut() {
        for station in section.lines.iter_mut().flat_map(|l| l.stations.iter_mut()) {
            station.neighbors_mut();
        }
    }
}
