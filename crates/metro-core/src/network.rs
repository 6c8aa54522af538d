//! Station connectivity graph over neighbor and transfer links.

use crate::id::StationId;
use crate::model::MapSection;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// How two stations are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// A `neighbors` entry along a line.
    Track,
    /// A walking transfer.
    Transfer,
}

/// Undirected station graph for one section. Links to stations that do not
/// exist in the section are dropped; repeated links collapse to one edge.
pub struct StationNetwork {
    pub graph: UnGraph<StationId, LinkKind>,
    index: HashMap<StationId, NodeIndex>,
}

impl StationNetwork {
    pub fn build(section: &MapSection) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut index = HashMap::new();
        for station in section.stations() {
            index
                .entry(station.id)
                .or_insert_with(|| graph.add_node(station.id));
        }

        for station in section.stations() {
            let Some(&from) = index.get(&station.id) else {
                continue;
            };
            for n in station.neighbors() {
                if let Some(&to) = index.get(&n.id)
                    && from != to
                {
                    graph.update_edge(from, to, LinkKind::Track);
                }
            }
        }

        for transfer in &section.transfers {
            for (a, b) in transfer.links() {
                if let (Some(&x), Some(&y)) = (index.get(&a), index.get(&b))
                    && x != y
                    && graph.find_edge(x, y).is_none()
                {
                    graph.add_edge(x, y, LinkKind::Transfer);
                }
            }
        }

        Self { graph, index }
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of distinct stations linked to `id`.
    pub fn degree(&self, id: StationId) -> usize {
        self.index
            .get(&id)
            .map_or(0, |&ix| self.graph.neighbors(ix).count())
    }

    pub fn is_isolated(&self, id: StationId) -> bool {
        self.contains(id) && self.degree(id) == 0
    }

    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }
}
