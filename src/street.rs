// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Snapping of stops onto the walkable street network.
//!
//! Candidates are first selected by an R-tree on raw coordinates, then
//! filtered on their haversine distance, which is accurate in meters.

use crate::graph::{Graph, NodeId};
use crate::objects::Coord;
use geo::{HaversineDistance, Point};
use rstar::primitives::GeomWithData;
use rstar::RTree;

/// Number of R-tree candidates checked with the haversine distance
const CANDIDATES: usize = 8;

/// Nearest walkable node lookup
pub trait LocationIndex {
    /// The walkable node closest to `coord`, if one is close enough
    fn find_closest(&self, coord: &Coord) -> Option<NodeId>;
}

type IndexedNode = GeomWithData<[f64; 2], NodeId>;

/// Great-circle distance in meters
pub fn distance(from: &Coord, to: &Coord) -> f64 {
    Point::from(*from).haversine_distance(&Point::from(*to))
}

/// R-tree of the nodes touched by a walkable edge
pub struct StreetIndex {
    tree: RTree<IndexedNode>,
    max_distance: f64,
}

impl StreetIndex {
    /// Index the walkable nodes of `graph`, snapping at most `max_distance`
    /// meters away
    pub fn new(graph: &Graph, max_distance: f64) -> Self {
        let mut nodes: Vec<NodeId> = graph
            .edges()
            .filter(|(_, e)| e.foot_access)
            .flat_map(|(_, e)| [e.base_node, e.adj_node])
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        let points = nodes
            .into_iter()
            .filter_map(|node| {
                graph
                    .coord(node)
                    .map(|c| GeomWithData::new([c.lon, c.lat], node))
            })
            .collect();
        StreetIndex {
            tree: RTree::bulk_load(points),
            max_distance,
        }
    }

    /// Number of indexed nodes
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// No node indexed
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl LocationIndex for StreetIndex {
    fn find_closest(&self, coord: &Coord) -> Option<NodeId> {
        self.tree
            .nearest_neighbor_iter(&[coord.lon, coord.lat])
            .take(CANDIDATES)
            .map(|candidate| {
                let [lon, lat] = *candidate.geom();
                (distance(coord, &Coord { lon, lat }), candidate.data)
            })
            .filter(|(distance, _)| *distance <= self.max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, node)| node)
    }
}
