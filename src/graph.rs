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

//! Directed graph shared by the street network and the transit network.
//!
//! Nodes only carry a location: the role of a transit node is given by the
//! type of the edges touching it.

use crate::objects::Coord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Identifier of a node
pub type NodeId = u32;
/// Identifier of an edge
pub type EdgeId = u32;

/// Type of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Street edge
    Highway,
    /// Station to departure platform
    EnterPt,
    /// Arrival platform to station
    ExitPt,
    /// Departure platform to a departure timeline slot
    EnterTimeExpanded,
    /// Arrival timeline slot to arrival platform
    LeaveTimeExpanded,
    /// Departure timeline slot to the vehicle
    Board,
    /// Vehicle to an arrival timeline slot
    Alight,
    /// Vehicle staying at a stop
    Dwell,
    /// Vehicle moving between two stops
    Hop,
    /// Between two consecutive departure slots
    Wait,
    /// Between two consecutive arrival slots
    WaitArrival,
    /// Last slot of the day to the first one
    Overnight,
    /// Arrival to a later departure slot, possibly at another stop
    Transfer,
}

/// A directed edge
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Source node
    pub base_node: NodeId,
    /// Target node
    pub adj_node: NodeId,
    /// Type of the edge
    pub edge_type: EdgeType,
    /// Display name
    pub name: String,
    /// Length in meters
    pub distance: f64,
    /// Duration of the traversal in seconds, or absolute time of day for
    /// `EnterTimeExpanded`/`LeaveTimeExpanded`
    pub time: u32,
    /// Validity pattern id for `Board`/`Alight`, route type for
    /// `EnterPt`/`ExitPt`, time zone id for `EnterTimeExpanded`/`LeaveTimeExpanded`
    pub validity: u32,
    /// 1 on `Board` edges, 0 elsewhere
    pub transfers: u32,
    /// Usable by transit
    pub pt_access: bool,
    /// Usable by pedestrians
    pub foot_access: bool,
}

/// Fields of a transit edge
#[derive(Debug, Clone, PartialEq)]
pub struct PtEdge {
    edge_type: EdgeType,
    name: String,
    time: u32,
    validity: u32,
    transfers: u32,
}

impl PtEdge {
    /// A transit edge of the given type with every other field zeroed
    pub fn new(edge_type: EdgeType) -> Self {
        PtEdge {
            edge_type,
            name: String::new(),
            time: 0,
            validity: 0,
            transfers: 0,
        }
    }
    /// Set the display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
    /// Set the time field
    pub fn time(mut self, time: u32) -> Self {
        self.time = time;
        self
    }
    /// Set the validity field
    pub fn validity(mut self, validity: u32) -> Self {
        self.validity = validity;
        self
    }
    /// Set the transfer count delta
    pub fn transfers(mut self, transfers: u32) -> Self {
        self.transfers = transfers;
        self
    }
}

/// Nodes and edges, with adjacency in both directions
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Coord>,
    edges: Vec<Edge>,
    out_edges: Vec<Vec<EdgeId>>,
    in_edges: Vec<Vec<EdgeId>>,
}

impl Graph {
    /// Number of nodes, which is also the next unused node id
    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Number of edges
    pub fn edge_count(&self) -> u32 {
        self.edges.len() as u32
    }

    /// Append a node
    pub fn add_node(&mut self, coord: Coord) -> NodeId {
        let node = self.node_count();
        self.set_node(node, coord);
        node
    }

    /// Place a node at `coord`, growing the node storage if needed
    pub fn set_node(&mut self, node: NodeId, coord: Coord) {
        self.ensure_node(node);
        self.nodes[node as usize] = coord;
    }

    fn ensure_node(&mut self, node: NodeId) {
        let len = node as usize + 1;
        if self.nodes.len() < len {
            self.nodes.resize(len, Coord::default());
            self.out_edges.resize_with(len, Vec::new);
            self.in_edges.resize_with(len, Vec::new);
        }
    }

    /// Location of a node
    pub fn coord(&self, node: NodeId) -> Option<Coord> {
        self.nodes.get(node as usize).copied()
    }

    /// Append an edge
    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let id = self.edge_count();
        self.ensure_node(edge.base_node.max(edge.adj_node));
        self.out_edges[edge.base_node as usize].push(id);
        self.in_edges[edge.adj_node as usize].push(id);
        self.edges.push(edge);
        id
    }

    /// Append a street edge, walkable in both directions
    pub fn add_street_edge(&mut self, from: NodeId, to: NodeId, distance: f64) -> EdgeId {
        self.add_edge(Edge {
            base_node: from,
            adj_node: to,
            edge_type: EdgeType::Highway,
            name: String::new(),
            distance,
            time: 0,
            validity: 0,
            transfers: 0,
            pt_access: false,
            foot_access: true,
        })
    }

    /// Edge by id
    pub fn edge(&self, edge: EdgeId) -> Option<&Edge> {
        self.edges.get(edge as usize)
    }

    /// All edges with their ids
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().enumerate().map(|(id, e)| (id as EdgeId, e))
    }

    /// Edges leaving `node`, in creation order
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.adjacent(&self.out_edges, node)
    }

    /// Edges reaching `node`, in creation order
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.adjacent(&self.in_edges, node)
    }

    fn adjacent<'a>(
        &'a self,
        adjacency: &'a [Vec<EdgeId>],
        node: NodeId,
    ) -> impl Iterator<Item = (EdgeId, &'a Edge)> {
        adjacency
            .get(node as usize)
            .into_iter()
            .flatten()
            .map(move |&id| (id, &self.edges[id as usize]))
    }

    /// Number of edges per type
    pub fn edge_count_by_type(&self) -> BTreeMap<EdgeType, usize> {
        let mut counts = BTreeMap::new();
        for edge in &self.edges {
            *counts.entry(edge.edge_type).or_insert(0) += 1;
        }
        counts
    }
}

/// Allocates transit nodes and edges for one builder.
///
/// Node ids are taken from a cursor owned by the writer, so independent
/// writers given disjoint starting points never hand out the same id.
#[derive(Debug)]
pub struct PtGraphWriter<'a> {
    graph: &'a mut Graph,
    next_node: NodeId,
}

impl<'a> PtGraphWriter<'a> {
    /// A writer allocating nodes from `first_node`
    pub fn new(graph: &'a mut Graph, first_node: NodeId) -> Self {
        PtGraphWriter {
            graph,
            next_node: first_node,
        }
    }

    /// Next node id to be handed out
    pub fn next_node(&self) -> NodeId {
        self.next_node
    }

    /// Read access to the graph
    pub fn graph(&self) -> &Graph {
        &*self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut Graph {
        &mut *self.graph
    }

    /// Allocate a transit node at `coord`
    pub fn add_pt_node(&mut self, coord: Coord) -> NodeId {
        let node = self.next_node;
        self.next_node += 1;
        self.graph.set_node(node, coord);
        node
    }

    /// Add a transit edge, usable by transit in its direction only
    pub fn add_pt_edge(&mut self, from: NodeId, to: NodeId, edge: PtEdge) -> EdgeId {
        self.graph.add_edge(Edge {
            base_node: from,
            adj_node: to,
            edge_type: edge.edge_type,
            name: edge.name,
            distance: 0.0,
            time: edge.time,
            validity: edge.validity,
            transfers: edge.transfers,
            pt_access: true,
            foot_access: false,
        })
    }
}
