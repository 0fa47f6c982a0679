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

//! Side tables of the transit network, shared by every feed built into the
//! same graph and queried by the journey search.

use crate::error::BuildError;
use crate::graph::{EdgeId, EdgeType, NodeId};
use crate::objects::{Date, Time};
use crate::stations::StationRegistry;
use crate::timeline::PlatformDescriptor;
use crate::validity::{FeedIdWithTimezone, Interner, ValidityPattern, ValidityPatternRegistry};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Identifies a trip instance.
///
/// `start_time` is only set on instances of frequency-based trips, so that
/// each instance is a distinct key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TripDescriptor {
    /// Identifier of the trip
    pub trip_id: String,
    /// Route of the trip
    pub route_id: String,
    /// Start of the instance, for frequency-based trips
    pub start_time: Option<Time>,
}

impl TripDescriptor {
    /// Descriptor of a scheduled trip
    pub fn new(trip_id: &str, route_id: &str) -> Self {
        TripDescriptor {
            trip_id: trip_id.to_owned(),
            route_id: route_id.to_owned(),
            start_time: None,
        }
    }

    /// Descriptor of one instance of a frequency-based trip
    pub fn with_start_time(mut self, start_time: Time) -> Self {
        self.start_time = Some(start_time);
        self
    }
}

impl fmt::Display for TripDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.start_time {
            Some(start_time) => write!(f, "{}@{}", self.trip_id, start_time),
            None => write!(f, "{}", self.trip_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PlatformDirection {
    Enter,
    Exit,
}

impl PlatformDirection {
    fn of(edge_type: EdgeType) -> Result<Self, BuildError> {
        match edge_type {
            EdgeType::EnterPt => Ok(PlatformDirection::Enter),
            EdgeType::ExitPt => Ok(PlatformDirection::Exit),
            other => Err(BuildError::UnsupportedEdgeType(other)),
        }
    }
}

/// Everything the search needs besides the graph itself
#[derive(Debug, Default)]
pub struct TransitStorage {
    /// Day-validity patterns referenced by `Board`/`Alight` edges
    pub validity_patterns: ValidityPatternRegistry,
    /// Timezones referenced by `EnterTimeExpanded`/`LeaveTimeExpanded` edges
    pub time_zones: Interner<FeedIdWithTimezone>,
    /// Station node of every stop
    pub stations: StationRegistry,
    platform_nodes: HashMap<(PlatformDescriptor, PlatformDirection), NodeId>,
    platform_descriptor_by_edge: HashMap<EdgeId, PlatformDescriptor>,
    stop_sequences: HashMap<EdgeId, u32>,
    trip_descriptors: HashMap<EdgeId, TripDescriptor>,
    board_edges_for_trip: HashMap<TripDescriptor, Vec<Option<EdgeId>>>,
    alight_edges_for_trip: HashMap<TripDescriptor, Vec<Option<EdgeId>>>,
}

impl TransitStorage {
    /// Record the platform node reached by an `EnterPt` edge, or left by an
    /// `ExitPt` edge. The first node recorded for a platform is kept.
    pub fn register_platform_node(
        &mut self,
        platform: PlatformDescriptor,
        edge_type: EdgeType,
        node: NodeId,
    ) -> Result<(), BuildError> {
        let direction = PlatformDirection::of(edge_type)?;
        self.platform_nodes
            .entry((platform, direction))
            .or_insert(node);
        Ok(())
    }

    /// Platform node of a platform, on the `EnterPt` (departures) or
    /// `ExitPt` (arrivals) side. Any other edge type is an error.
    pub fn platform_node(
        &self,
        platform: &PlatformDescriptor,
        edge_type: EdgeType,
    ) -> Result<Option<NodeId>, BuildError> {
        let direction = PlatformDirection::of(edge_type)?;
        Ok(self
            .platform_nodes
            .get(&(platform.clone(), direction))
            .copied())
    }

    pub(crate) fn set_platform_descriptor(&mut self, edge: EdgeId, platform: PlatformDescriptor) {
        self.platform_descriptor_by_edge.insert(edge, platform);
    }

    /// Platform of an `EnterPt`, `ExitPt` or `Transfer` edge
    pub fn platform_descriptor(&self, edge: EdgeId) -> Option<&PlatformDescriptor> {
        self.platform_descriptor_by_edge.get(&edge)
    }

    pub(crate) fn set_stop_sequence(&mut self, edge: EdgeId, stop_sequence: u32) {
        self.stop_sequences.insert(edge, stop_sequence);
    }

    /// Stop sequence of a `Hop`, `Board` or `Alight` edge
    pub fn stop_sequence(&self, edge: EdgeId) -> Option<u32> {
        self.stop_sequences.get(&edge).copied()
    }

    pub(crate) fn set_trip_descriptor(&mut self, edge: EdgeId, trip: TripDescriptor) {
        self.trip_descriptors.insert(edge, trip);
    }

    /// Trip of a `Board` or `Alight` edge
    pub fn trip_descriptor(&self, edge: EdgeId) -> Option<&TripDescriptor> {
        self.trip_descriptors.get(&edge)
    }

    pub(crate) fn set_trip_edges(
        &mut self,
        trip: TripDescriptor,
        board_edges: Vec<Option<EdgeId>>,
        alight_edges: Vec<Option<EdgeId>>,
    ) {
        self.board_edges_for_trip.insert(trip.clone(), board_edges);
        self.alight_edges_for_trip.insert(trip, alight_edges);
    }

    /// Board edges of a trip, indexed by stop sequence
    pub fn board_edges(&self, trip: &TripDescriptor) -> Option<&[Option<EdgeId>]> {
        self.board_edges_for_trip.get(trip).map(Vec::as_slice)
    }

    /// Alight edges of a trip, indexed by stop sequence
    pub fn alight_edges(&self, trip: &TripDescriptor) -> Option<&[Option<EdgeId>]> {
        self.alight_edges_for_trip.get(trip).map(Vec::as_slice)
    }

    /// Board edge of a trip at a stop sequence
    pub fn board_edge(&self, trip: &TripDescriptor, stop_sequence: u32) -> Option<EdgeId> {
        self.board_edges(trip)
            .and_then(|edges| edges.get(stop_sequence as usize).copied().flatten())
    }

    /// Alight edge of a trip at a stop sequence
    pub fn alight_edge(&self, trip: &TripDescriptor, stop_sequence: u32) -> Option<EdgeId> {
        self.alight_edges(trip)
            .and_then(|edges| edges.get(stop_sequence as usize).copied().flatten())
    }

    /// Day-validity pattern of an id
    pub fn validity(&self, validity_id: u32) -> Option<&ValidityPattern> {
        self.validity_patterns.get(validity_id)
    }

    /// Whether an edge with this validity id can be used on `date`
    pub fn is_valid_on(&self, validity_id: u32, date: Date) -> bool {
        self.validity_patterns.is_valid_on(validity_id, date)
    }
}

/// Largest stop sequence a trip can be expanded with
pub const MAX_STOP_SEQUENCE: u32 = 100_000;

/// Store `edge` at index `stop_sequence`, padding the gap with absent edges.
/// Sequences above `MAX_STOP_SEQUENCE` are refused by the trip expansion.
pub(crate) fn record_at(edges: &mut Vec<Option<EdgeId>>, stop_sequence: u32, edge: EdgeId) {
    debug_assert!(stop_sequence <= MAX_STOP_SEQUENCE);
    let index = stop_sequence as usize;
    if edges.len() <= index {
        edges.resize(index + 1, None);
    }
    edges[index] = Some(edge);
}
