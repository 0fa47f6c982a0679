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

//! In-seat transfers between consecutive trips of a block.
//!
//! A passenger staying on board from one trip to the next of the same
//! vehicle must not be charged a transfer. Each day the next trip runs is
//! covered by at most one earlier trip: the most recent one arriving before
//! it departs and running that day.

use crate::builder::TransitNetworkBuilder;
use crate::graph::{EdgeType, NodeId, PtEdge};
use crate::objects::{Stop, StopTime};
use crate::storage::TripDescriptor;
use crate::timeline::PlatformDescriptor;
use bit_set::BitSet;
use chrono_tz::Tz;
use tracing::trace;

/// Last arrival of a trip already expanded in a block
#[derive(Debug, Clone, PartialEq)]
pub struct TripArrival {
    /// Service days of the trip
    pub valid_on_day: BitSet,
    /// Node of the vehicle at its last stop
    pub arrival_node: NodeId,
    /// Arrival time at the last stop, in seconds since midnight
    pub arrival_time: u32,
}

/// Split `validity` among the trips of `arrivals` able to feed a departure at
/// `departure_time`, the most recent ones first.
///
/// Returns the index of each feeding trip with the days it covers. These
/// day sets are pairwise disjoint and their union is the part of `validity`
/// covered by at least one feeding trip.
pub fn partition_block_validity(
    arrivals: &[TripArrival],
    departure_time: u32,
    validity: &BitSet,
) -> Vec<(usize, BitSet)> {
    let mut remaining = validity.clone();
    let mut partition = Vec::new();
    for (index, arrival) in arrivals.iter().enumerate().rev() {
        if remaining.is_empty() {
            break;
        }
        if arrival.arrival_time > departure_time || remaining.is_disjoint(&arrival.valid_on_day) {
            continue;
        }
        let mut covered = remaining.clone();
        covered.intersect_with(&arrival.valid_on_day);
        remaining.difference_with(&covered);
        partition.push((index, covered));
    }
    partition
}

impl<'a> TransitNetworkBuilder<'a> {
    /// Link the arrival of the earlier trips of the block to the first
    /// departure of the trip being expanded, through a transfer node and a
    /// board edge counting no transfer.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn insert_inbound_block_transfers(
        &mut self,
        arrivals: &[TripArrival],
        descriptor: &TripDescriptor,
        departure_node: NodeId,
        departure_time: u32,
        stop_time: &StopTime,
        stop: &Stop,
        valid_on_day: &BitSet,
        zone_id: Tz,
        platform: &PlatformDescriptor,
    ) {
        for (index, validity) in partition_block_validity(arrivals, departure_time, valid_on_day) {
            let arrival = &arrivals[index];
            trace!(
                "in-seat transfer to trip {} at stop '{}'",
                descriptor,
                stop.id
            );
            let validity_id = self.storage.validity_patterns.intern_pattern(
                validity,
                zone_id,
                self.feed.start_date,
            );
            let transfer_node = self.writer.add_pt_node(stop.coord);
            let transfer = self.writer.add_pt_edge(
                arrival.arrival_node,
                transfer_node,
                PtEdge::new(EdgeType::Transfer)
                    .name(stop.name.as_str())
                    .time(departure_time - arrival.arrival_time),
            );
            self.storage
                .set_platform_descriptor(transfer, platform.clone());
            let board = self.writer.add_pt_edge(
                transfer_node,
                departure_node,
                PtEdge::new(EdgeType::Board)
                    .name(stop.name.as_str())
                    .validity(validity_id),
            );
            self.storage.set_stop_sequence(board, stop_time.sequence);
            self.storage.set_trip_descriptor(board, descriptor.clone());
        }
    }
}
