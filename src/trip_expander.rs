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

//! Expansion of trips into hop, dwell, board and alight edges.
//!
//! Trips are grouped by block; a block without frequencies is expanded once,
//! a frequency-based block once per departure of its frequency windows.

use crate::block_transfers::TripArrival;
use crate::builder::TransitNetworkBuilder;
use crate::error::BuildError;
use crate::graph::{EdgeId, EdgeType, PtEdge};
use crate::objects::{StopTime, Time, Trip};
use crate::report::BuildReportCategory;
use crate::storage::{record_at, TripDescriptor, MAX_STOP_SEQUENCE};
use crate::timeline::PlatformDescriptor;
use crate::validity::shift_validity;
use crate::{Result, DAY_IN_SECONDS};
use bit_set::BitSet;
use chrono_tz::Tz;
use skip_error::skip_error_and_warn;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// A trip with the stop times and days it is expanded with
#[derive(Debug, Clone)]
pub struct TripWithStopTimes<'t> {
    /// The trip
    pub trip: &'t Trip,
    /// Stop times, sorted by sequence
    pub stop_times: Vec<StopTime>,
    /// Service days, bit 0 being the first day of the feed
    pub valid_on_day: BitSet,
    /// Stop sequences where nobody can alight
    pub cancelled_arrivals: BTreeSet<u32>,
    /// Stop sequences where nobody can board
    pub cancelled_departures: BTreeSet<u32>,
}

impl<'t> TripWithStopTimes<'t> {
    /// The trip as scheduled, on `valid_on_day`
    pub fn new(trip: &'t Trip, valid_on_day: BitSet) -> Self {
        TripWithStopTimes {
            trip,
            stop_times: trip.stop_times.clone(),
            valid_on_day,
            cancelled_arrivals: BTreeSet::new(),
            cancelled_departures: BTreeSet::new(),
        }
    }

    fn first_departure(&self) -> Option<Time> {
        self.stop_times.first().map(|st| st.departure_time)
    }

    fn check_stop_sequences(&self) -> Result<()> {
        match self.stop_times.iter().map(|st| st.sequence).max() {
            Some(sequence) if sequence > MAX_STOP_SEQUENCE => {
                Err(BuildError::StopSequenceOutOfRange {
                    trip_id: self.trip.id.clone(),
                    sequence,
                    max: MAX_STOP_SEQUENCE,
                }
                .into())
            }
            _ => Ok(()),
        }
    }
}

fn block_key(trip: &Trip) -> String {
    match &trip.block_id {
        Some(block_id) => block_id.clone(),
        None => format!("non-block-trip{}", trip.id),
    }
}

impl<'a> TransitNetworkBuilder<'a> {
    pub(crate) fn create_trips(&mut self) -> Result<()> {
        let feed = self.feed;
        let mut blocks: BTreeMap<String, Vec<&Trip>> = BTreeMap::new();
        for trip in feed.trips.values() {
            blocks.entry(block_key(trip)).or_default().push(trip);
        }
        debug!("{} trips grouped in {} blocks", feed.trips.len(), blocks.len());
        for (block_id, trips) in blocks {
            let mut block = Vec::with_capacity(trips.len());
            for trip in trips {
                if trip.stop_times.is_empty() {
                    warn!("trip '{}' has no stop time, it is ignored", trip.id);
                    self.report.add_warning(
                        format!("trip '{}' has no stop time", trip.id),
                        BuildReportCategory::TripWithoutStopTimes,
                    );
                    continue;
                }
                let valid_on_day = skip_error_and_warn!(feed.validity(&trip.service_id));
                let trip = TripWithStopTimes::new(trip, valid_on_day);
                if let Err(error) = trip.check_stop_sequences() {
                    warn!("{}, the trip is ignored", error);
                    self.report.add_warning(
                        error.to_string(),
                        BuildReportCategory::StopSequenceOutOfRange,
                    );
                    continue;
                }
                block.push(trip);
            }
            if block.is_empty() {
                continue;
            }
            block.sort_by_key(|trip| trip.first_departure());
            self.expand_block(&block_id, &block)?;
        }
        Ok(())
    }

    fn expand_block(&mut self, block_id: &str, block: &[TripWithStopTimes]) -> Result<()> {
        let feed = self.feed;
        let frequency_sets: BTreeSet<Vec<(Time, Time, u32)>> = block
            .iter()
            .map(|trip| {
                feed.frequencies_of(&trip.trip.id)
                    .into_iter()
                    .map(|f| (f.start_time, f.end_time, f.headway_secs))
                    .collect()
            })
            .collect();
        if frequency_sets.len() > 1 {
            return Err(BuildError::FrequencyBasedBlock {
                block_id: block_id.to_owned(),
            }
            .into());
        }
        let first_trip = block[0].trip;
        let zone_id = feed.zone_id(&first_trip.route_id)?;
        let frequencies = feed.frequencies_of(&first_trip.id);
        if frequencies.is_empty() {
            return self.add_trips(zone_id, block, 0, false);
        }
        for frequency in frequencies {
            if frequency.headway_secs == 0 {
                return Err(BuildError::ZeroHeadway {
                    trip_id: first_trip.id.clone(),
                }
                .into());
            }
            let end_time = frequency.end_time.total_seconds();
            let mut time = frequency.start_time.total_seconds();
            while time < end_time {
                self.add_trips(zone_id, block, time, true)?;
                time += frequency.headway_secs;
            }
        }
        Ok(())
    }

    /// Expand the trips of a block once, `time` seconds after their schedule
    fn add_trips(
        &mut self,
        zone_id: Tz,
        block: &[TripWithStopTimes],
        time: u32,
        frequency_based: bool,
    ) -> Result<()> {
        let mut arrivals = Vec::new();
        for trip in block {
            let mut descriptor = TripDescriptor::new(&trip.trip.id, &trip.trip.route_id);
            if frequency_based {
                descriptor = descriptor.with_start_time(Time::from_seconds(time));
            }
            self.add_trip(zone_id, time, &mut arrivals, trip, descriptor)?;
        }
        Ok(())
    }

    /// Expand one trip, `time` seconds after its schedule.
    ///
    /// `arrivals` holds the arrivals of the trips of the same block expanded
    /// before this one, for in-seat transfers; the arrival of this trip is
    /// appended to it.
    pub fn add_trip(
        &mut self,
        zone_id: Tz,
        time: u32,
        arrivals: &mut Vec<TripArrival>,
        trip: &TripWithStopTimes,
        descriptor: TripDescriptor,
    ) -> Result<()> {
        trip.check_stop_sequences()?;
        let feed = self.feed;
        let route_name = feed.route_name(trip.trip);
        let route_type = feed.route_type(&trip.trip.route_id)?;
        let mut board_edges: Vec<Option<EdgeId>> = Vec::new();
        let mut alight_edges: Vec<Option<EdgeId>> = Vec::new();
        let mut previous: Option<(&StopTime, u32)> = None;
        let mut last_arrival = None;
        for stop_time in &trip.stop_times {
            let stop = feed.stop(&stop_time.stop_id)?;
            let arrival_time = stop_time.arrival_time.total_seconds().saturating_add(time);
            let departure_time = stop_time.departure_time.total_seconds().saturating_add(time);

            let arrival_node = self.writer.add_pt_node(stop.coord);
            if let Some((previous_stop_time, previous_departure_node)) = previous {
                let hop = self.writer.add_pt_edge(
                    previous_departure_node,
                    arrival_node,
                    PtEdge::new(EdgeType::Hop).name(stop.name.as_str()).time(
                        stop_time
                            .arrival_time
                            .total_seconds()
                            .saturating_sub(previous_stop_time.departure_time.total_seconds()),
                    ),
                );
                self.storage.set_stop_sequence(hop, stop_time.sequence);
            }

            let platform = if self
                .transfer_rules
                .has_no_route_specific_departure_transfer_rules(&stop_time.stop_id)
            {
                PlatformDescriptor::route_type(&self.feed_id, &stop_time.stop_id, route_type)
            } else {
                PlatformDescriptor::route(&self.feed_id, &stop_time.stop_id, &trip.trip.route_id)
            };
            let departure_timeline_node = self
                .timelines
                .departure_timeline_mut(&platform)
                .get_or_insert_with(departure_time, || self.writer.add_pt_node(stop.coord));
            let arrival_timeline_node = self
                .timelines
                .arrival_timeline_mut(&platform)
                .get_or_insert_with(arrival_time, || self.writer.add_pt_node(stop.coord));

            let departure_node = self.writer.add_pt_node(stop.coord);
            let day_shift = stop_time.departure_time.total_seconds() / DAY_IN_SECONDS;
            let valid_on_day = shift_validity(&trip.valid_on_day, day_shift);
            let validity_id = self.storage.validity_patterns.intern_pattern(
                valid_on_day.clone(),
                zone_id,
                feed.start_date,
            );

            if !trip.cancelled_departures.contains(&stop_time.sequence) {
                let board = self.writer.add_pt_edge(
                    departure_timeline_node,
                    departure_node,
                    PtEdge::new(EdgeType::Board)
                        .name(route_name.as_str())
                        .validity(validity_id)
                        .transfers(1),
                );
                record_at(&mut board_edges, stop_time.sequence, board);
                self.storage.set_stop_sequence(board, stop_time.sequence);
                self.storage.set_trip_descriptor(board, descriptor.clone());
            }
            if !trip.cancelled_arrivals.contains(&stop_time.sequence) {
                let alight = self.writer.add_pt_edge(
                    arrival_node,
                    arrival_timeline_node,
                    PtEdge::new(EdgeType::Alight)
                        .name(route_name.as_str())
                        .validity(validity_id),
                );
                record_at(&mut alight_edges, stop_time.sequence, alight);
                self.storage.set_stop_sequence(alight, stop_time.sequence);
                self.storage.set_trip_descriptor(alight, descriptor.clone());
            }
            self.writer.add_pt_edge(
                arrival_node,
                departure_node,
                PtEdge::new(EdgeType::Dwell).name(route_name.as_str()).time(
                    stop_time
                        .departure_time
                        .total_seconds()
                        .saturating_sub(stop_time.arrival_time.total_seconds()),
                ),
            );

            if previous.is_none() {
                self.insert_inbound_block_transfers(
                    arrivals,
                    &descriptor,
                    departure_node,
                    departure_time,
                    stop_time,
                    stop,
                    &valid_on_day,
                    zone_id,
                    &platform,
                );
            }
            previous = Some((stop_time, departure_node));
            last_arrival = Some((arrival_node, arrival_time));
        }
        self.storage
            .set_trip_edges(descriptor, board_edges, alight_edges);
        if let Some((arrival_node, arrival_time)) = last_arrival {
            arrivals.push(TripArrival {
                valid_on_day: trip.valid_on_day.clone(),
                arrival_node,
                arrival_time,
            });
        }
        Ok(())
    }
}
