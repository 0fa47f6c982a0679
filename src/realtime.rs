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

//! Realtime patching of an already built network.
//!
//! A patch is built by a fresh [`TransitNetworkBuilder`] over the graph and
//! storage of the static network: the added or modified trips are expanded
//! with [`TransitNetworkBuilder::add_trip`], then their timelines are
//! spliced into the existing platforms. Patching only adds nodes and edges,
//! ids handed out before stay valid.

use crate::builder::TransitNetworkBuilder;
use crate::error::BuildError;
use crate::graph::{EdgeId, EdgeType, NodeId, PtEdge};
use crate::objects::Stop;
use crate::report::BuildReportCategory;
use crate::stop_wirer::{arrival_timeline_of, departure_timeline_of};
use crate::storage::TripDescriptor;
use crate::timeline::{PlatformDescriptor, Timeline, TimelineIndex};
use crate::validity::shift_validity;
use crate::{Result, DAY_IN_SECONDS};
use bit_set::BitSet;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

impl<'a> TransitNetworkBuilder<'a> {
    /// Wire the timelines collected by this builder into the network: slots
    /// of platforms that already exist are spliced into their timeline,
    /// other platforms are wired from scratch. Arrivals then get their
    /// outbound transfers.
    pub fn wire_up_additional_departures_and_arrivals(&mut self, zone_id: Tz) -> Result<()> {
        info!(
            "Wiring realtime departures and arrivals of feed '{}'",
            self.feed_id
        );
        let timelines = std::mem::take(&mut self.timelines);
        let wired = self.wire_up_or_patch(&timelines, zone_id);
        self.timelines = timelines;
        wired
    }

    fn wire_up_or_patch(&mut self, timelines: &TimelineIndex, zone_id: Tz) -> Result<()> {
        let feed = self.feed;
        for (stop_id, platforms) in timelines.departures() {
            let station_node = self.station_node(stop_id)?;
            let stop = feed.stop(stop_id)?;
            for (platform, timeline) in platforms {
                match self.storage.platform_node(platform, EdgeType::EnterPt)? {
                    Some(platform_enter_node) => {
                        self.patch_departure_timeline(zone_id, timeline, platform_enter_node)
                    }
                    None => {
                        let route_type = self.route_type_of(platform)?;
                        self.wire_up_departure_timeline(
                            station_node,
                            stop,
                            timeline,
                            route_type,
                            platform,
                        )?;
                    }
                }
            }
        }
        for (stop_id, platforms) in timelines.arrivals() {
            let station_node = self.station_node(stop_id)?;
            let stop = feed.stop(stop_id)?;
            for (platform, timeline) in platforms {
                match self.storage.platform_node(platform, EdgeType::ExitPt)? {
                    Some(platform_exit_node) => {
                        self.patch_arrival_timeline(zone_id, timeline, platform_exit_node)
                    }
                    None => {
                        let route_type = self.route_type_of(platform)?;
                        self.wire_up_arrival_timeline(
                            station_node,
                            stop,
                            timeline,
                            route_type,
                            platform,
                        )?;
                    }
                }
                self.insert_outbound_transfers_from(stop, platform, timeline);
            }
        }
        Ok(())
    }

    /// Splice new departure slots into the static timeline of a platform
    pub fn patch_departure_timeline(
        &mut self,
        zone_id: Tz,
        timeline: &Timeline,
        platform_enter_node: NodeId,
    ) {
        let static_timeline = departure_timeline_of(self.writer.graph(), platform_enter_node);
        let time_zone_id = self.time_zone_id(zone_id);
        for (time, node) in timeline.iter() {
            if let Some((previous_time, previous_node)) = static_timeline.previous_before(time) {
                self.writer.add_pt_edge(
                    previous_node,
                    node,
                    PtEdge::new(EdgeType::Wait).time(time - previous_time),
                );
            }
            if let Some((next_time, next_node)) = static_timeline.next_at_or_after(time) {
                self.writer.add_pt_edge(
                    node,
                    next_node,
                    PtEdge::new(EdgeType::Wait).time(next_time - time),
                );
            }
            self.writer.add_pt_edge(
                platform_enter_node,
                node,
                PtEdge::new(EdgeType::EnterTimeExpanded)
                    .time(time)
                    .validity(time_zone_id),
            );
        }
    }

    /// Splice new arrival slots into the static timeline of a platform
    pub fn patch_arrival_timeline(
        &mut self,
        zone_id: Tz,
        timeline: &Timeline,
        platform_exit_node: NodeId,
    ) {
        let static_timeline = arrival_timeline_of(self.writer.graph(), platform_exit_node);
        let time_zone_id = self.time_zone_id(zone_id);
        for (time, node) in timeline.iter() {
            if let Some((previous_time, previous_node)) = static_timeline.previous_before(time) {
                self.writer.add_pt_edge(
                    previous_node,
                    node,
                    PtEdge::new(EdgeType::WaitArrival).time(time - previous_time),
                );
            }
            if let Some((next_time, next_node)) = static_timeline.next_at_or_after(time) {
                self.writer.add_pt_edge(
                    node,
                    next_node,
                    PtEdge::new(EdgeType::WaitArrival).time(next_time - time),
                );
            }
            self.writer.add_pt_edge(
                node,
                platform_exit_node,
                PtEdge::new(EdgeType::LeaveTimeExpanded)
                    .time(time)
                    .validity(time_zone_id),
            );
        }
    }

    fn insert_outbound_transfers_from(
        &mut self,
        stop: &Stop,
        platform: &PlatformDescriptor,
        arrivals: &Timeline,
    ) {
        let transfers = self
            .transfer_rules
            .transfers_from_stop(&stop.id, Self::platform_route_id(platform));
        if !transfers.iter().any(|t| t.to_stop_id == stop.id) {
            self.insert_outbound_transfers(&stop.id, None, 0, arrivals);
        }
        for transfer in transfers {
            self.insert_outbound_transfers(
                &transfer.to_stop_id,
                transfer.to_route_id.as_deref(),
                transfer.min_transfer_time.unwrap_or(0),
                arrivals,
            );
        }
    }

    /// Link new arrival slots to the first reachable departure of the
    /// platforms of `to_stop_id` serving `to_route_id`, or any route when
    /// `None`. Returns the number of transfer edges added.
    pub fn insert_outbound_transfers(
        &mut self,
        to_stop_id: &str,
        to_route_id: Option<&str>,
        min_transfer_time: u32,
        arrivals: &Timeline,
    ) -> usize {
        let Some(station_node) = self.storage.stations.station_node(&self.feed_id, to_stop_id)
        else {
            warn!("transfer towards stop '{}' without station", to_stop_id);
            self.report.add_warning(
                format!("stop '{}' has no station", to_stop_id),
                BuildReportCategory::TransferOnUnknownStop,
            );
            return 0;
        };
        let departure_platforms: Vec<(NodeId, PlatformDescriptor)> = self
            .writer
            .graph()
            .out_edges(station_node)
            .filter(|(_, e)| e.edge_type == EdgeType::EnterPt)
            .filter_map(|(id, e)| {
                self.storage
                    .platform_descriptor(id)
                    .filter(|p| p.feed_id() == self.feed_id)
                    .map(|p| (e.adj_node, p.clone()))
            })
            .collect();
        let mut added = 0;
        for (platform_enter_node, to_platform) in departure_platforms {
            let serves_route = match (to_route_id, &to_platform) {
                (None, _) | (_, PlatformDescriptor::RouteType { .. }) => true,
                (Some(to_route_id), PlatformDescriptor::Route { .. }) => {
                    to_platform == PlatformDescriptor::route(&self.feed_id, to_stop_id, to_route_id)
                }
            };
            if !serves_route {
                continue;
            }
            let departures = departure_timeline_of(self.writer.graph(), platform_enter_node);
            for (arrival_time, arrival_node) in arrivals.iter() {
                if let Some((departure_time, departure_node)) =
                    departures.next_at_or_after(arrival_time.saturating_add(min_transfer_time))
                {
                    let edge = self.writer.add_pt_edge(
                        arrival_node,
                        departure_node,
                        PtEdge::new(EdgeType::Transfer).time(departure_time - arrival_time),
                    );
                    self.storage.set_platform_descriptor(edge, to_platform.clone());
                    added += 1;
                }
            }
        }
        debug!("{} outbound transfers towards '{}'", added, to_stop_id);
        added
    }

    /// Add a board edge for a trip leaving late from one of its stops.
    ///
    /// The departure slot is taken on the route platform of the stop, and
    /// the validity is shifted when `departure_time` is past midnight.
    #[allow(clippy::too_many_arguments)]
    pub fn add_delayed_board_edge(
        &mut self,
        zone_id: Tz,
        trip: &TripDescriptor,
        stop_sequence: u32,
        departure_time: u32,
        departure_node: NodeId,
        valid_on_day: &BitSet,
    ) -> Result<EdgeId> {
        let feed = self.feed;
        let scheduled_trip = feed
            .trips
            .get(&trip.trip_id)
            .ok_or_else(|| BuildError::UnknownTrip(trip.trip_id.clone()))?;
        let stop_time = scheduled_trip
            .stop_times
            .iter()
            .find(|st| st.sequence == stop_sequence)
            .ok_or_else(|| BuildError::UnknownStopSequence {
                trip_id: trip.trip_id.clone(),
                sequence: stop_sequence,
            })?;
        let stop = feed.stop(&stop_time.stop_id)?;
        let platform =
            PlatformDescriptor::route(&self.feed_id, &stop_time.stop_id, &scheduled_trip.route_id);
        let departure_timeline_node = self
            .timelines
            .departure_timeline_mut(&platform)
            .get_or_insert_with(departure_time, || self.writer.add_pt_node(stop.coord));
        let validity = shift_validity(valid_on_day, departure_time / DAY_IN_SECONDS);
        let validity_id =
            self.storage
                .validity_patterns
                .intern_pattern(validity, zone_id, feed.start_date);
        let board = self.writer.add_pt_edge(
            departure_timeline_node,
            departure_node,
            PtEdge::new(EdgeType::Board)
                .name(feed.route_name(scheduled_trip))
                .validity(validity_id)
                .transfers(1),
        );
        self.storage.set_stop_sequence(board, stop_sequence);
        self.storage.set_trip_descriptor(board, trip.clone());
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_transfers::TripArrival;
    use crate::configuration::BuildConfiguration;
    use crate::feed::Feed;
    use crate::feed_builder::FeedBuilder;
    use crate::graph::{Edge, Graph};
    use crate::objects::{Coord, Date, StopTime, Time, Trip};
    use crate::storage::TransitStorage;
    use crate::street::LocationIndex;
    use crate::trip_expander::TripWithStopTimes;
    use pretty_assertions::assert_eq;

    struct NoStreet;

    impl LocationIndex for NoStreet {
        fn find_closest(&self, _: &Coord) -> Option<NodeId> {
            None
        }
    }

    fn feed() -> Feed {
        FeedBuilder::default()
            .trip("t1", |t| {
                t.st("A", "10:00:00", "10:00:00")
                    .st("B", "10:10:00", "10:10:00");
            })
            .trip("t2", |t| {
                t.st("A", "10:30:00", "10:30:00")
                    .st("B", "10:40:00", "10:40:00");
            })
            .build()
    }

    fn static_network(feed: &Feed) -> (Graph, TransitStorage) {
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        let mut builder =
            TransitNetworkBuilder::new(feed, &mut graph, &mut storage, BuildConfiguration::default());
        builder.connect_stops_to_street_network(&NoStreet).unwrap();
        builder.build_pt_network().unwrap();
        (graph, storage)
    }

    fn snapshot(graph: &Graph) -> Vec<Edge> {
        graph.edges().map(|(_, e)| e.clone()).collect()
    }

    #[test]
    fn extra_trip_is_spliced_into_existing_timelines() {
        let feed = feed();
        let (mut graph, mut storage) = static_network(&feed);
        let edges_before = snapshot(&graph);
        let nodes_before = graph.node_count();

        let mut extra = feed.trips.get("t1").unwrap().clone();
        extra.id = "t1-extra".into();
        let mut trip = TripWithStopTimes::new(&extra, feed.validity("default_service").unwrap());
        trip.stop_times = vec![
            StopTime {
                stop_id: "A".into(),
                sequence: 0,
                arrival_time: Time::new(10, 15, 0),
                departure_time: Time::new(10, 15, 0),
            },
            StopTime {
                stop_id: "B".into(),
                sequence: 1,
                arrival_time: Time::new(10, 25, 0),
                departure_time: Time::new(10, 25, 0),
            },
        ];
        {
            let mut builder = TransitNetworkBuilder::new(
                &feed,
                &mut graph,
                &mut storage,
                BuildConfiguration::default(),
            );
            let mut arrivals: Vec<TripArrival> = Vec::new();
            builder
                .add_trip(
                    chrono_tz::Tz::Europe__Paris,
                    0,
                    &mut arrivals,
                    &trip,
                    TripDescriptor::new("t1-extra", "default_route"),
                )
                .unwrap();
            builder
                .wire_up_additional_departures_and_arrivals(chrono_tz::Tz::Europe__Paris)
                .unwrap();
        }

        // existing edges are untouched and no node id was reused
        assert_eq!(edges_before, snapshot(&graph)[..edges_before.len()].to_vec());
        let new_edges = &snapshot(&graph)[edges_before.len()..];
        assert!(new_edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Board || e.edge_type == EdgeType::Hop)
            .all(|e| e.base_node >= nodes_before));
        assert!(!new_edges.iter().any(|e| e.edge_type == EdgeType::EnterPt));

        // 10:15 at A sits between 10:00 and 10:30
        let platform = PlatformDescriptor::route_type("gtfs_0", "A", 3);
        let enter = storage
            .platform_node(&platform, EdgeType::EnterPt)
            .unwrap()
            .unwrap();
        let departures = departure_timeline_of(&graph, enter);
        assert_eq!(3, departures.len());
        let new_slot = departures.get(36900).unwrap();
        assert!(new_slot >= nodes_before);
        let waits: Vec<(NodeId, NodeId, u32)> = graph
            .edges()
            .map(|(_, e)| e)
            .filter(|e| e.edge_type == EdgeType::Wait && (e.base_node == new_slot || e.adj_node == new_slot))
            .map(|e| (e.base_node, e.adj_node, e.time))
            .collect();
        assert_eq!(
            vec![
                (departures.get(36000).unwrap(), new_slot, 900),
                (new_slot, departures.get(37800).unwrap(), 900),
            ],
            waits
        );
        assert!(storage
            .board_edge(&TripDescriptor::new("t1-extra", "default_route"), 0)
            .is_some());
    }

    #[test]
    fn new_platform_is_wired_from_scratch() {
        let feed = FeedBuilder::from(feed())
            .route("r2", |r| r.route_type = 0)
            .build();
        let (mut graph, mut storage) = static_network(&feed);
        let trip = Trip {
            id: "tram".into(),
            route_id: "r2".into(),
            service_id: "default_service".into(),
            ..Default::default()
        };
        let mut trip = TripWithStopTimes::new(&trip, feed.validity("default_service").unwrap());
        trip.stop_times = vec![
            StopTime {
                stop_id: "A".into(),
                sequence: 0,
                arrival_time: Time::new(11, 0, 0),
                departure_time: Time::new(11, 0, 0),
            },
            StopTime {
                stop_id: "B".into(),
                sequence: 1,
                arrival_time: Time::new(11, 5, 0),
                departure_time: Time::new(11, 5, 0),
            },
        ];
        let mut builder =
            TransitNetworkBuilder::new(&feed, &mut graph, &mut storage, BuildConfiguration::default());
        builder
            .add_trip(
                chrono_tz::Tz::Europe__Paris,
                0,
                &mut Vec::new(),
                &trip,
                TripDescriptor::new("tram", "r2"),
            )
            .unwrap();
        builder
            .wire_up_additional_departures_and_arrivals(chrono_tz::Tz::Europe__Paris)
            .unwrap();
        drop(builder);

        let tram_platform = PlatformDescriptor::route_type("gtfs_0", "A", 0);
        let enter = storage
            .platform_node(&tram_platform, EdgeType::EnterPt)
            .unwrap()
            .unwrap();
        let (_, enter_edge) = graph
            .in_edges(enter)
            .find(|(_, e)| e.edge_type == EdgeType::EnterPt)
            .unwrap();
        assert_eq!(0, enter_edge.validity);
        assert!(storage
            .platform_node(&tram_platform, EdgeType::ExitPt)
            .unwrap()
            .is_some());
    }

    #[test]
    fn new_arrivals_get_outbound_transfers() {
        let feed = feed();
        let (mut graph, mut storage) = static_network(&feed);
        let b = feed.stop("B").unwrap().coord;
        let mut builder =
            TransitNetworkBuilder::new(&feed, &mut graph, &mut storage, BuildConfiguration::default());
        let arrival_node = builder.writer.add_pt_node(b);
        let arrivals: Timeline = vec![(38400, arrival_node)].into_iter().collect();
        // 10:40 at B, the last departure of the day from B is 10:40
        assert_eq!(1, builder.insert_outbound_transfers("B", None, 0, &arrivals));
        assert_eq!(0, builder.insert_outbound_transfers("B", None, 60, &arrivals));
        assert_eq!(
            0,
            builder.insert_outbound_transfers("B", None, u32::MAX, &arrivals)
        );
        assert_eq!(0, builder.insert_outbound_transfers("Z", None, 0, &arrivals));
        assert_eq!(
            1,
            builder
                .report()
                .warning_count(&BuildReportCategory::TransferOnUnknownStop)
        );
    }

    #[test]
    fn delayed_departure_gets_its_own_board_edge() {
        let feed = feed();
        let (mut graph, mut storage) = static_network(&feed);
        let start = Date::from_ymd_opt(2019, 1, 1).unwrap();
        let valid_on_day: BitSet = vec![0].into_iter().collect();
        let board = {
            let mut builder = TransitNetworkBuilder::new(
                &feed,
                &mut graph,
                &mut storage,
                BuildConfiguration::default(),
            );
            let a = feed.stop("A").unwrap().coord;
            let departure_node = builder.writer.add_pt_node(a);
            let trip = TripDescriptor::new("t1", "default_route");
            let board = builder
                .add_delayed_board_edge(
                    chrono_tz::Tz::Europe__Paris,
                    &trip,
                    0,
                    DAY_IN_SECONDS + 300,
                    departure_node,
                    &valid_on_day,
                )
                .unwrap();
            let error = builder
                .add_delayed_board_edge(
                    chrono_tz::Tz::Europe__Paris,
                    &trip,
                    7,
                    300,
                    departure_node,
                    &valid_on_day,
                )
                .unwrap_err();
            assert_eq!(
                Some(&BuildError::UnknownStopSequence {
                    trip_id: "t1".into(),
                    sequence: 7
                }),
                error.downcast_ref::<BuildError>()
            );
            board
        };
        let edge = graph.edge(board).unwrap();
        assert_eq!(EdgeType::Board, edge.edge_type);
        assert_eq!(1, edge.transfers);
        assert!(!storage.is_valid_on(edge.validity, start));
        assert!(storage.is_valid_on(edge.validity, start.succ_opt().unwrap()));
        assert_eq!(Some(0), storage.stop_sequence(board));
    }

    #[test]
    fn platform_lookup_rejects_other_edge_types() {
        let feed = feed();
        let (_, storage) = static_network(&feed);
        let platform = PlatformDescriptor::route_type("gtfs_0", "A", 3);
        assert_eq!(
            Err(BuildError::UnsupportedEdgeType(EdgeType::Transfer)),
            storage.platform_node(&platform, EdgeType::Transfer)
        );
    }
}
