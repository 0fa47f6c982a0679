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

//! Wiring of the timelines to their station, and transfers between platforms.
//!
//! A departure platform is entered from the station (`EnterPt`) and leads to
//! each of its timeline slots (`EnterTimeExpanded`); slots are chained by
//! `Wait` edges and the last one loops back to the first one (`Overnight`).
//! Arrival platforms mirror this with `ExitPt`, `LeaveTimeExpanded` and
//! `WaitArrival`.

use crate::builder::TransitNetworkBuilder;
use crate::graph::{EdgeType, Graph, NodeId, PtEdge, PtGraphWriter};
use crate::objects::{Stop, Transfer};
use crate::report::BuildReportCategory;
use crate::storage::TransitStorage;
use crate::timeline::{PlatformDescriptor, Timeline, TimelineIndex};
use crate::{Result, DAY_IN_SECONDS};
use tracing::{debug, warn};

/// Departure slots reached from a departure platform node
pub(crate) fn departure_timeline_of(graph: &Graph, platform_enter_node: NodeId) -> Timeline {
    graph
        .out_edges(platform_enter_node)
        .filter(|(_, e)| e.edge_type == EdgeType::EnterTimeExpanded)
        .map(|(_, e)| (e.time, e.adj_node))
        .collect()
}

/// Arrival slots leading to an arrival platform node
pub(crate) fn arrival_timeline_of(graph: &Graph, platform_exit_node: NodeId) -> Timeline {
    graph
        .in_edges(platform_exit_node)
        .filter(|(_, e)| e.edge_type == EdgeType::LeaveTimeExpanded)
        .map(|(_, e)| (e.time, e.base_node))
        .collect()
}

/// Link every arrival slot of an arrival platform to the first departure
/// slot of `departure_timeline` reachable after `min_transfer_time`.
/// Returns the number of transfer edges added.
fn link_arrivals_to_departures(
    writer: &mut PtGraphWriter,
    storage: &mut TransitStorage,
    arrival_platform_node: NodeId,
    min_transfer_time: u32,
    departure_timeline: &Timeline,
    departure_platform: &PlatformDescriptor,
) -> usize {
    let arrivals = arrival_timeline_of(writer.graph(), arrival_platform_node);
    let mut added = 0;
    for (arrival_time, arrival_node) in arrivals.iter() {
        if let Some((departure_time, departure_node)) =
            departure_timeline.next_at_or_after(arrival_time.saturating_add(min_transfer_time))
        {
            let edge = writer.add_pt_edge(
                arrival_node,
                departure_node,
                PtEdge::new(EdgeType::Transfer).time(departure_time - arrival_time),
            );
            storage.set_platform_descriptor(edge, departure_platform.clone());
            added += 1;
        }
    }
    added
}

impl<'a> TransitNetworkBuilder<'a> {
    pub(crate) fn wire_up_stops(&mut self) -> Result<()> {
        let timelines = std::mem::take(&mut self.timelines);
        let wired = self.wire_up_timelines(&timelines);
        self.timelines = timelines;
        wired
    }

    fn wire_up_timelines(&mut self, timelines: &TimelineIndex) -> Result<()> {
        let feed = self.feed;
        for (stop_id, platforms) in timelines.arrivals() {
            let station_node = self.station_node(stop_id)?;
            let stop = feed.stop(stop_id)?;
            for (platform, timeline) in platforms {
                let route_type = self.route_type_of(platform)?;
                self.wire_up_arrival_timeline(station_node, stop, timeline, route_type, platform)?;
            }
        }
        for (stop_id, platforms) in timelines.departures() {
            let station_node = self.station_node(stop_id)?;
            let stop = feed.stop(stop_id)?;
            for (platform, timeline) in platforms {
                let route_type = self.route_type_of(platform)?;
                self.wire_up_departure_timeline(station_node, stop, timeline, route_type, platform)?;
            }
        }
        Ok(())
    }

    /// Create the departure platform of `timeline` and link it to the
    /// station and to every slot. Returns the platform node.
    pub(crate) fn wire_up_departure_timeline(
        &mut self,
        station_node: NodeId,
        stop: &Stop,
        timeline: &Timeline,
        route_type: u16,
        platform: &PlatformDescriptor,
    ) -> Result<NodeId> {
        debug!("wiring departure platform {}", platform);
        let feed = self.feed;
        let platform_enter_node = self.writer.add_pt_node(stop.coord);
        let enter_edge = self.writer.add_pt_edge(
            station_node,
            platform_enter_node,
            PtEdge::new(EdgeType::EnterPt)
                .name(stop.name.as_str())
                .validity(u32::from(route_type)),
        );
        self.storage
            .set_platform_descriptor(enter_edge, platform.clone());
        self.storage
            .register_platform_node(platform.clone(), EdgeType::EnterPt, platform_enter_node)?;

        let time_zone_id = self.time_zone_id(feed.default_zone_id()?);
        let mut later: Option<(u32, NodeId)> = None;
        for (time, node) in timeline.iter().rev() {
            self.writer.add_pt_edge(
                platform_enter_node,
                node,
                PtEdge::new(EdgeType::EnterTimeExpanded)
                    .name(stop.name.as_str())
                    .time(time)
                    .validity(time_zone_id),
            );
            if let Some((later_time, later_node)) = later {
                self.writer.add_pt_edge(
                    node,
                    later_node,
                    PtEdge::new(EdgeType::Wait)
                        .name(stop.name.as_str())
                        .time(later_time - time),
                );
            }
            later = Some((time, node));
        }
        self.add_overnight_edge(timeline, stop);
        Ok(platform_enter_node)
    }

    /// Create the arrival platform of `timeline` and link every slot to it
    /// and it to the station. Returns the platform node.
    pub(crate) fn wire_up_arrival_timeline(
        &mut self,
        station_node: NodeId,
        stop: &Stop,
        timeline: &Timeline,
        route_type: u16,
        platform: &PlatformDescriptor,
    ) -> Result<NodeId> {
        debug!("wiring arrival platform {}", platform);
        let feed = self.feed;
        let platform_exit_node = self.writer.add_pt_node(stop.coord);
        let exit_edge = self.writer.add_pt_edge(
            platform_exit_node,
            station_node,
            PtEdge::new(EdgeType::ExitPt)
                .name(stop.name.as_str())
                .validity(u32::from(route_type)),
        );
        self.storage
            .set_platform_descriptor(exit_edge, platform.clone());
        self.storage
            .register_platform_node(platform.clone(), EdgeType::ExitPt, platform_exit_node)?;

        let time_zone_id = self.time_zone_id(feed.default_zone_id()?);
        let mut later: Option<(u32, NodeId)> = None;
        for (time, node) in timeline.iter().rev() {
            self.writer.add_pt_edge(
                node,
                platform_exit_node,
                PtEdge::new(EdgeType::LeaveTimeExpanded)
                    .name(stop.name.as_str())
                    .time(time)
                    .validity(time_zone_id),
            );
            if let Some((later_time, later_node)) = later {
                self.writer.add_pt_edge(
                    node,
                    later_node,
                    PtEdge::new(EdgeType::WaitArrival)
                        .name(stop.name.as_str())
                        .time(later_time - time),
                );
            }
            later = Some((time, node));
        }
        self.add_overnight_edge(timeline, stop);
        Ok(platform_exit_node)
    }

    /// Link the last slot of the day to the first one. A single slot loops
    /// on itself for a whole day.
    fn add_overnight_edge(&mut self, timeline: &Timeline, stop: &Stop) {
        if let (Some((first_time, first_node)), Some((last_time, last_node))) =
            (timeline.first(), timeline.last())
        {
            self.writer.add_pt_edge(
                last_node,
                first_node,
                PtEdge::new(EdgeType::Overnight)
                    .name(stop.name.as_str())
                    .time(DAY_IN_SECONDS - last_time + first_time),
            );
        }
    }

    pub(crate) fn insert_transfers(&mut self) -> Result<()> {
        let timelines = std::mem::take(&mut self.timelines);
        for platforms in timelines.departures().values() {
            for (platform, timeline) in platforms {
                self.insert_inbound_transfers(platform, timeline);
            }
        }
        self.timelines = timelines;
        Ok(())
    }

    /// Insert the transfers towards the departures of `to_platform`, from
    /// the arrival platforms matching each transfer rule
    fn insert_inbound_transfers(&mut self, to_platform: &PlatformDescriptor, departures: &Timeline) {
        let to_route_id = Self::platform_route_id(to_platform);
        for transfer in self
            .transfer_rules
            .transfers_to_stop(to_platform.stop_id(), to_route_id)
        {
            let Some(station_node) = self
                .storage
                .stations
                .station_node(&self.feed_id, &transfer.from_stop_id)
            else {
                warn!(
                    "transfer from '{}' to '{}': stop '{}' has no station",
                    transfer.from_stop_id,
                    transfer.to_stop_id,
                    transfer.from_stop_id
                );
                self.report.add_warning(
                    format!("stop '{}' has no station", transfer.from_stop_id),
                    BuildReportCategory::TransferOnUnknownStop,
                );
                continue;
            };
            let arrival_platforms = self.arrival_platforms_at_station(station_node);
            let mut matched = false;
            for (arrival_platform_node, from_platform) in arrival_platforms {
                if self.leaves_from(&transfer, &from_platform) {
                    matched = true;
                    link_arrivals_to_departures(
                        &mut self.writer,
                        self.storage,
                        arrival_platform_node,
                        transfer.min_transfer_time.unwrap_or(0),
                        departures,
                        to_platform,
                    );
                }
            }
            if !matched && transfer.from_stop_id != transfer.to_stop_id {
                debug!(
                    "no arrival platform at '{}' for the transfer towards {}",
                    transfer.from_stop_id, to_platform
                );
                self.report.add_warning(
                    format!(
                        "no arrival platform at '{}' towards '{}'",
                        transfer.from_stop_id, transfer.to_stop_id
                    ),
                    BuildReportCategory::TransferFromMissingPlatform,
                );
            }
        }
    }

    /// Arrival platforms exiting into a station node, with their descriptor
    fn arrival_platforms_at_station(&self, station_node: NodeId) -> Vec<(NodeId, PlatformDescriptor)> {
        self.writer
            .graph()
            .in_edges(station_node)
            .filter(|(_, e)| e.edge_type == EdgeType::ExitPt)
            .filter_map(|(id, e)| {
                self.storage
                    .platform_descriptor(id)
                    .filter(|p| p.feed_id() == self.feed_id)
                    .map(|p| (e.base_node, p.clone()))
            })
            .collect()
    }

    /// Whether a transfer rule applies to arrivals on `from_platform`
    fn leaves_from(&self, transfer: &Transfer, from_platform: &PlatformDescriptor) -> bool {
        let same_stop = self.configuration.create_transfer_stops_connect_same_street_node
            || from_platform.stop_id() == transfer.from_stop_id;
        let same_route = match (&transfer.from_route_id, from_platform) {
            (None, PlatformDescriptor::RouteType { .. }) => true,
            (Some(from_route_id), PlatformDescriptor::Route { .. }) => {
                *from_platform
                    == PlatformDescriptor::route(
                        &self.feed_id,
                        &transfer.from_stop_id,
                        from_route_id,
                    )
            }
            _ => false,
        };
        same_stop && same_route
    }

    /// Link the arrival slots of an arrival platform to the departure slots
    /// of `departure_platform`, waiting at least `min_transfer_time`.
    /// Returns the number of transfer edges added.
    pub fn insert_transfer_edges(
        &mut self,
        arrival_platform_node: NodeId,
        min_transfer_time: u32,
        departure_platform: &PlatformDescriptor,
    ) -> usize {
        match self.timelines.departure_timeline(departure_platform) {
            Some(departures) => link_arrivals_to_departures(
                &mut self.writer,
                self.storage,
                arrival_platform_node,
                min_transfer_time,
                departures,
                departure_platform,
            ),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::BuildConfiguration;
    use crate::feed::Feed;
    use crate::feed_builder::FeedBuilder;
    use crate::objects::Coord;
    use crate::street::LocationIndex;
    use pretty_assertions::assert_eq;

    struct NoStreet;

    impl LocationIndex for NoStreet {
        fn find_closest(&self, _: &Coord) -> Option<NodeId> {
            None
        }
    }

    fn build(feed: &Feed, graph: &mut Graph, storage: &mut TransitStorage) {
        let mut builder =
            TransitNetworkBuilder::new(feed, graph, storage, BuildConfiguration::default());
        builder.connect_stops_to_street_network(&NoStreet).unwrap();
        builder.build_pt_network().unwrap();
    }

    fn edges_of_type(graph: &Graph, edge_type: EdgeType) -> Vec<&crate::graph::Edge> {
        graph
            .edges()
            .map(|(_, e)| e)
            .filter(|e| e.edge_type == edge_type)
            .collect()
    }

    #[test]
    fn overnight_edge_wraps_around_midnight() {
        let feed = FeedBuilder::default()
            .trip("t1", |t| {
                t.st("A", "23:50:00", "23:50:00")
                    .st("B", "23:55:00", "23:55:00");
            })
            .trip("t2", |t| {
                t.st("A", "00:10:00", "00:10:00")
                    .st("B", "00:15:00", "00:15:00");
            })
            .build();
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        build(&feed, &mut graph, &mut storage);

        let platform = PlatformDescriptor::route_type("gtfs_0", "A", 3);
        let enter = storage
            .platform_node(&platform, EdgeType::EnterPt)
            .unwrap()
            .unwrap();
        let departures = departure_timeline_of(&graph, enter);
        let (last_time, last_node) = departures.last().unwrap();
        let (first_time, first_node) = departures.first().unwrap();
        assert_eq!((85800, 600), (last_time, first_time));
        let overnight = graph
            .out_edges(last_node)
            .find(|(_, e)| e.edge_type == EdgeType::Overnight)
            .unwrap()
            .1;
        assert_eq!(first_node, overnight.adj_node);
        assert_eq!(1200, overnight.time);
        let wait = graph
            .out_edges(first_node)
            .find(|(_, e)| e.edge_type == EdgeType::Wait)
            .unwrap()
            .1;
        assert_eq!(last_node, wait.adj_node);
        assert_eq!(85200, wait.time);
    }

    #[test]
    fn single_slot_loops_on_itself() {
        let feed = FeedBuilder::default()
            .trip("t1", |t| {
                t.st("A", "10:00:00", "10:00:00")
                    .st("B", "10:05:00", "10:05:00");
            })
            .build();
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        build(&feed, &mut graph, &mut storage);
        // 2 stops, each with a departure and an arrival timeline
        let overnights = edges_of_type(&graph, EdgeType::Overnight);
        assert_eq!(4, overnights.len());
        for overnight in overnights {
            assert_eq!(overnight.base_node, overnight.adj_node);
            assert_eq!(DAY_IN_SECONDS, overnight.time);
        }
        assert!(edges_of_type(&graph, EdgeType::Wait).is_empty());
    }

    #[test]
    fn platforms_are_reachable_from_their_station() {
        let feed = FeedBuilder::default()
            .trip("t1", |t| {
                t.st("A", "10:00:00", "10:00:00")
                    .st("B", "10:05:00", "10:05:00");
            })
            .build();
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        build(&feed, &mut graph, &mut storage);
        let station = storage.stations.station_node("gtfs_0", "A").unwrap();
        let platform = PlatformDescriptor::route_type("gtfs_0", "A", 3);

        let (enter_id, enter) = graph
            .out_edges(station)
            .find(|(_, e)| e.edge_type == EdgeType::EnterPt)
            .unwrap();
        assert_eq!(3, enter.validity);
        assert_eq!(Some(&platform), storage.platform_descriptor(enter_id));
        let (exit_id, exit) = graph
            .in_edges(station)
            .find(|(_, e)| e.edge_type == EdgeType::ExitPt)
            .unwrap();
        assert_eq!(Some(&platform), storage.platform_descriptor(exit_id));
        assert_eq!(
            Ok(Some(exit.base_node)),
            storage.platform_node(&platform, EdgeType::ExitPt)
        );

        let (_, slot) = graph
            .out_edges(enter.adj_node)
            .find(|(_, e)| e.edge_type == EdgeType::EnterTimeExpanded)
            .unwrap();
        assert_eq!(36000, slot.time);
        let zone = storage.time_zones.get(slot.validity).unwrap();
        assert_eq!("gtfs_0", zone.feed_id);
        assert_eq!(chrono_tz::Tz::Europe__Paris, zone.zone_id);
    }

    #[test]
    fn transfer_waits_for_the_minimum_time() {
        let feed = FeedBuilder::default()
            .trip("t1", |t| {
                t.st("S", "00:15:00", "00:15:00")
                    .st("A", "00:16:40", "00:16:40");
            })
            .trip("t2", |t| {
                t.st("B", "00:17:30", "00:17:30")
                    .st("T", "00:30:00", "00:30:00");
            })
            .trip("t3", |t| {
                t.st("B", "00:18:50", "00:18:50")
                    .st("T", "00:35:00", "00:35:00");
            })
            .trip("t4", |t| {
                t.st("B", "00:21:40", "00:21:40")
                    .st("T", "00:40:00", "00:40:00");
            })
            .transfer("A", "B", 120)
            .build();
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        build(&feed, &mut graph, &mut storage);

        let arrival_platform = PlatformDescriptor::route_type("gtfs_0", "A", 3);
        let exit = storage
            .platform_node(&arrival_platform, EdgeType::ExitPt)
            .unwrap()
            .unwrap();
        let arrival_slot = arrival_timeline_of(&graph, exit).get(1000).unwrap();
        let departure_platform = PlatformDescriptor::route_type("gtfs_0", "B", 3);
        let transfers: Vec<_> = graph
            .out_edges(arrival_slot)
            .filter(|(id, e)| {
                e.edge_type == EdgeType::Transfer
                    && storage.platform_descriptor(*id) == Some(&departure_platform)
            })
            .map(|(_, e)| e)
            .collect();
        assert_eq!(1, transfers.len());
        // arrival at 1000 + 120 is 1120, first departure after is 1130
        assert_eq!(130, transfers[0].time);
        let enter = storage
            .platform_node(&departure_platform, EdgeType::EnterPt)
            .unwrap()
            .unwrap();
        assert_eq!(
            Some(transfers[0].adj_node),
            departure_timeline_of(&graph, enter).get(1130)
        );
    }

    #[test]
    fn transfer_edges_inserted_on_demand() {
        let feed = FeedBuilder::default()
            .trip("t1", |t| {
                t.st("S", "00:15:00", "00:15:00")
                    .st("A", "00:16:40", "00:16:40");
            })
            .trip("t2", |t| {
                t.st("B", "00:17:30", "00:17:30")
                    .st("T", "00:30:00", "00:30:00");
            })
            .trip("t3", |t| {
                t.st("B", "00:18:50", "00:18:50")
                    .st("T", "00:35:00", "00:35:00");
            })
            .trip("t4", |t| {
                t.st("B", "00:21:40", "00:21:40")
                    .st("T", "00:40:00", "00:40:00");
            })
            .build();
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        let mut builder =
            TransitNetworkBuilder::new(&feed, &mut graph, &mut storage, BuildConfiguration::default());
        builder.connect_stops_to_street_network(&NoStreet).unwrap();
        builder.build_pt_network().unwrap();

        let arrival_platform = PlatformDescriptor::route_type("gtfs_0", "A", 3);
        let exit = builder
            .storage()
            .platform_node(&arrival_platform, EdgeType::ExitPt)
            .unwrap()
            .unwrap();
        let departure_platform = PlatformDescriptor::route_type("gtfs_0", "B", 3);
        let edge_count = builder.graph().edge_count();

        assert_eq!(1, builder.insert_transfer_edges(exit, 120, &departure_platform));
        // 1000 + 400 is after the last departure at 1300
        assert_eq!(0, builder.insert_transfer_edges(exit, 400, &departure_platform));
        assert_eq!(0, builder.insert_transfer_edges(exit, u32::MAX, &departure_platform));
        assert_eq!(1, builder.insert_transfer_edges(exit, 0, &departure_platform));
        let unknown_platform = PlatformDescriptor::route_type("gtfs_0", "B", 0);
        assert_eq!(0, builder.insert_transfer_edges(exit, 0, &unknown_platform));

        let added: Vec<(u32, Option<&PlatformDescriptor>)> = builder
            .graph()
            .edges()
            .filter(|(id, _)| *id >= edge_count)
            .map(|(id, e)| (e.time, builder.storage().platform_descriptor(id)))
            .collect();
        assert_eq!(
            vec![
                (130, Some(&departure_platform)),
                (50, Some(&departure_platform))
            ],
            added
        );
        assert!(builder
            .graph()
            .edges()
            .filter(|(id, _)| *id >= edge_count)
            .all(|(_, e)| e.edge_type == EdgeType::Transfer));
    }

    #[test]
    fn transfers_within_a_stop_are_implicit() {
        let feed = FeedBuilder::default()
            .trip("t1", |t| {
                t.st("A", "10:00:00", "10:00:00")
                    .st("B", "10:05:00", "10:05:00");
            })
            .trip("t2", |t| {
                t.st("B", "10:10:00", "10:10:00")
                    .st("C", "10:20:00", "10:20:00");
            })
            .build();
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        build(&feed, &mut graph, &mut storage);
        // every arrival slot reaches the departure slot at the same time of
        // its stop: A 10:00, B 10:05, B 10:10 and C 10:20
        let transfers = edges_of_type(&graph, EdgeType::Transfer);
        assert_eq!(4, transfers.len());
        assert!(transfers.iter().all(|t| t.time == 0));

        // from 10:05 at B, the 10:10 departure is reached by waiting
        let platform = PlatformDescriptor::route_type("gtfs_0", "B", 3);
        let enter = storage
            .platform_node(&platform, EdgeType::EnterPt)
            .unwrap()
            .unwrap();
        let departures = departure_timeline_of(&graph, enter);
        let slot = departures.get(36300).unwrap();
        let (_, wait) = graph
            .out_edges(slot)
            .find(|(_, e)| e.edge_type == EdgeType::Wait)
            .unwrap();
        assert_eq!(Some(wait.adj_node), departures.get(36600));
        assert_eq!(300, wait.time);
    }

    #[test]
    fn transfer_from_a_stop_without_arrivals_is_reported() {
        let feed = FeedBuilder::default()
            .trip("t1", |t| {
                t.st("A", "10:00:00", "10:00:00")
                    .st("B", "10:05:00", "10:05:00");
            })
            .stop("X", 2.4, 48.9)
            .transfer("X", "A", 60)
            .build();
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        let mut builder = TransitNetworkBuilder::new(
            &feed,
            &mut graph,
            &mut storage,
            BuildConfiguration::default(),
        );
        builder.connect_stops_to_street_network(&NoStreet).unwrap();
        builder.build_pt_network().unwrap();
        assert_eq!(
            1,
            builder
                .report()
                .warning_count(&BuildReportCategory::TransferFromMissingPlatform)
        );
    }
}
