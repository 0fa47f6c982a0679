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

use pretty_assertions::assert_eq;
use transit_graph::{
    block_transfers::TripArrival,
    configuration::BuildConfiguration,
    graph::{Edge, EdgeType, Graph},
    objects::{Coord, Date, StopTime, Time},
    storage::{TransitStorage, TripDescriptor},
    street::StreetIndex,
    timeline::PlatformDescriptor,
    trip_expander::TripWithStopTimes,
    Feed, TransitNetworkBuilder,
};

const FEED: &str = "tests/fixtures/minimal/feed.json";

fn build(feed: &Feed, graph: &mut Graph, storage: &mut TransitStorage) {
    let configuration = BuildConfiguration::default();
    let street_index = StreetIndex::new(graph, configuration.max_snap_distance);
    let mut builder = TransitNetworkBuilder::new(feed, graph, storage, configuration);
    builder
        .connect_stops_to_street_network(&street_index)
        .unwrap();
    builder.build_pt_network().unwrap();
    assert!(builder.report().is_empty());
}

fn count(graph: &Graph, edge_type: EdgeType) -> usize {
    graph
        .edge_count_by_type()
        .get(&edge_type)
        .copied()
        .unwrap_or_default()
}

fn departure_slots(graph: &Graph, storage: &TransitStorage, platform: &PlatformDescriptor) -> Vec<u32> {
    let enter = storage
        .platform_node(platform, EdgeType::EnterPt)
        .unwrap()
        .unwrap();
    let mut slots: Vec<u32> = graph
        .out_edges(enter)
        .filter(|(_, e)| e.edge_type == EdgeType::EnterTimeExpanded)
        .map(|(_, e)| e.time)
        .collect();
    slots.sort_unstable();
    slots
}

#[test]
fn build_minimal_feed() {
    let feed = Feed::read(FEED).unwrap();
    let mut graph = Graph::default();
    let mut storage = TransitStorage::default();
    build(&feed, &mut graph, &mut storage);

    assert_eq!(3, count(&graph, EdgeType::Highway));
    assert_eq!(6, count(&graph, EdgeType::Hop));
    assert_eq!(13, count(&graph, EdgeType::Board));
    assert_eq!(4, count(&graph, EdgeType::EnterPt));
    assert_eq!(4, count(&graph, EdgeType::ExitPt));
    assert_eq!(8, count(&graph, EdgeType::Overnight));
    // 13 between timelines, 1 in-seat between t1 and t2
    assert_eq!(14, count(&graph, EdgeType::Transfer));
    assert_eq!(3, storage.stations.len());
    assert_eq!(1, storage.validity_patterns.len());
}

#[test]
fn stations_lead_to_their_platforms() {
    let feed = Feed::read(FEED).unwrap();
    let mut graph = Graph::default();
    let mut storage = TransitStorage::default();
    build(&feed, &mut graph, &mut storage);

    let station_b = storage.stations.station_node("gtfs_0", "B").unwrap();
    let mut route_types: Vec<u32> = graph
        .out_edges(station_b)
        .filter(|(_, e)| e.edge_type == EdgeType::EnterPt)
        .map(|(_, e)| e.validity)
        .collect();
    route_types.sort_unstable();
    assert_eq!(vec![0, 3], route_types);
    assert!(storage.stations.station_node("gtfs_0", "SA").is_none());

    let platform_a = PlatformDescriptor::route_type("gtfs_0", "A", 3);
    assert_eq!(
        vec![28800, 30300, 32400, 33600, 34800],
        departure_slots(&graph, &storage, &platform_a)
    );
}

#[test]
fn boards_are_indexed_by_trip_and_sequence() {
    let feed = Feed::read(FEED).unwrap();
    let mut graph = Graph::default();
    let mut storage = TransitStorage::default();
    build(&feed, &mut graph, &mut storage);

    let t3 = TripDescriptor::new("t3", "r2");
    let board = graph.edge(storage.board_edge(&t3, 0).unwrap()).unwrap();
    assert_eq!(1, board.transfers);
    let first_day = Date::from_ymd_opt(2019, 1, 1).unwrap();
    let sunday = Date::from_ymd_opt(2019, 1, 6).unwrap();
    assert!(storage.is_valid_on(board.validity, first_day));
    assert!(!storage.is_valid_on(board.validity, sunday));

    let instance = TripDescriptor::new("f1", "r1").with_start_time(Time::new(9, 40, 0));
    assert!(storage.board_edge(&instance, 0).is_some());
    assert!(storage.alight_edge(&instance, 1).is_some());
    assert!(storage
        .board_edge(&TripDescriptor::new("f1", "r1"), 0)
        .is_none());
}

#[test]
fn build_is_deterministic() {
    let feed = Feed::read(FEED).unwrap();
    let snapshot = || {
        let mut graph = Graph::default();
        let mut storage = TransitStorage::default();
        build(&feed, &mut graph, &mut storage);
        graph.edges().map(|(_, e)| e.clone()).collect::<Vec<Edge>>()
    };
    assert_eq!(snapshot(), snapshot());
}

#[test]
fn stops_snap_to_the_street_network() {
    let feed = Feed::read(FEED).unwrap();
    let mut graph = Graph::default();
    let street_b = graph.add_node(Coord {
        lon: 2.369,
        lat: 48.853,
    });
    let street_far = graph.add_node(Coord {
        lon: 2.38,
        lat: 48.86,
    });
    graph.add_street_edge(street_b, street_far, 1000.0);
    let mut storage = TransitStorage::default();
    build(&feed, &mut graph, &mut storage);

    assert_eq!(
        Some(street_b),
        storage.stations.station_node("gtfs_0", "B")
    );
    // A and C get a node of their own
    assert_eq!(3, count(&graph, EdgeType::Highway));
}

#[test]
fn realtime_trip_is_added_to_the_network() {
    let feed = Feed::read(FEED).unwrap();
    let mut graph = Graph::default();
    let mut storage = TransitStorage::default();
    build(&feed, &mut graph, &mut storage);
    let edge_count = graph.edge_count() as usize;
    let enter_pt_count = count(&graph, EdgeType::EnterPt);

    let mut added = feed.trips.get("t1").unwrap().clone();
    added.id = "t1-added".into();
    added.block_id = None;
    let mut trip = TripWithStopTimes::new(&added, feed.validity("wk").unwrap());
    trip.stop_times = vec![
        StopTime {
            stop_id: "A".into(),
            sequence: 0,
            arrival_time: Time::new(8, 40, 0),
            departure_time: Time::new(8, 40, 0),
        },
        StopTime {
            stop_id: "B".into(),
            sequence: 1,
            arrival_time: Time::new(8, 50, 0),
            departure_time: Time::new(8, 50, 0),
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
                TripDescriptor::new("t1-added", "r1"),
            )
            .unwrap();
        builder
            .wire_up_additional_departures_and_arrivals(chrono_tz::Tz::Europe__Paris)
            .unwrap();
    }

    assert!(graph.edge_count() as usize > edge_count);
    assert_eq!(enter_pt_count, count(&graph, EdgeType::EnterPt));
    let platform_a = PlatformDescriptor::route_type("gtfs_0", "A", 3);
    assert_eq!(
        vec![28800, 30300, 31200, 32400, 33600, 34800],
        departure_slots(&graph, &storage, &platform_a)
    );
    assert!(storage
        .board_edge(&TripDescriptor::new("t1-added", "r1"), 0)
        .is_some());
}
