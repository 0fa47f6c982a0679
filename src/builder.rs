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

//! Construction of the transit network of one feed.

use crate::configuration::BuildConfiguration;
use crate::error::BuildError;
use crate::feed::Feed;
use crate::graph::{Edge, EdgeType, Graph, NodeId, PtGraphWriter};
use crate::objects::{LocationType, Stop};
use crate::report::{BuildReportCategory, Report};
use crate::storage::TransitStorage;
use crate::street::LocationIndex;
use crate::timeline::{PlatformDescriptor, TimelineIndex};
use crate::transfer_rules::TransferRules;
use crate::validity::FeedIdWithTimezone;
use crate::Result;
use anyhow::Context;
use chrono_tz::Tz;
use tracing::{debug, info};

/// Builds the transit network of one feed into a shared graph and storage.
///
/// A builder owns its node cursor: every transit node it creates is taken
/// from it, starting at the node count of the graph, or at an explicit
/// first node given to [`TransitNetworkBuilder::with_first_node`].
///
/// A builder is also the entry point of realtime patching: run on top of an
/// already built network, it adds the trips of the patch with
/// [`TransitNetworkBuilder::add_trip`] and wires them with
/// [`TransitNetworkBuilder::wire_up_additional_departures_and_arrivals`].
pub struct TransitNetworkBuilder<'a> {
    pub(crate) feed_id: String,
    pub(crate) feed: &'a Feed,
    pub(crate) writer: PtGraphWriter<'a>,
    pub(crate) storage: &'a mut TransitStorage,
    pub(crate) transfer_rules: TransferRules,
    pub(crate) configuration: BuildConfiguration,
    pub(crate) timelines: TimelineIndex,
    pub(crate) report: Report<BuildReportCategory>,
}

impl<'a> TransitNetworkBuilder<'a> {
    /// A builder creating its nodes after the existing nodes of `graph`
    pub fn new(
        feed: &'a Feed,
        graph: &'a mut Graph,
        storage: &'a mut TransitStorage,
        configuration: BuildConfiguration,
    ) -> Self {
        let first_node = graph.node_count();
        Self::with_first_node(feed, graph, storage, configuration, first_node)
    }

    /// A builder creating its nodes from `first_node` on
    pub fn with_first_node(
        feed: &'a Feed,
        graph: &'a mut Graph,
        storage: &'a mut TransitStorage,
        configuration: BuildConfiguration,
        first_node: NodeId,
    ) -> Self {
        TransitNetworkBuilder {
            feed_id: configuration.feed_id.clone(),
            feed,
            writer: PtGraphWriter::new(graph, first_node),
            storage,
            transfer_rules: TransferRules::new(feed),
            configuration,
            timelines: TimelineIndex::default(),
            report: Report::default(),
        }
    }

    /// Give every stop point a station node: the closest street node when
    /// one is close enough, otherwise a new node linked to itself.
    pub fn connect_stops_to_street_network<L: LocationIndex>(
        &mut self,
        location_index: &L,
    ) -> Result<()> {
        let feed = self.feed;
        let mut snapped = 0;
        let mut created = 0;
        for stop in feed.stops.values() {
            if stop.location_type != LocationType::StopPoint {
                continue;
            }
            let station_node = match location_index.find_closest(&stop.coord) {
                Some(node) => {
                    snapped += 1;
                    node
                }
                None => {
                    created += 1;
                    self.add_isolated_station(stop)
                }
            };
            self.storage
                .stations
                .register(&self.feed_id, &stop.id, station_node)?;
        }
        info!(
            "Feed '{}': {} stops snapped to the street network, {} stops on their own node",
            self.feed_id, snapped, created
        );
        Ok(())
    }

    fn add_isolated_station(&mut self, stop: &Stop) -> NodeId {
        debug!("stop '{}' is too far from any street node", stop.id);
        let node = self.writer.add_pt_node(stop.coord);
        self.writer.graph_mut().add_edge(Edge {
            base_node: node,
            adj_node: node,
            edge_type: EdgeType::Highway,
            name: stop.name.clone(),
            distance: 0.0,
            time: 0,
            validity: 0,
            transfers: 0,
            pt_access: true,
            foot_access: true,
        });
        node
    }

    /// Expand every trip, wire every timeline to its station and insert
    /// the declared transfers.
    ///
    /// Stops must have been connected beforehand with
    /// [`TransitNetworkBuilder::connect_stops_to_street_network`].
    pub fn build_pt_network(&mut self) -> Result<()> {
        info!("Building transit network of feed '{}'", self.feed_id);
        let first_node = self.writer.next_node();
        let first_edge = self.writer.graph().edge_count();
        self.create_trips()
            .with_context(|| format!("Error expanding trips of feed '{}'", self.feed_id))?;
        self.wire_up_stops()
            .with_context(|| format!("Error wiring stops of feed '{}'", self.feed_id))?;
        self.insert_transfers()
            .with_context(|| format!("Error inserting transfers of feed '{}'", self.feed_id))?;
        info!(
            "Feed '{}': {} nodes and {} edges added",
            self.feed_id,
            self.writer.next_node() - first_node,
            self.writer.graph().edge_count() - first_edge
        );
        Ok(())
    }

    /// Identifier of the feed being built
    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    /// Next node id the builder will hand out
    pub fn next_node(&self) -> NodeId {
        self.writer.next_node()
    }

    /// Graph being built
    pub fn graph(&self) -> &Graph {
        self.writer.graph()
    }

    /// Timelines collected so far
    pub fn timelines(&self) -> &TimelineIndex {
        &self.timelines
    }

    /// Side tables of the network
    pub fn storage(&self) -> &TransitStorage {
        self.storage
    }

    /// Recoverable problems met so far
    pub fn report(&self) -> &Report<BuildReportCategory> {
        &self.report
    }

    /// Consume the builder, keeping its report
    pub fn into_report(self) -> Report<BuildReportCategory> {
        self.report
    }

    pub(crate) fn station_node(&self, stop_id: &str) -> Result<NodeId> {
        self.storage
            .stations
            .station_node(&self.feed_id, stop_id)
            .ok_or_else(|| {
                BuildError::MissingStation {
                    feed_id: self.feed_id.clone(),
                    stop_id: stop_id.to_owned(),
                }
                .into()
            })
    }

    pub(crate) fn time_zone_id(&mut self, zone_id: Tz) -> u32 {
        self.storage.time_zones.get_or_insert(FeedIdWithTimezone {
            feed_id: self.feed_id.clone(),
            zone_id,
        })
    }

    pub(crate) fn route_type_of(&self, platform: &PlatformDescriptor) -> Result<u16> {
        match platform {
            PlatformDescriptor::Route { route_id, .. } => self.feed.route_type(route_id),
            PlatformDescriptor::RouteType { route_type, .. } => Ok(*route_type),
        }
    }

    pub(crate) fn platform_route_id(platform: &PlatformDescriptor) -> Option<&str> {
        match platform {
            PlatformDescriptor::Route { route_id, .. } => Some(route_id),
            PlatformDescriptor::RouteType { .. } => None,
        }
    }
}
