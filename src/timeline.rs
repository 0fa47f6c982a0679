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

//! Per-platform timelines of departures and arrivals.

use crate::graph::NodeId;
use crate::DAY_IN_SECONDS;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

/// A boarding or alighting point at a stop
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PlatformDescriptor {
    /// Served by a single route
    Route {
        /// Feed of the stop
        feed_id: String,
        /// Identifier of the stop
        stop_id: String,
        /// Route served
        route_id: String,
    },
    /// Served by every route of a route type
    RouteType {
        /// Feed of the stop
        feed_id: String,
        /// Identifier of the stop
        stop_id: String,
        /// Route type served
        route_type: u16,
    },
}

impl PlatformDescriptor {
    /// Platform of a single route
    pub fn route(feed_id: &str, stop_id: &str, route_id: &str) -> Self {
        PlatformDescriptor::Route {
            feed_id: feed_id.to_owned(),
            stop_id: stop_id.to_owned(),
            route_id: route_id.to_owned(),
        }
    }

    /// Platform shared by a route type
    pub fn route_type(feed_id: &str, stop_id: &str, route_type: u16) -> Self {
        PlatformDescriptor::RouteType {
            feed_id: feed_id.to_owned(),
            stop_id: stop_id.to_owned(),
            route_type,
        }
    }

    /// Feed of the stop
    pub fn feed_id(&self) -> &str {
        match self {
            PlatformDescriptor::Route { feed_id, .. }
            | PlatformDescriptor::RouteType { feed_id, .. } => feed_id,
        }
    }

    /// Stop of the platform
    pub fn stop_id(&self) -> &str {
        match self {
            PlatformDescriptor::Route { stop_id, .. }
            | PlatformDescriptor::RouteType { stop_id, .. } => stop_id,
        }
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlatformDescriptor::Route {
                feed_id,
                stop_id,
                route_id,
            } => write!(f, "{}:{} (route {})", feed_id, stop_id, route_id),
            PlatformDescriptor::RouteType {
                feed_id,
                stop_id,
                route_type,
            } => write!(f, "{}:{} (route type {})", feed_id, stop_id, route_type),
        }
    }
}

/// Time of day (seconds, `0..86400`) to node, ordered by time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline(BTreeMap<u32, NodeId>);

impl Timeline {
    /// Node at `time` of the day, created with `create` on first use.
    /// `time` is taken modulo the day length.
    pub fn get_or_insert_with<F>(&mut self, time: u32, create: F) -> NodeId
    where
        F: FnOnce() -> NodeId,
    {
        match self.0.entry(time % DAY_IN_SECONDS) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => *e.insert(create()),
        }
    }

    /// Insert a slot, returning the node previously at that time if any
    pub fn insert(&mut self, time: u32, node: NodeId) -> Option<NodeId> {
        self.0.insert(time % DAY_IN_SECONDS, node)
    }

    /// Node at exactly `time`
    pub fn get(&self, time: u32) -> Option<NodeId> {
        self.0.get(&(time % DAY_IN_SECONDS)).copied()
    }

    /// Earliest slot of the day
    pub fn first(&self) -> Option<(u32, NodeId)> {
        self.0.iter().next().map(|(&t, &n)| (t, n))
    }

    /// Latest slot of the day
    pub fn last(&self) -> Option<(u32, NodeId)> {
        self.0.iter().next_back().map(|(&t, &n)| (t, n))
    }

    /// Earliest slot at or after `time`, without wrapping to the next day
    pub fn next_at_or_after(&self, time: u32) -> Option<(u32, NodeId)> {
        self.0.range(time..).next().map(|(&t, &n)| (t, n))
    }

    /// Latest slot strictly before `time`
    pub fn previous_before(&self, time: u32) -> Option<(u32, NodeId)> {
        self.0.range(..time).next_back().map(|(&t, &n)| (t, n))
    }

    /// Slots in increasing time order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (u32, NodeId)> + '_ {
        self.0.iter().map(|(&t, &n)| (t, n))
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No slot
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u32, NodeId)> for Timeline {
    fn from_iter<I: IntoIterator<Item = (u32, NodeId)>>(iter: I) -> Self {
        Timeline(
            iter.into_iter()
                .map(|(t, n)| (t % DAY_IN_SECONDS, n))
                .collect(),
        )
    }
}

/// Timelines of one stop, by platform
pub type PlatformTimelines = BTreeMap<PlatformDescriptor, Timeline>;

/// Departure and arrival timelines of a feed, by stop then platform.
///
/// Ordered maps keep the wiring order, hence node and edge ids,
/// reproducible from one build to the other.
#[derive(Debug, Clone, Default)]
pub struct TimelineIndex {
    departures: BTreeMap<String, PlatformTimelines>,
    arrivals: BTreeMap<String, PlatformTimelines>,
}

impl TimelineIndex {
    /// Departure timeline of a platform, created empty on first use
    pub fn departure_timeline_mut(&mut self, platform: &PlatformDescriptor) -> &mut Timeline {
        Self::timeline_mut(&mut self.departures, platform)
    }

    /// Arrival timeline of a platform, created empty on first use
    pub fn arrival_timeline_mut(&mut self, platform: &PlatformDescriptor) -> &mut Timeline {
        Self::timeline_mut(&mut self.arrivals, platform)
    }

    fn timeline_mut<'a>(
        timelines: &'a mut BTreeMap<String, PlatformTimelines>,
        platform: &PlatformDescriptor,
    ) -> &'a mut Timeline {
        timelines
            .entry(platform.stop_id().to_owned())
            .or_default()
            .entry(platform.clone())
            .or_default()
    }

    /// Departure timeline of a platform
    pub fn departure_timeline(&self, platform: &PlatformDescriptor) -> Option<&Timeline> {
        self.departures
            .get(platform.stop_id())
            .and_then(|t| t.get(platform))
    }

    /// Arrival timeline of a platform
    pub fn arrival_timeline(&self, platform: &PlatformDescriptor) -> Option<&Timeline> {
        self.arrivals
            .get(platform.stop_id())
            .and_then(|t| t.get(platform))
    }

    /// Departure timelines by stop
    pub fn departures(&self) -> &BTreeMap<String, PlatformTimelines> {
        &self.departures
    }

    /// Arrival timelines by stop
    pub fn arrivals(&self) -> &BTreeMap<String, PlatformTimelines> {
        &self.arrivals
    }

    /// Departure timelines of a stop
    pub fn departures_at(&self, stop_id: &str) -> impl Iterator<Item = (&PlatformDescriptor, &Timeline)> {
        self.departures.get(stop_id).into_iter().flatten()
    }

    /// Arrival timelines of a stop
    pub fn arrivals_at(&self, stop_id: &str) -> impl Iterator<Item = (&PlatformDescriptor, &Timeline)> {
        self.arrivals.get(stop_id).into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slots_are_created_once_per_time_of_day() {
        let mut timeline = Timeline::default();
        let mut next = 100;
        let mut create = || {
            next += 1;
            next
        };
        let first = timeline.get_or_insert_with(3600, &mut create);
        let again = timeline.get_or_insert_with(3600, &mut create);
        let next_day = timeline.get_or_insert_with(3600 + DAY_IN_SECONDS, &mut create);
        assert_eq!(first, again);
        assert_eq!(first, next_day);
        assert_eq!(1, timeline.len());
    }

    #[test]
    fn nearest_lookups() {
        let timeline: Timeline = vec![(1050, 1), (1130, 2), (1300, 3)].into_iter().collect();
        assert_eq!(Some((1130, 2)), timeline.next_at_or_after(1120));
        assert_eq!(Some((1130, 2)), timeline.next_at_or_after(1130));
        assert_eq!(None, timeline.next_at_or_after(1301));
        assert_eq!(Some((1050, 1)), timeline.previous_before(1130));
        assert_eq!(None, timeline.previous_before(1050));
        assert_eq!(Some((1050, 1)), timeline.first());
        assert_eq!(Some((1300, 3)), timeline.last());
    }

    #[test]
    fn timelines_are_kept_per_platform() {
        let mut index = TimelineIndex::default();
        let generic = PlatformDescriptor::route_type("f", "A", 3);
        let specific = PlatformDescriptor::route("f", "A", "r1");
        index.departure_timeline_mut(&generic).insert(60, 1);
        index.departure_timeline_mut(&specific).insert(60, 2);
        index.arrival_timeline_mut(&generic).insert(30, 3);
        assert_eq!(2, index.departures_at("A").count());
        assert_eq!(Some(2), index.departure_timeline(&specific).and_then(|t| t.get(60)));
        assert_eq!(None, index.arrival_timeline(&specific));
        assert_eq!(0, index.departures_at("B").count());
    }
}
