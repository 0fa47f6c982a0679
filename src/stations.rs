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

//! Street node of every stop.

use crate::error::BuildError;
use crate::graph::NodeId;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Feed stop to station node, one registration per stop.
///
/// Several stops may share a station node when they snap to the same
/// street node.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    nodes: BTreeMap<(String, String), NodeId>,
}

impl StationRegistry {
    /// Register the station node of a stop. A stop registered twice is an
    /// error and the first registration is kept.
    pub fn register(&mut self, feed_id: &str, stop_id: &str, node: NodeId) -> Result<(), BuildError> {
        match self.nodes.entry((feed_id.to_owned(), stop_id.to_owned())) {
            Entry::Occupied(_) => Err(BuildError::DuplicateStop {
                feed_id: feed_id.to_owned(),
                stop_id: stop_id.to_owned(),
            }),
            Entry::Vacant(e) => {
                e.insert(node);
                Ok(())
            }
        }
    }

    /// Station node of a stop
    pub fn station_node(&self, feed_id: &str, stop_id: &str) -> Option<NodeId> {
        self.nodes
            .get(&(feed_id.to_owned(), stop_id.to_owned()))
            .copied()
    }

    /// Number of registered stops
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No stop registered
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registrations as `(feed_id, stop_id, node)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, NodeId)> {
        self.nodes
            .iter()
            .map(|((feed_id, stop_id), &node)| (feed_id.as_str(), stop_id.as_str(), node))
    }
}
