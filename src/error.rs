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

//! Errors aborting the construction of a transit network.
//!
//! A graph left behind by any of these errors is partially built and must be
//! discarded.

use crate::graph::EdgeType;
use thiserror::Error;

/// Fatal construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The same stop is registered twice for a feed
    #[error("stop '{stop_id}' of feed '{feed_id}' is registered twice")]
    DuplicateStop {
        /// Feed of the stop
        feed_id: String,
        /// Identifier of the stop
        stop_id: String,
    },
    /// A block mixes trips with different frequency rules
    #[error("frequency-based trips in block '{block_id}' do not share the same frequencies")]
    FrequencyBasedBlock {
        /// Identifier of the block
        block_id: String,
    },
    /// A frequency rule with a headway of 0 seconds
    #[error("frequency of trip '{trip_id}' has a headway of 0 seconds")]
    ZeroHeadway {
        /// Identifier of the trip
        trip_id: String,
    },
    /// A platform lookup was given an edge type other than ENTER_PT or EXIT_PT
    #[error("platform lookup is not supported for edge type {0:?}")]
    UnsupportedEdgeType(EdgeType),
    /// A stop time or transfer references a stop absent from the feed
    #[error("stop '{0}' not found")]
    UnknownStop(String),
    /// A trip references a route absent from the feed
    #[error("route '{0}' not found")]
    UnknownRoute(String),
    /// A route references an agency absent from the feed
    #[error("agency '{0}' not found")]
    UnknownAgency(String),
    /// A trip references a calendar absent from the feed
    #[error("service '{0}' not found")]
    UnknownService(String),
    /// A trip id absent from the feed
    #[error("trip '{0}' not found")]
    UnknownTrip(String),
    /// A stop sequence absent from a trip
    #[error("trip '{trip_id}' has no stop time with sequence {sequence}")]
    UnknownStopSequence {
        /// Identifier of the trip
        trip_id: String,
        /// Requested stop sequence
        sequence: u32,
    },
    /// A stop sequence too large to index the board and alight edges of a trip
    #[error("trip '{trip_id}' has a stop sequence {sequence} above {max}")]
    StopSequenceOutOfRange {
        /// Identifier of the trip
        trip_id: String,
        /// Offending stop sequence
        sequence: u32,
        /// Largest stop sequence accepted
        max: u32,
    },
    /// A stop served by a trip was never connected to the street network
    #[error("stop '{stop_id}' of feed '{feed_id}' has no station node")]
    MissingStation {
        /// Feed of the stop
        feed_id: String,
        /// Identifier of the stop
        stop_id: String,
    },
}
