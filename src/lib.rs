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

//! The `transit_graph` crate compiles a timetabled public transit feed into a
//! time-expanded graph that a multi-criteria journey search can query.
//!
//! The construction runs in three passes driven by
//! [`TransitNetworkBuilder::build_pt_network`]:
//! - every trip is expanded (blocks, frequencies) into hop, dwell, board and
//!   alight edges, populating per-platform timelines,
//! - every timeline is wired to its station node (enter/exit, wait chains,
//!   overnight wraparound),
//! - declared transfers are inserted between platforms.
//!
//! ```
//! use transit_graph::{
//!     configuration::BuildConfiguration, feed_builder::FeedBuilder, graph::Graph,
//!     storage::TransitStorage, street::StreetIndex, TransitNetworkBuilder,
//! };
//!
//! # fn main() -> transit_graph::Result<()> {
//! let feed = FeedBuilder::default()
//!     .trip("t1", |t| {
//!         t.st("A", "10:00:00", "10:01:00")
//!             .st("B", "10:10:00", "10:11:00");
//!     })
//!     .build();
//! let mut graph = Graph::default();
//! let mut storage = TransitStorage::default();
//! let configuration = BuildConfiguration::default();
//! let street_index = StreetIndex::new(&graph, configuration.max_snap_distance);
//! let mut builder =
//!     TransitNetworkBuilder::new(&feed, &mut graph, &mut storage, configuration);
//! builder.connect_stops_to_street_network(&street_index)?;
//! builder.build_pt_network()?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod block_transfers;
pub mod builder;
pub mod configuration;
pub mod error;
pub mod feed;
#[doc(hidden)]
pub mod feed_builder;
pub mod graph;
pub mod objects;
pub mod realtime;
pub mod report;
pub(crate) mod serde_utils;
pub mod stations;
pub mod stop_wirer;
pub mod storage;
pub mod street;
pub mod timeline;
pub mod transfer_rules;
pub mod trip_expander;
pub mod validity;

/// Length of a service day in seconds
pub const DAY_IN_SECONDS: u32 = 86_400;

/// The error type used by the crate.
pub type Error = anyhow::Error;

/// The corresponding result type used by the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub use crate::builder::TransitNetworkBuilder;
pub use crate::error::BuildError;
pub use crate::feed::Feed;
