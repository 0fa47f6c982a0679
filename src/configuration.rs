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

//! Configuration of the network construction.

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path;
use tracing::info;

/// Identifier of the feed when none is configured
pub const DEFAULT_FEED_ID: &str = "gtfs_0";
/// Maximum distance in meters between a stop and its street node
pub const DEFAULT_MAX_SNAP_DISTANCE: f64 = 10.0;

/// Parameters of the construction of one feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfiguration {
    /// Identifier of the feed, part of every platform and station key
    pub feed_id: String,
    /// When set, a declared transfer from a stop also leaves the arrival
    /// platforms of the other stops sharing its street node
    pub create_transfer_stops_connect_same_street_node: bool,
    /// Maximum distance in meters between a stop and its street node
    pub max_snap_distance: f64,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        BuildConfiguration {
            feed_id: DEFAULT_FEED_ID.to_owned(),
            create_transfer_stops_connect_same_street_node: false,
            max_snap_distance: DEFAULT_MAX_SNAP_DISTANCE,
        }
    }
}

/// Read a JSON configuration file. Missing fields, or a missing file path,
/// take the default values.
///
/// Below is an example of this file
/// ```text
/// {
///     "feed_id": "metro",
///     "create_transfer_stops_connect_same_street_node": true,
///     "max_snap_distance": 25.0
/// }
/// ```
pub fn read_config<P: AsRef<path::Path>>(config_path: Option<P>) -> Result<BuildConfiguration> {
    let configuration = match config_path {
        Some(config_path) => {
            let config_path = config_path.as_ref();
            info!("Reading build configuration from {:?}", config_path);
            let json_config_file = File::open(config_path)
                .with_context(|| format!("Error reading {:?}", config_path))?;
            serde_json::from_reader(json_config_file)
                .with_context(|| format!("Error parsing {:?}", config_path))?
        }
        None => BuildConfiguration::default(),
    };
    Ok(configuration)
}
