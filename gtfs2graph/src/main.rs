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

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};
use transit_graph::{
    configuration::read_config, graph::EdgeType, graph::Graph, storage::TransitStorage,
    street::StreetIndex, Feed, Result, TransitNetworkBuilder,
};

#[derive(Debug, Parser)]
#[clap(
    name = "gtfs2graph",
    about = "Build the time-expanded transit graph of a feed.",
    version
)]
struct Opt {
    /// Input feed, a JSON file.
    #[clap(short, long)]
    input: PathBuf,

    /// Output file, a JSON summary of the built graph.
    #[clap(short, long)]
    output: PathBuf,

    /// JSON file containing the build configuration.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Output file for the report of the skipped objects.
    #[clap(short, long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GraphSummary {
    feed_id: String,
    node_count: u32,
    edge_count: u32,
    edges_by_type: BTreeMap<EdgeType, usize>,
    station_count: usize,
    validity_pattern_count: usize,
    time_zone_count: usize,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Error creating {:?}", path))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("Error writing {:?}", path))?;
    Ok(())
}

fn run(opt: Opt) -> Result<()> {
    info!("Launching gtfs2graph...");

    let configuration = read_config(opt.config)?;
    let feed = Feed::read(&opt.input)?;
    let feed_id = configuration.feed_id.clone();

    let mut graph = Graph::default();
    let mut storage = TransitStorage::default();
    let street_index = StreetIndex::new(&graph, configuration.max_snap_distance);
    let mut builder = TransitNetworkBuilder::new(&feed, &mut graph, &mut storage, configuration);
    builder.connect_stops_to_street_network(&street_index)?;
    builder.build_pt_network()?;
    let report = builder.into_report();

    if let Some(report_path) = opt.report {
        write_json(&report_path, &report)?;
    }
    let summary = GraphSummary {
        feed_id,
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        edges_by_type: graph.edge_count_by_type(),
        station_count: storage.stations.len(),
        validity_pattern_count: storage.validity_patterns.len(),
        time_zone_count: storage.time_zones.len(),
    };
    info!(
        "Graph of feed '{}' has {} nodes and {} edges",
        summary.feed_id, summary.node_count, summary.edge_count
    );
    write_json(&opt.output, &summary)
}

fn init_logger() {
    let default_level = LevelFilter::INFO;
    let rust_log =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());
    let env_filter_subscriber = EnvFilter::try_new(rust_log).unwrap_or_else(|e| {
        eprintln!(
            "invalid {}, falling back to level '{}' - {}",
            EnvFilter::DEFAULT_ENV,
            default_level,
            e,
        );
        EnvFilter::new(default_level.to_string())
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter_subscriber)
        .init();
}

fn main() {
    init_logger();
    if let Err(err) = run(Opt::parse()) {
        for cause in err.chain() {
            eprintln!("{}", cause);
        }
        std::process::exit(1);
    }
}
