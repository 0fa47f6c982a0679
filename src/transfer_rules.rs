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

//! Index of the declared transfers of a feed, with route-specific rules.
//!
//! Transfers declared on a station are applied to each of its stop points.
//! Rules may name a source and a destination route; the most specific rule
//! wins for a given pair of routes.

use crate::feed::Feed;
use crate::objects::{LocationType, Transfer, TransferType};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Transfer rules of a feed, by source and destination stop
#[derive(Debug, Default)]
pub struct TransferRules {
    transfers_from_stop: BTreeMap<String, Vec<Transfer>>,
    transfers_to_stop: BTreeMap<String, Vec<Transfer>>,
    routes_by_stop: BTreeMap<String, BTreeSet<String>>,
}

fn is_usable(transfer: &Transfer) -> bool {
    matches!(
        transfer.transfer_type,
        TransferType::Recommended | TransferType::MinimumTime
    )
}

/// Route-specificity score of a rule for a pair of routes
fn specificity(transfer: &Transfer, from_route_id: Option<&str>, to_route_id: Option<&str>) -> u8 {
    u8::from(transfer.from_route_id.as_deref() == from_route_id)
        + u8::from(transfer.to_route_id.as_deref() == to_route_id)
}

fn most_specific_rule<'a>(
    transfers: &[&'a Transfer],
    from_route_id: Option<&str>,
    to_route_id: Option<&str>,
) -> Option<&'a Transfer> {
    // `max_by_key` returns the last maximum, keep the first one instead
    transfers
        .iter()
        .copied()
        .rev()
        .max_by_key(|t| specificity(t, from_route_id, to_route_id))
}

impl TransferRules {
    /// Index the transfers and the routes serving each stop of `feed`
    pub fn new(feed: &Feed) -> Self {
        let mut rules = TransferRules::default();
        for transfer in explode_transfers(feed) {
            rules
                .transfers_from_stop
                .entry(transfer.from_stop_id.clone())
                .or_default()
                .push(transfer.clone());
            rules
                .transfers_to_stop
                .entry(transfer.to_stop_id.clone())
                .or_default()
                .push(transfer);
        }
        for trip in feed.trips.values() {
            for stop_time in &trip.stop_times {
                rules
                    .routes_by_stop
                    .entry(stop_time.stop_id.clone())
                    .or_default()
                    .insert(trip.route_id.clone());
            }
        }
        debug!(
            "{} stops with outbound transfers, {} with inbound transfers",
            rules.transfers_from_stop.len(),
            rules.transfers_to_stop.len()
        );
        rules
    }

    /// No transfer towards this stop is restricted to a destination route.
    /// Departures from such a stop share one platform per route type.
    pub fn has_no_route_specific_departure_transfer_rules(&self, stop_id: &str) -> bool {
        self.transfers_to_stop
            .get(stop_id)
            .map_or(true, |ts| ts.iter().all(|t| t.to_route_id.is_none()))
    }

    /// No transfer from this stop is restricted to a source route
    pub fn has_no_route_specific_arrival_transfer_rules(&self, stop_id: &str) -> bool {
        self.transfers_from_stop
            .get(stop_id)
            .map_or(true, |ts| ts.iter().all(|t| t.from_route_id.is_none()))
    }

    /// Transfers reaching departures of `to_route_id` (or of any route when
    /// `None`) at `to_stop_id`, one per source stop and source route.
    ///
    /// A transfer within the stop, without minimum time, is added unless one
    /// is already declared.
    pub fn transfers_to_stop(&self, to_stop_id: &str, to_route_id: Option<&str>) -> Vec<Transfer> {
        let mut by_from_stop: BTreeMap<&str, Vec<&Transfer>> = BTreeMap::new();
        for transfer in self.transfers_to_stop.get(to_stop_id).into_iter().flatten() {
            if is_usable(transfer)
                && (transfer.to_route_id.is_none() || transfer.to_route_id.as_deref() == to_route_id)
            {
                by_from_stop
                    .entry(transfer.from_stop_id.as_str())
                    .or_default()
                    .push(transfer);
            }
        }
        let mut result = Vec::new();
        for (from_stop_id, transfers) in by_from_stop {
            if self.has_no_route_specific_arrival_transfer_rules(from_stop_id) {
                result.push(Transfer {
                    from_stop_id: from_stop_id.to_owned(),
                    to_stop_id: to_stop_id.to_owned(),
                    min_transfer_time: single_min_transfer_time(&transfers),
                    ..Default::default()
                });
            } else {
                for from_route_id in self.routes_serving(from_stop_id) {
                    if let Some(rule) =
                        most_specific_rule(&transfers, Some(from_route_id), to_route_id)
                    {
                        result.push(Transfer {
                            from_route_id: Some(from_route_id.to_owned()),
                            to_route_id: to_route_id.map(str::to_owned),
                            ..rule.clone()
                        });
                    }
                }
            }
        }
        if !result.iter().any(|t| t.from_stop_id == to_stop_id) {
            result.push(Transfer {
                from_stop_id: to_stop_id.to_owned(),
                to_stop_id: to_stop_id.to_owned(),
                ..Default::default()
            });
        }
        result
    }

    /// Transfers leaving arrivals of `from_route_id` (or of any route when
    /// `None`) at `from_stop_id`, one per destination stop and destination route
    pub fn transfers_from_stop(&self, from_stop_id: &str, from_route_id: Option<&str>) -> Vec<Transfer> {
        let mut by_to_stop: BTreeMap<&str, Vec<&Transfer>> = BTreeMap::new();
        for transfer in self.transfers_from_stop.get(from_stop_id).into_iter().flatten() {
            if is_usable(transfer)
                && (transfer.from_route_id.is_none()
                    || transfer.from_route_id.as_deref() == from_route_id)
            {
                by_to_stop
                    .entry(transfer.to_stop_id.as_str())
                    .or_default()
                    .push(transfer);
            }
        }
        let mut result = Vec::new();
        for (to_stop_id, transfers) in by_to_stop {
            if self.has_no_route_specific_departure_transfer_rules(to_stop_id) {
                result.push(Transfer {
                    from_stop_id: from_stop_id.to_owned(),
                    to_stop_id: to_stop_id.to_owned(),
                    min_transfer_time: single_min_transfer_time(&transfers),
                    ..Default::default()
                });
            } else {
                for to_route_id in self.routes_serving(to_stop_id) {
                    if let Some(rule) =
                        most_specific_rule(&transfers, from_route_id, Some(to_route_id))
                    {
                        result.push(Transfer {
                            from_route_id: from_route_id.map(str::to_owned),
                            to_route_id: Some(to_route_id.to_owned()),
                            ..rule.clone()
                        });
                    }
                }
            }
        }
        result
    }

    fn routes_serving(&self, stop_id: &str) -> impl Iterator<Item = &str> {
        self.routes_by_stop
            .get(stop_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

/// The minimum time of a group of rules is only kept when it is not ambiguous
fn single_min_transfer_time(transfers: &[&Transfer]) -> Option<u32> {
    match transfers {
        [transfer] => transfer.min_transfer_time,
        _ => None,
    }
}

/// Replace the stations of the transfers by each of their stop points
fn explode_transfers(feed: &Feed) -> Vec<Transfer> {
    let stop_points_of = |stop_id: &str| -> Vec<String> {
        match feed.stops.get(stop_id) {
            Some(stop) if stop.location_type == LocationType::StopArea => feed
                .stops
                .values()
                .filter(|s| {
                    s.location_type == LocationType::StopPoint
                        && s.parent_station.as_deref() == Some(stop_id)
                })
                .map(|s| s.id.clone())
                .collect(),
            Some(_) => vec![stop_id.to_owned()],
            None => {
                warn!("transfer references unknown stop '{}'", stop_id);
                vec![stop_id.to_owned()]
            }
        }
    };
    let mut transfers = Vec::new();
    for transfer in feed.transfers.values() {
        for from_stop_id in stop_points_of(&transfer.from_stop_id) {
            for to_stop_id in stop_points_of(&transfer.to_stop_id) {
                transfers.push(Transfer {
                    from_stop_id: from_stop_id.clone(),
                    to_stop_id,
                    ..transfer.clone()
                });
            }
        }
    }
    transfers
}
