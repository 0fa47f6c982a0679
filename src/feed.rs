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

//! A parsed transit feed, input of the network construction.

use crate::error::BuildError;
use crate::objects::*;
use crate::serde_utils::*;
use crate::Result;
use anyhow::{anyhow, Context};
use bit_set::BitSet;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use typed_index_collection::{Collection, CollectionWithId};

/// Name given to vehicles whose route is unknown or has no name
const UNKNOWN_ROUTE_NAME: &str = "extra";

/// JSON representation of a feed
#[derive(Debug, Serialize, Deserialize)]
struct FeedData {
    #[serde(
        deserialize_with = "de_from_date_string",
        serialize_with = "ser_from_naive_date"
    )]
    start_date: Date,
    #[serde(
        deserialize_with = "de_from_date_string",
        serialize_with = "ser_from_naive_date"
    )]
    end_date: Date,
    #[serde(default)]
    agencies: Vec<Agency>,
    #[serde(default)]
    stops: Vec<Stop>,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    trips: Vec<Trip>,
    #[serde(default)]
    calendars: Vec<Calendar>,
    #[serde(default)]
    frequencies: Vec<Frequency>,
    #[serde(default)]
    transfers: Vec<Transfer>,
}

/// Index stops by id, refusing a stop id used twice in `feed`
fn stop_collection(stops: Vec<Stop>, feed: &str) -> Result<CollectionWithId<Stop>> {
    let mut seen = HashSet::new();
    if let Some(duplicate) = stops.iter().find(|stop| !seen.insert(stop.id.as_str())) {
        return Err(BuildError::DuplicateStop {
            feed_id: feed.to_owned(),
            stop_id: duplicate.id.clone(),
        }
        .into());
    }
    Ok(CollectionWithId::new(stops)?)
}

/// All the objects of a feed, with its validity period
#[derive(Debug)]
pub struct Feed {
    /// Agencies
    pub agencies: CollectionWithId<Agency>,
    /// Stops
    pub stops: CollectionWithId<Stop>,
    /// Routes
    pub routes: CollectionWithId<Route>,
    /// Trips, with their stop times sorted by sequence
    pub trips: CollectionWithId<Trip>,
    /// Calendars
    pub calendars: CollectionWithId<Calendar>,
    /// Frequency rules
    pub frequencies: Collection<Frequency>,
    /// Declared transfers
    pub transfers: Collection<Transfer>,
    /// First day of the feed, bit 0 of every validity
    pub start_date: Date,
    /// Last day of the feed, included
    pub end_date: Date,
}

impl Feed {
    /// Build a feed from its objects. Stop times of every trip get sorted by
    /// sequence.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agencies: CollectionWithId<Agency>,
        stops: CollectionWithId<Stop>,
        routes: CollectionWithId<Route>,
        mut trips: CollectionWithId<Trip>,
        calendars: CollectionWithId<Calendar>,
        frequencies: Collection<Frequency>,
        transfers: Collection<Transfer>,
        (start_date, end_date): (Date, Date),
    ) -> Result<Self> {
        if end_date < start_date {
            return Err(anyhow!(
                "feed ends on {} before it starts on {}",
                end_date,
                start_date
            ));
        }
        let mut trips = trips.take();
        for trip in &mut trips {
            trip.stop_times.sort_unstable_by_key(|st| st.sequence);
        }
        Ok(Feed {
            agencies,
            stops,
            routes,
            trips: CollectionWithId::new(trips)?,
            calendars,
            frequencies,
            transfers,
            start_date,
            end_date,
        })
    }

    /// Read a feed from a JSON file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading feed from {:?}", path);
        let file = File::open(path).with_context(|| format!("Error reading {:?}", path))?;
        let data: FeedData = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Error parsing {:?}", path))?;
        let feed = Feed::new(
            CollectionWithId::new(data.agencies)?,
            stop_collection(data.stops, &path.display().to_string())?,
            CollectionWithId::new(data.routes)?,
            CollectionWithId::new(data.trips)?,
            CollectionWithId::new(data.calendars)?,
            Collection::new(data.frequencies),
            Collection::new(data.transfers),
            (data.start_date, data.end_date),
        )?;
        info!(
            "Feed has {} stops, {} routes and {} trips from {} to {}",
            feed.stops.len(),
            feed.routes.len(),
            feed.trips.len(),
            feed.start_date,
            feed.end_date
        );
        Ok(feed)
    }

    /// Number of days of the feed
    pub fn day_count(&self) -> usize {
        (self.end_date - self.start_date).num_days() as usize + 1
    }

    /// Days of the feed on which a service runs
    pub fn validity(&self, service_id: &str) -> Result<BitSet> {
        let calendar = self
            .calendars
            .get(service_id)
            .ok_or_else(|| BuildError::UnknownService(service_id.to_owned()))?;
        Ok(calendar
            .dates
            .range(self.start_date..=self.end_date)
            .map(|date| (*date - self.start_date).num_days() as usize)
            .collect())
    }

    /// Frequency rules of a trip, sorted
    pub fn frequencies_of(&self, trip_id: &str) -> Vec<&Frequency> {
        let mut frequencies: Vec<&Frequency> = self
            .frequencies
            .values()
            .filter(|f| f.trip_id == trip_id)
            .collect();
        frequencies.sort();
        frequencies
    }

    /// Display name of the vehicle of a trip: route name and headsign
    pub fn route_name(&self, trip: &Trip) -> String {
        let route_part = self
            .routes
            .get(&trip.route_id)
            .and_then(|r| r.long_name.as_deref().or(r.short_name.as_deref()))
            .unwrap_or(UNKNOWN_ROUTE_NAME);
        format!(
            "{} {}",
            route_part,
            trip.headsign.as_deref().unwrap_or_default()
        )
    }

    /// Timezone of the agency operating a route
    pub fn zone_id(&self, route_id: &str) -> Result<Tz> {
        let route = self
            .routes
            .get(route_id)
            .ok_or_else(|| BuildError::UnknownRoute(route_id.to_owned()))?;
        let agency = self
            .agencies
            .get(&route.agency_id)
            .ok_or_else(|| BuildError::UnknownAgency(route.agency_id.clone()))?;
        Ok(agency.timezone)
    }

    /// Timezone of the first agency, in which the feed's timelines are expressed
    pub fn default_zone_id(&self) -> Result<Tz> {
        self.agencies
            .values()
            .next()
            .map(|a| a.timezone)
            .ok_or_else(|| anyhow!("feed has no agency"))
    }

    /// Route type of a route
    pub fn route_type(&self, route_id: &str) -> Result<u16> {
        self.routes
            .get(route_id)
            .map(|r| r.route_type)
            .ok_or_else(|| BuildError::UnknownRoute(route_id.to_owned()).into())
    }

    /// Stop by id
    pub fn stop(&self, stop_id: &str) -> Result<&Stop> {
        self.stops
            .get(stop_id)
            .ok_or_else(|| BuildError::UnknownStop(stop_id.to_owned()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed_builder::FeedBuilder;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn date(d: u32) -> Date {
        Date::from_ymd_opt(2019, 1, d).unwrap()
    }

    #[test]
    fn validity_is_indexed_from_start_date() {
        let feed = FeedBuilder::default()
            .calendar("c1", |c| {
                c.dates.insert(date(2));
                c.dates.insert(date(4));
                // outside of the feed
                c.dates.insert(Date::from_ymd_opt(2019, 2, 1).unwrap());
            })
            .validity_period(date(1), date(7))
            .build();
        let expected: BitSet = vec![1, 3].into_iter().collect();
        assert_eq!(expected, feed.validity("c1").unwrap());
        assert_eq!(7, feed.day_count());
    }

    #[test]
    fn unknown_service() {
        let feed = FeedBuilder::default().build();
        let error = feed.validity("unknown").unwrap_err();
        assert_eq!(
            Some(&BuildError::UnknownService("unknown".into())),
            error.downcast_ref::<BuildError>()
        );
    }

    #[test]
    fn route_name_falls_back_to_short_name() {
        let feed = FeedBuilder::default()
            .route("r1", |r| {
                r.short_name = Some("42".into());
            })
            .route("r2", |r| {
                r.short_name = Some("43".into());
                r.long_name = Some("Gare - Port".into());
            })
            .trip("t1", |t| {
                t.route("r1").headsign("Port");
            })
            .trip("t2", |t| {
                t.route("r2").headsign("Gare");
            })
            .build();
        assert_eq!("42 Port", feed.route_name(feed.trips.get("t1").unwrap()));
        assert_eq!("Gare - Port Gare", feed.route_name(feed.trips.get("t2").unwrap()));
        let unknown = Trip {
            route_id: "unknown".into(),
            ..Default::default()
        };
        assert_eq!("extra ", feed.route_name(&unknown));
    }

    #[test]
    fn duplicate_stop_in_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "start_date": "20190101",
                "end_date": "20190107",
                "stops": [
                    {{ "stop_id": "A", "stop_name": "Gare", "coord": {{ "lon": 2.35, "lat": 48.84 }} }},
                    {{ "stop_id": "B", "stop_name": "Bastille", "coord": {{ "lon": 2.36, "lat": 48.85 }} }},
                    {{ "stop_id": "A", "stop_name": "Gare bis", "coord": {{ "lon": 2.37, "lat": 48.86 }} }}
                ]
            }}"#
        )
        .unwrap();
        let error = Feed::read(file.path()).unwrap_err();
        assert_eq!(
            Some(&BuildError::DuplicateStop {
                feed_id: file.path().display().to_string(),
                stop_id: "A".into(),
            }),
            error.downcast_ref::<BuildError>()
        );
    }

    #[test]
    fn stop_times_are_sorted_by_sequence() {
        let trip = Trip {
            id: "t1".into(),
            stop_times: vec![
                StopTime {
                    stop_id: "B".into(),
                    sequence: 5,
                    arrival_time: Time::new(10, 0, 0),
                    departure_time: Time::new(10, 0, 0),
                },
                StopTime {
                    stop_id: "A".into(),
                    sequence: 1,
                    arrival_time: Time::new(9, 0, 0),
                    departure_time: Time::new(9, 0, 0),
                },
            ],
            ..Default::default()
        };
        let feed = Feed::new(
            CollectionWithId::default(),
            CollectionWithId::default(),
            CollectionWithId::default(),
            CollectionWithId::new(vec![trip]).unwrap(),
            CollectionWithId::default(),
            Collection::default(),
            Collection::default(),
            (date(1), date(1)),
        )
        .unwrap();
        let stops: Vec<&str> = feed.trips.get("t1").unwrap().stop_times
            .iter()
            .map(|st| st.stop_id.as_str())
            .collect();
        assert_eq!(vec!["A", "B"], stops);
    }

    #[test]
    fn period_must_not_be_reversed() {
        let feed = Feed::new(
            CollectionWithId::default(),
            CollectionWithId::default(),
            CollectionWithId::default(),
            CollectionWithId::default(),
            CollectionWithId::default(),
            Collection::default(),
            Collection::default(),
            (date(2), date(1)),
        );
        assert!(feed.is_err());
    }
}
