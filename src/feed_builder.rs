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

//! Provides an easy way to create a `crate::Feed`
//!
//! ```
//! # fn main() {
//!  let feed = transit_graph::feed_builder::FeedBuilder::default()
//!      .trip("toto", |t| {
//!          t.route("1")
//!            .st("A", "10:00:00", "10:01:00")
//!            .st("B", "11:00:00", "11:01:00");
//!      })
//!      .trip("tata", |t| {
//!          t.st("A", "10:00:00", "10:01:00")
//!            .st("D", "11:00:00", "11:01:00");
//!      })
//!      .build();
//! # }
//! ```

use crate::feed::Feed;
use crate::objects::*;
use chrono_tz::Tz;
use typed_index_collection::{Collection, CollectionWithId, Idx};

/// Agency of the routes created by the builder
pub const DEFAULT_AGENCY: &str = "default_agency";
/// Route of the trips created without one
pub const DEFAULT_ROUTE: &str = "default_route";
/// Calendar of the trips created without one, running every day of the feed
pub const DEFAULT_CALENDAR: &str = "default_service";
/// Route type of the routes created by the builder (bus)
pub const DEFAULT_ROUTE_TYPE: u16 = 3;

/// Builder used to easily create a `Feed`
pub struct FeedBuilder {
    agencies: CollectionWithId<Agency>,
    stops: CollectionWithId<Stop>,
    routes: CollectionWithId<Route>,
    trips: CollectionWithId<Trip>,
    calendars: CollectionWithId<Calendar>,
    frequencies: Collection<Frequency>,
    transfers: Collection<Transfer>,
    start_date: Date,
    end_date: Date,
}

impl Default for FeedBuilder {
    fn default() -> Self {
        FeedBuilder {
            agencies: CollectionWithId::default(),
            stops: CollectionWithId::default(),
            routes: CollectionWithId::default(),
            trips: CollectionWithId::default(),
            calendars: CollectionWithId::default(),
            frequencies: Collection::default(),
            transfers: Collection::default(),
            start_date: Date::from_ymd_opt(2019, 1, 1).unwrap(),
            end_date: Date::from_ymd_opt(2019, 1, 7).unwrap(),
        }
    }
}

impl From<Feed> for FeedBuilder {
    fn from(feed: Feed) -> Self {
        FeedBuilder {
            agencies: feed.agencies,
            stops: feed.stops,
            routes: feed.routes,
            trips: feed.trips,
            calendars: feed.calendars,
            frequencies: feed.frequencies,
            transfers: feed.transfers,
            start_date: feed.start_date,
            end_date: feed.end_date,
        }
    }
}

/// Builder used to create and modify a new Trip
pub struct TripBuilder<'a> {
    feed: &'a mut FeedBuilder,
    trip_idx: Idx<Trip>,
}

impl FeedBuilder {
    /// Add a new Trip to the feed
    ///
    /// ```
    /// # fn main() {
    /// let feed = transit_graph::feed_builder::FeedBuilder::default()
    ///        .trip("toto", |trip_builder| {
    ///            trip_builder
    ///                .st("A", "10:00:00", "10:01:00")
    ///                .st("B", "11:00:00", "11:01:00");
    ///        })
    ///        .trip("tata", |trip_builder| {
    ///            trip_builder
    ///                .st("C", "08:00:00", "08:01:00")
    ///                .st("B", "09:00:00", "09:01:00");
    ///        })
    ///        .build();
    /// # }
    /// ```
    pub fn trip<F>(mut self, id: &str, mut trip_initer: F) -> Self
    where
        F: FnMut(TripBuilder),
    {
        let new_trip = Trip {
            id: id.to_owned(),
            route_id: DEFAULT_ROUTE.to_owned(),
            service_id: DEFAULT_CALENDAR.to_owned(),
            ..Default::default()
        };
        let trip_idx = self
            .trips
            .push(new_trip)
            .unwrap_or_else(|_| panic!("trip {} already exists", id));
        let trip_builder = TripBuilder {
            feed: &mut self,
            trip_idx,
        };

        trip_initer(trip_builder);
        self
    }

    /// Add or modify a Route of the feed
    ///
    /// ```
    /// # fn main() {
    /// let feed = transit_graph::feed_builder::FeedBuilder::default()
    ///      .route("l1", |r| {
    ///             r.long_name = Some("ligne 1".to_owned());
    ///         })
    ///      .trip("toto", |t| {
    ///          t.route("l1")
    ///            .st("A", "10:00:00", "10:01:00")
    ///            .st("B", "11:00:00", "11:01:00");
    ///      })
    ///      .build();
    /// # }
    /// ```
    pub fn route<F>(mut self, id: &str, route_initer: F) -> Self
    where
        F: FnOnce(&mut Route),
    {
        let mut route = self
            .routes
            .get_or_create_with(id, || default_route(id));
        route_initer(&mut *route);
        drop(route);
        self
    }

    /// Add or modify a Calendar of the feed
    pub fn calendar<F>(mut self, id: &str, calendar_initer: F) -> Self
    where
        F: FnOnce(&mut Calendar),
    {
        let mut calendar = self.calendars.get_or_create_with(id, || Calendar {
            id: id.to_owned(),
            ..Default::default()
        });
        calendar_initer(&mut *calendar);
        drop(calendar);
        self
    }

    /// Add or modify an Agency of the feed
    pub fn agency<F>(mut self, id: &str, agency_initer: F) -> Self
    where
        F: FnOnce(&mut Agency),
    {
        let mut agency = self
            .agencies
            .get_or_create_with(id, || default_agency(id));
        agency_initer(&mut *agency);
        drop(agency);
        self
    }

    /// Add or move a stop
    pub fn stop(self, id: &str, lon: f64, lat: f64) -> Self {
        self.stop_with(id, |s| s.coord = Coord { lon, lat })
    }

    /// Add or modify a stop
    pub fn stop_with<F>(mut self, id: &str, stop_initer: F) -> Self
    where
        F: FnOnce(&mut Stop),
    {
        find_or_create_stop(&mut self.stops, id);
        let mut stop = self
            .stops
            .get_mut(id)
            .unwrap_or_else(|| panic!("stop {} not found", id));
        stop_initer(&mut *stop);
        drop(stop);
        self
    }

    /// Add a frequency rule to a trip
    pub fn frequency(
        mut self,
        trip_id: &str,
        start_time: impl IntoTime,
        end_time: impl IntoTime,
        headway_secs: u32,
    ) -> Self {
        self.frequencies.push(Frequency {
            trip_id: trip_id.to_owned(),
            start_time: start_time.into_time(),
            end_time: end_time.into_time(),
            headway_secs,
        });
        self
    }

    /// Add a minimum time transfer between two stops
    pub fn transfer(self, from_stop_id: &str, to_stop_id: &str, min_transfer_time: u32) -> Self {
        self.transfer_with(Transfer {
            from_stop_id: from_stop_id.to_owned(),
            to_stop_id: to_stop_id.to_owned(),
            transfer_type: TransferType::MinimumTime,
            min_transfer_time: Some(min_transfer_time),
            ..Default::default()
        })
    }

    /// Add a transfer
    pub fn transfer_with(mut self, transfer: Transfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    /// Set the first and last days of the feed
    pub fn validity_period(mut self, start_date: Date, end_date: Date) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Consume the builder to create a feed
    pub fn build(mut self) -> Feed {
        if let Some(mut calendar) = self.calendars.get_mut(DEFAULT_CALENDAR) {
            if calendar.dates.is_empty() {
                calendar.dates = self
                    .start_date
                    .iter_days()
                    .take_while(|d| *d <= self.end_date)
                    .collect();
            }
        }
        Feed::new(
            self.agencies,
            self.stops,
            self.routes,
            self.trips,
            self.calendars,
            self.frequencies,
            self.transfers,
            (self.start_date, self.end_date),
        )
        .unwrap()
    }
}

fn default_route(id: &str) -> Route {
    Route {
        id: id.to_owned(),
        agency_id: DEFAULT_AGENCY.to_owned(),
        route_type: DEFAULT_ROUTE_TYPE,
        ..Default::default()
    }
}

fn default_agency(id: &str) -> Agency {
    Agency {
        id: id.to_owned(),
        name: id.to_owned(),
        timezone: Tz::Europe__Paris,
    }
}

fn find_or_create_stop(stops: &mut CollectionWithId<Stop>, id: &str) -> Idx<Stop> {
    stops.get_idx(id).unwrap_or_else(|| {
        // spread the stops so that they do not all share a location
        let coord = Coord {
            lon: 2.35 + 0.001 * stops.len() as f64,
            lat: 48.85,
        };
        stops
            .push(Stop {
                id: id.to_owned(),
                name: id.to_owned(),
                coord,
                ..Default::default()
            })
            .unwrap_or_else(|_| panic!("stop {} already exists", id))
    })
}

/// Conversion of the times given to the builders
pub trait IntoTime {
    /// Convert into a `Time`
    fn into_time(self) -> Time;
}

impl IntoTime for Time {
    fn into_time(self) -> Time {
        self
    }
}

impl IntoTime for &Time {
    fn into_time(self) -> Time {
        *self
    }
}

impl IntoTime for &str {
    // Note: if the string is not in the right format, this conversion will fail
    fn into_time(self) -> Time {
        self.parse().unwrap()
    }
}

impl<'a> TripBuilder<'a> {
    /// Add a StopTime to the trip, with the next sequence number
    ///
    /// ```
    /// # fn main() {
    /// let feed = transit_graph::feed_builder::FeedBuilder::default()
    ///        .trip("toto", |trip_builder| {
    ///            trip_builder
    ///                .st("A", "10:00:00", "10:01:00")
    ///                .st("B", "11:00:00", "11:01:00");
    ///        })
    ///        .build();
    /// # }
    /// ```
    pub fn st(self, stop_id: &str, arrival: impl IntoTime, departure: impl IntoTime) -> Self {
        let sequence = self
            .feed
            .trips
            .index_mut(self.trip_idx)
            .stop_times
            .last()
            .map_or(0, |st| st.sequence + 1);
        self.st_with_sequence(sequence, stop_id, arrival, departure)
    }

    /// Add a StopTime to the trip with an explicit sequence number
    pub fn st_with_sequence(
        self,
        sequence: u32,
        stop_id: &str,
        arrival: impl IntoTime,
        departure: impl IntoTime,
    ) -> Self {
        find_or_create_stop(&mut self.feed.stops, stop_id);
        {
            let mut trip = self.feed.trips.index_mut(self.trip_idx);
            trip.stop_times.push(StopTime {
                stop_id: stop_id.to_owned(),
                sequence,
                arrival_time: arrival.into_time(),
                departure_time: departure.into_time(),
            });
        }

        self
    }

    /// Set the route of the trip
    pub fn route(self, id: &str) -> Self {
        self.feed.trips.index_mut(self.trip_idx).route_id = id.to_owned();
        self
    }

    /// Set the calendar (service_id) of the trip
    ///
    /// ```
    /// # use transit_graph::objects::Date;
    ///
    /// # fn main() {
    /// let feed = transit_graph::feed_builder::FeedBuilder::default()
    ///        .calendar("c1", |c| {
    ///             c.dates.insert(Date::from_ymd_opt(2019, 1, 6).unwrap());
    ///         })
    ///        .trip("toto", |trip_builder| {
    ///            trip_builder.calendar("c1");
    ///        })
    ///        .build();
    /// # }
    /// ```
    pub fn calendar(self, id: &str) -> Self {
        self.feed.trips.index_mut(self.trip_idx).service_id = id.to_owned();
        self
    }

    /// Set the block of the trip
    pub fn block(self, id: &str) -> Self {
        self.feed.trips.index_mut(self.trip_idx).block_id = Some(id.to_owned());
        self
    }

    /// Set the headsign of the trip
    pub fn headsign(self, headsign: &str) -> Self {
        self.feed.trips.index_mut(self.trip_idx).headsign = Some(headsign.to_owned());
        self
    }
}

impl<'a> Drop for TripBuilder<'a> {
    fn drop(&mut self) {
        let feed = &mut *self.feed;
        // add the missing objects to the feed (route, agency, calendar)
        let new_trip = &feed.trips[self.trip_idx];
        feed.calendars
            .get_or_create_with(&new_trip.service_id, || Calendar {
                id: new_trip.service_id.clone(),
                ..Default::default()
            });
        let route = feed
            .routes
            .get_or_create_with(&new_trip.route_id, || default_route(&new_trip.route_id));
        feed.agencies
            .get_or_create_with(&route.agency_id, || default_agency(&route.agency_id));
    }
}
