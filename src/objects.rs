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

//! The different objects contained in a transit feed.

use crate::serde_utils::*;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use typed_index_collection::impl_id;

/// A calendar date
pub type Date = chrono::NaiveDate;

/// Errors raised while parsing a `Time`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    /// The string is not made of 3 `:` separated parts
    #[error("time format should be HH:MM:SS")]
    WrongFormat,
    /// One of the parts is not an integer, or minutes/seconds are out of range
    #[error("time value is not valid")]
    WrongValue,
}

/// A time of the service day, in seconds since midnight.
///
/// Values may exceed 24h for trips running past midnight (`25:30:00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time(u32);

impl Time {
    /// Build a time from hours, minutes and seconds
    pub fn new(h: u32, m: u32, s: u32) -> Time {
        Time(
            h.saturating_mul(3600)
                .saturating_add(m.saturating_mul(60))
                .saturating_add(s),
        )
    }
    /// Build a time from a number of seconds since midnight
    pub fn from_seconds(seconds: u32) -> Time {
        Time(seconds)
    }
    /// Hours part of the time
    pub fn hours(self) -> u32 {
        self.0 / 3600
    }
    /// Minutes part of the time
    pub fn minutes(self) -> u32 {
        self.0 / 60 % 60
    }
    /// Seconds part of the time
    pub fn seconds(self) -> u32 {
        self.0 % 60
    }
    /// Number of seconds since midnight
    pub fn total_seconds(self) -> u32 {
        self.0
    }
}

impl FromStr for Time {
    type Err = TimeError;
    fn from_str(time: &str) -> Result<Self, Self::Err> {
        let mut t = time.split(':');
        let (hours, minutes, seconds) = match (t.next(), t.next(), t.next(), t.next()) {
            (Some(h), Some(m), Some(s), None) => (h, m, s),
            _ => return Err(TimeError::WrongFormat),
        };
        let hours: u32 = hours.trim().parse().map_err(|_| TimeError::WrongValue)?;
        let minutes: u32 = minutes.parse().map_err(|_| TimeError::WrongValue)?;
        let seconds: u32 = seconds.parse().map_err(|_| TimeError::WrongValue)?;
        if minutes > 59 || seconds > 59 {
            return Err(TimeError::WrongValue);
        }
        hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes * 60 + seconds))
            .map(Time)
            .ok_or(TimeError::WrongValue)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours(),
            self.minutes(),
            self.seconds()
        )
    }
}

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Time, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let time = String::deserialize(deserializer)?;
        time.parse().map_err(serde::de::Error::custom)
    }
}

/// WGS84 coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Longitude
    pub lon: f64,
    /// Latitude
    pub lat: f64,
}

impl From<Coord> for geo::Point<f64> {
    fn from(coord: Coord) -> Self {
        geo::Point::new(coord.lon, coord.lat)
    }
}

/// Kind of a stop, as `location_type` in GTFS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    /// A stop or platform where vehicles halt
    #[default]
    StopPoint,
    /// A station grouping several stop points
    StopArea,
    /// Entrance or exit of a station
    Entrance,
    /// Generic node of a station pathway
    GenericNode,
    /// Specific location on a platform
    BoardingArea,
}

/// An agency operating routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    /// Identifier of the agency
    #[serde(rename = "agency_id")]
    pub id: String,
    /// Name of the agency
    #[serde(rename = "agency_name", default)]
    pub name: String,
    /// Timezone in which the agency's times are expressed
    #[serde(rename = "agency_timezone")]
    pub timezone: Tz,
}
impl_id!(Agency);

/// A stop of the feed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stop {
    /// Identifier of the stop
    #[serde(rename = "stop_id")]
    pub id: String,
    /// Name of the stop
    #[serde(rename = "stop_name", default)]
    pub name: String,
    /// Location of the stop
    pub coord: Coord,
    /// Kind of stop
    #[serde(default)]
    pub location_type: LocationType,
    /// Station this stop belongs to
    #[serde(default)]
    pub parent_station: Option<String>,
}
impl_id!(Stop);

/// A route, as published to riders
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    /// Identifier of the route
    #[serde(rename = "route_id")]
    pub id: String,
    /// Agency operating the route
    pub agency_id: String,
    /// Short name, often a number
    #[serde(rename = "route_short_name", default)]
    pub short_name: Option<String>,
    /// Full name of the route
    #[serde(rename = "route_long_name", default)]
    pub long_name: Option<String>,
    /// Mode of transportation (GTFS `route_type`)
    pub route_type: u16,
}
impl_id!(Route);

/// A stop time of a trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTime {
    /// Stop served
    pub stop_id: String,
    /// Position in the trip, increasing but not necessarily contiguous
    #[serde(rename = "stop_sequence")]
    pub sequence: u32,
    /// Arrival time at the stop
    pub arrival_time: Time,
    /// Departure time from the stop
    pub departure_time: Time,
}

/// A trip, with its stop times ordered by sequence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trip {
    /// Identifier of the trip
    #[serde(rename = "trip_id")]
    pub id: String,
    /// Route of the trip
    pub route_id: String,
    /// Calendar of the trip
    pub service_id: String,
    /// Block the trip belongs to, if operated in sequence with other trips
    #[serde(default)]
    pub block_id: Option<String>,
    /// Displayed destination
    #[serde(rename = "trip_headsign", default)]
    pub headsign: Option<String>,
    /// Stop times of the trip
    #[serde(default)]
    pub stop_times: Vec<StopTime>,
}
impl_id!(Trip);

/// A frequency rule: the trip repeats every `headway_secs` between
/// `start_time` (included) and `end_time` (excluded)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frequency {
    /// Trip following this rule
    pub trip_id: String,
    /// First departure of the first stop
    pub start_time: Time,
    /// No departure happens at or after this time
    pub end_time: Time,
    /// Seconds between two departures
    pub headway_secs: u32,
}

/// Set of dates on which a service runs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Calendar {
    /// Identifier of the service
    #[serde(rename = "service_id")]
    pub id: String,
    /// Dates of operation
    #[serde(
        deserialize_with = "de_from_date_set",
        serialize_with = "ser_from_date_set",
        default
    )]
    pub dates: BTreeSet<Date>,
}
impl_id!(Calendar);

/// Kind of transfer, as `transfer_type` in GTFS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    /// Recommended transfer point
    #[default]
    Recommended,
    /// The departing vehicle waits for the arriving one
    Timed,
    /// A minimum time is required between arrival and departure
    MinimumTime,
    /// Transfer not possible
    NotPossible,
}

/// A declared transfer between two stops
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transfer {
    /// Stop where the transfer starts
    pub from_stop_id: String,
    /// Stop where the transfer ends
    pub to_stop_id: String,
    /// Restrict the transfer to arrivals of this route
    #[serde(default)]
    pub from_route_id: Option<String>,
    /// Restrict the transfer to departures of this route
    #[serde(default)]
    pub to_route_id: Option<String>,
    /// Kind of transfer
    #[serde(default)]
    pub transfer_type: TransferType,
    /// Minimum time in seconds between arrival and departure
    #[serde(default)]
    pub min_transfer_time: Option<u32>,
}
