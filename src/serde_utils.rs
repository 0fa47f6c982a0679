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

//! Some utilities for serialize / deserialize feed objects.

use crate::objects::Date;
use chrono::NaiveDate;
use std::collections::BTreeSet;

const DATE_FORMAT: &str = "%Y%m%d";

/// deserialize date from String
pub fn de_from_date_string<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let s = String::deserialize(deserializer)?;

    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(serde::de::Error::custom)
}

/// serialize naive date to String
// The signature of the function must pass by reference for 'serde' to be able to use the function
pub fn ser_from_naive_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let s = format!("{}", date.format(DATE_FORMAT));
    serializer.serialize_str(&s)
}

/// deserialize a list of date strings into a set of dates
pub fn de_from_date_set<'de, D>(deserializer: D) -> Result<BTreeSet<Date>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(serde::de::Error::custom))
        .collect()
}

/// serialize a set of dates as a list of date strings
pub fn ser_from_date_set<S>(dates: &BTreeSet<Date>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(dates.iter().map(|d| d.format(DATE_FORMAT).to_string()))
}
