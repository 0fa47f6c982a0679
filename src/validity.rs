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

//! Deduplication of the day-validity patterns of trips.
//!
//! Edges only carry the compact id of a pattern. Ids are handed out in order
//! of first appearance, so replaying the same input always yields the same
//! ids.

use crate::objects::Date;
use bit_set::BitSet;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::hash::Hash;

/// Interns values, giving each distinct value the number of values interned
/// before it.
#[derive(Debug, Clone)]
pub struct Interner<T> {
    ids: HashMap<T, u32>,
    values: Vec<T>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Interner {
            ids: HashMap::new(),
            values: Vec::new(),
        }
    }
}

impl<T: Hash + Eq + Clone> Interner<T> {
    /// Id of `value`, interning it if never seen before
    pub fn get_or_insert(&mut self, value: T) -> u32 {
        if let Some(&id) = self.ids.get(&value) {
            return id;
        }
        let id = self.values.len() as u32;
        self.values.push(value.clone());
        self.ids.insert(value, id);
        id
    }

    /// Value interned with `id`
    pub fn get(&self, id: u32) -> Option<&T> {
        self.values.get(id as usize)
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Nothing interned yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.values.iter().enumerate().map(|(id, v)| (id as u32, v))
    }
}

/// Service days of an edge, bit `d` standing for `start_date + d`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidityPattern {
    /// Days of validity
    pub validity: BitSet,
    /// Timezone in which days start
    pub zone_id: Tz,
    /// Date of bit 0
    pub start_date: Date,
}

impl ValidityPattern {
    /// Whether the pattern covers `date`
    pub fn is_valid_on(&self, date: Date) -> bool {
        let day = (date - self.start_date).num_days();
        usize::try_from(day).map_or(false, |day| self.validity.contains(day))
    }
}

/// A feed and the timezone of its timetables
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedIdWithTimezone {
    /// Identifier of the feed
    pub feed_id: String,
    /// Timezone of the feed
    pub zone_id: Tz,
}

/// Registry of the validity patterns of a transit network
#[derive(Debug, Clone, Default)]
pub struct ValidityPatternRegistry {
    patterns: Interner<ValidityPattern>,
}

impl ValidityPatternRegistry {
    /// Id of the pattern, interning it if no equal pattern exists yet
    pub fn intern_pattern(&mut self, validity: BitSet, zone_id: Tz, start_date: Date) -> u32 {
        self.patterns.get_or_insert(ValidityPattern {
            validity,
            zone_id,
            start_date,
        })
    }

    /// Pattern of an id
    pub fn get(&self, id: u32) -> Option<&ValidityPattern> {
        self.patterns.get(id)
    }

    /// Whether the pattern `id` covers `date`; unknown ids are never valid
    pub fn is_valid_on(&self, id: u32, date: Date) -> bool {
        self.get(id).map_or(false, |p| p.is_valid_on(date))
    }

    /// Number of distinct patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// No pattern interned yet
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ValidityPattern)> {
        self.patterns.iter()
    }
}

/// Move every day of `validity` `day_shift` days later.
///
/// Used for stop times past midnight: a trip of service day `d` leaving at
/// `25:30:00` leaves on calendar day `d + 1`.
pub fn shift_validity(validity: &BitSet, day_shift: u32) -> BitSet {
    if day_shift == 0 {
        return validity.clone();
    }
    validity.iter().map(|day| day + day_shift as usize).collect()
}
