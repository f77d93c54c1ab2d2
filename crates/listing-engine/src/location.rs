// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Grouping of listings by shared coordinate.
//!
//! Keys are built once from the full dataset. Each filtered response is then
//! re-partitioned onto those same keys so a marker keeps its identity for its
//! whole lifetime while its listing count changes with the filters.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo::LatLng;
use crate::model::Listing;

/// Decimal places kept in a location key (about 0.1 m).
pub const KEY_PRECISION: usize = 6;

/// Fixed-precision coordinate string identifying a map location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationKey(String);

impl LocationKey {
    #[must_use]
    pub fn from_coords(lat: f64, lng: f64) -> Self {
        Self(format!("{lat:.prec$},{lng:.prec$}", prec = KEY_PRECISION))
    }

    #[must_use]
    pub fn of(listing: &Listing) -> Self {
        Self::from_coords(listing.latitude, listing.longitude)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique map location and the MLS ids of the full dataset found there.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub key: LocationKey,
    pub position: LatLng,
    pub mls: Vec<String>,
}

/// Filtered listings grouped by location key.
pub type LocationMatch = BTreeMap<LocationKey, Vec<Listing>>;

/// Index of every known location.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    locations: BTreeMap<LocationKey, Location>,
}

impl LocationIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the key set from the full unfiltered dataset.
    pub fn rebuild(&mut self, points: &[Listing]) {
        self.locations.clear();
        for listing in points.iter().filter(|l| l.has_position()) {
            let key = LocationKey::of(listing);
            self.locations
                .entry(key.clone())
                .or_insert_with(|| Location {
                    key,
                    position: LatLng::of(listing),
                    mls: Vec::new(),
                })
                .mls
                .push(listing.mls.clone());
        }
        debug!(
            "Location index rebuilt: {} listings at {} locations",
            points.len(),
            self.locations.len()
        );
    }

    /// Partition a filtered result set onto the existing keys. Listings whose
    /// coordinate is not a known location are left out; the key set is never
    /// altered here.
    #[must_use]
    pub fn match_filtered(&self, filtered: &[Listing]) -> LocationMatch {
        let mut matched = LocationMatch::new();
        let mut unknown = 0usize;
        for listing in filtered {
            let key = LocationKey::of(listing);
            if self.locations.contains_key(&key) {
                matched.entry(key).or_default().push(listing.clone());
            } else {
                unknown += 1;
            }
        }
        if unknown > 0 {
            debug!("{unknown} filtered listing(s) at locations missing from the index");
        }
        matched
    }

    #[must_use]
    pub fn get(&self, key: &LocationKey) -> Option<&Location> {
        self.locations.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
