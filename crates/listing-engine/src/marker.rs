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

//! Map marker view models.
//!
//! One marker exists per known location. Rendering never creates or destroys
//! markers; it only shows, hides and re-badges them from the latest
//! location match.

use std::collections::BTreeMap;

use crate::format;
use crate::geo::LatLng;
use crate::location::{LocationIndex, LocationKey, LocationMatch};
use crate::model::Listing;
use crate::selection::Selection;

/// Label drawn on a visible marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Badge {
    /// Single listing; shows its price.
    Price(Option<f64>),
    /// Several listings at one address.
    Count(usize),
}

impl Badge {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Price(Some(price)) => format::compact_price(*price),
            Self::Price(None) => "?".to_string(),
            Self::Count(n) => n.to_string(),
        }
    }
}

/// Render state of one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    pub key: LocationKey,
    pub position: LatLng,
    pub badge: Badge,
    pub visible: bool,
    /// Highlighted because its location or listing is selected.
    pub selected: bool,
}

/// Transition requested by a marker click.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerClick {
    /// Multi-listing marker: narrow the sidebar to this location.
    Location(LocationKey),
    /// Single-listing marker: select and show this listing.
    Listing(Listing),
    /// Hidden or unknown marker.
    Ignored,
}

/// Owner of every marker's render state.
#[derive(Debug, Clone, Default)]
pub struct MarkerPresenter {
    markers: BTreeMap<LocationKey, MarkerView>,
}

impl MarkerPresenter {
    /// Create one hidden marker per indexed location.
    #[must_use]
    pub fn from_index(index: &LocationIndex) -> Self {
        let markers = index
            .iter()
            .map(|location| {
                (
                    location.key.clone(),
                    MarkerView {
                        key: location.key.clone(),
                        position: location.position,
                        badge: Badge::Count(location.mls.len()),
                        visible: false,
                        selected: false,
                    },
                )
            })
            .collect();
        Self { markers }
    }

    /// Update visibility and badges from the current filtered match.
    pub fn render(&mut self, matched: &LocationMatch, selection: &Selection) {
        for (key, marker) in &mut self.markers {
            match matched.get(key).map(Vec::as_slice) {
                Some([single]) => {
                    marker.visible = true;
                    marker.badge = Badge::Price(single.price);
                }
                Some(listings) if !listings.is_empty() => {
                    marker.visible = true;
                    marker.badge = Badge::Count(listings.len());
                }
                _ => marker.visible = false,
            }
        }
        self.restyle(matched, selection);
    }

    /// Apply selection styling without touching visibility or badges.
    pub fn restyle(&mut self, matched: &LocationMatch, selection: &Selection) {
        for (key, marker) in &mut self.markers {
            marker.selected = match selection {
                Selection::None => false,
                Selection::Location(selected) => selected == key,
                Selection::Listing(mls) => matched
                    .get(key)
                    .is_some_and(|listings| listings.iter().any(|l| &l.mls == mls)),
            };
        }
    }

    /// Resolve a click on the marker at `key`.
    #[must_use]
    pub fn click(&self, key: &LocationKey, matched: &LocationMatch) -> MarkerClick {
        let visible = self.markers.get(key).is_some_and(|m| m.visible);
        if !visible {
            return MarkerClick::Ignored;
        }
        match matched.get(key).map(Vec::as_slice) {
            Some([single]) => MarkerClick::Listing(single.clone()),
            Some(listings) if listings.len() > 1 => MarkerClick::Location(key.clone()),
            _ => MarkerClick::Ignored,
        }
    }

    #[must_use]
    pub fn get(&self, key: &LocationKey) -> Option<&MarkerView> {
        self.markers.get(key)
    }

    /// Markers currently shown on the map.
    pub fn visible(&self) -> impl Iterator<Item = &MarkerView> {
        self.markers.values().filter(|m| m.visible)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(mls: &str, lat: f64, price: f64) -> Listing {
        Listing {
            mls: mls.to_string(),
            latitude: lat,
            longitude: -75.7,
            price: Some(price),
            beds: None,
            baths: None,
            sold_date: None,
            days_on_market: None,
            price_diff_pct: None,
            address: None,
            url: None,
            photo_ref: None,
        }
    }

    fn setup() -> (LocationIndex, MarkerPresenter, Vec<Listing>) {
        let all = vec![
            listing("A", 45.41, 500_000.0),
            listing("B", 45.41, 520_000.0),
            listing("C", 45.42, 610_000.0),
        ];
        let mut index = LocationIndex::new();
        index.rebuild(&all);
        let markers = MarkerPresenter::from_index(&index);
        (index, markers, all)
    }

    #[test]
    fn test_badges_follow_match_counts() {
        let (index, mut markers, all) = setup();
        let matched = index.match_filtered(&all);
        markers.render(&matched, &Selection::None);

        let shared = markers.get(&LocationKey::of(&all[0])).unwrap();
        assert_eq!(shared.badge, Badge::Count(2));
        let single = markers.get(&LocationKey::of(&all[2])).unwrap();
        assert_eq!(single.badge, Badge::Price(Some(610_000.0)));
        assert_eq!(single.badge.label(), "$610K");
        assert_eq!(markers.visible().count(), 2);
    }

    #[test]
    fn test_unmatched_marker_hidden_not_removed() {
        let (index, mut markers, all) = setup();
        let matched = index.match_filtered(&all[..1]);
        markers.render(&matched, &Selection::None);

        assert_eq!(markers.len(), 2);
        assert_eq!(markers.visible().count(), 1);
        let shared = markers.get(&LocationKey::of(&all[0])).unwrap();
        assert_eq!(shared.badge, Badge::Price(Some(500_000.0)));
        assert!(!markers.get(&LocationKey::of(&all[2])).unwrap().visible);
    }

    #[test]
    fn test_click_resolution() {
        let (index, mut markers, all) = setup();
        let matched = index.match_filtered(&all);
        markers.render(&matched, &Selection::None);

        let shared_key = LocationKey::of(&all[0]);
        assert_eq!(
            markers.click(&shared_key, &matched),
            MarkerClick::Location(shared_key.clone())
        );
        assert_eq!(
            markers.click(&LocationKey::of(&all[2]), &matched),
            MarkerClick::Listing(all[2].clone())
        );
        assert_eq!(
            markers.click(&LocationKey::from_coords(0.0, 0.0), &matched),
            MarkerClick::Ignored
        );
    }

    #[test]
    fn test_selection_styling() {
        let (index, mut markers, all) = setup();
        let matched = index.match_filtered(&all);
        let shared_key = LocationKey::of(&all[0]);

        markers.render(&matched, &Selection::Location(shared_key.clone()));
        assert!(markers.get(&shared_key).unwrap().selected);

        markers.restyle(&matched, &Selection::Listing("C".to_string()));
        assert!(!markers.get(&shared_key).unwrap().selected);
        assert!(markers.get(&LocationKey::of(&all[2])).unwrap().selected);
    }
}
