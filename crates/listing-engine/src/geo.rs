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

//! Area-of-interest selection.
//!
//! The AOI is a circle with a draggable center handle and a radius input.
//! Dragging moves a preview circle on every pointer event; only the end of a
//! drag (or a direct center/radius edit) commits the change, which is what
//! the explorer turns into a query.

use serde::{Deserialize, Serialize};

use crate::model::Listing;

/// Largest radius a user may select, in kilometres.
pub const MAX_RADIUS_KM: f64 = 15.0;

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Position of a listing.
    #[must_use]
    pub fn of(listing: &Listing) -> Self {
        Self::new(listing.latitude, listing.longitude)
    }
}

/// Calculate great-circle distance between two points using the Haversine formula (in km).
#[must_use]
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Clamp a radius input into `[0, MAX_RADIUS_KM]`. Non-numeric input becomes 0.
#[must_use]
pub fn clamp_radius(radius_km: f64) -> f64 {
    if radius_km.is_nan() {
        return 0.0;
    }
    radius_km.clamp(0.0, MAX_RADIUS_KM)
}

/// Rectangular region the AOI center is kept inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Ottawa region served by the default deployment.
    pub const OTTAWA: Self = Self {
        south: 45.25,
        west: -76.0,
        north: 45.75,
        east: -75.4,
    };

    #[must_use]
    pub fn clamp(&self, point: LatLng) -> LatLng {
        LatLng::new(
            clamp_or(point.lat, self.south, self.north),
            clamp_or(point.lng, self.west, self.east),
        )
    }
}

fn clamp_or(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        (min + max) / 2.0
    } else {
        value.clamp(min, max)
    }
}

/// The committed area of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: LatLng,
    pub radius_km: f64,
}

impl Circle {
    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        haversine_km(self.center, point) <= self.radius_km
    }
}

/// Whether a geo mutation should be queried or is only a visual preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoChange {
    /// Visual circle moved, state not committed.
    Preview,
    /// Committed circle changed; a query is due.
    Committed,
    /// Nothing changed.
    Unchanged,
}

/// Owner of the draggable area-of-interest circle.
#[derive(Debug, Clone)]
pub struct GeoSelector {
    circle: Circle,
    bounds: Bounds,
    drag_preview: Option<LatLng>,
}

impl GeoSelector {
    #[must_use]
    pub fn new(center: LatLng, radius_km: f64, bounds: Bounds) -> Self {
        Self {
            circle: Circle {
                center: bounds.clamp(center),
                radius_km: clamp_radius(radius_km),
            },
            bounds,
            drag_preview: None,
        }
    }

    /// Move the committed center.
    pub fn set_center(&mut self, lat: f64, lng: f64) -> GeoChange {
        self.drag_preview = None;
        let center = self.bounds.clamp(LatLng::new(lat, lng));
        if center == self.circle.center {
            return GeoChange::Unchanged;
        }
        self.circle.center = center;
        GeoChange::Committed
    }

    /// Set the radius, silently clamped to the valid range.
    pub fn set_radius_km(&mut self, radius_km: f64) -> GeoChange {
        let radius_km = clamp_radius(radius_km);
        if (radius_km - self.circle.radius_km).abs() < f64::EPSILON {
            return GeoChange::Unchanged;
        }
        self.circle.radius_km = radius_km;
        GeoChange::Committed
    }

    /// Move the handle during a drag gesture. Only the visual circle follows.
    pub fn drag_to(&mut self, lat: f64, lng: f64) -> GeoChange {
        self.drag_preview = Some(self.bounds.clamp(LatLng::new(lat, lng)));
        GeoChange::Preview
    }

    /// Finish a drag gesture, committing the last preview position.
    pub fn end_drag(&mut self) -> GeoChange {
        match self.drag_preview.take() {
            Some(center) if center != self.circle.center => {
                self.circle.center = center;
                GeoChange::Committed
            }
            _ => GeoChange::Unchanged,
        }
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag_preview.is_some()
    }

    /// The committed circle used for queries.
    #[must_use]
    pub fn circle(&self) -> Circle {
        self.circle
    }

    /// The circle as currently drawn, following an in-progress drag.
    #[must_use]
    pub fn visual_circle(&self) -> Circle {
        Circle {
            center: self.drag_preview.unwrap_or(self.circle.center),
            radius_km: self.circle.radius_km,
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Count positions that fall inside the committed circle.
    pub fn count_within<I>(&self, positions: I) -> usize
    where
        I: IntoIterator<Item = LatLng>,
    {
        positions
            .into_iter()
            .filter(|p| self.circle.contains(*p))
            .count()
    }
}
