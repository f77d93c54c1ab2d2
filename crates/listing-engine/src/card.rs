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

//! Property detail card and its photo carousel.
//!
//! Photos are addressed either by the `{base}{mls}_{n}.jpg` naming scheme or
//! by the listing's own `photo` field. Each photo tracks its own load state;
//! a failed image shows the placeholder without affecting the others and is
//! never retried.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::format;
use crate::model::Listing;

/// Upper bound on carousel photos per listing.
pub const MAX_PHOTOS: usize = 5;

/// File shown in place of a missing or broken photo.
pub const PLACEHOLDER_FILE: &str = "no-image.jpg";

/// How photo URLs are derived for a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoMode {
    /// `{base}{mls}_{n}.jpg` for `n` in `1..=MAX_PHOTOS`.
    #[default]
    Convention,
    /// The listing's explicit `photo` URL.
    Field,
}

/// Photo URL builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSource {
    mode: PhotoMode,
    base_url: String,
}

impl PhotoSource {
    pub fn new(mode: PhotoMode, base_url: impl Into<String>) -> Self {
        Self {
            mode,
            base_url: base_url.into(),
        }
    }

    /// Ordered photo URLs for `listing`, at most [`MAX_PHOTOS`].
    #[must_use]
    pub fn urls(&self, listing: &Listing) -> Vec<String> {
        match self.mode {
            PhotoMode::Convention => (1..=MAX_PHOTOS)
                .map(|n| format!("{}{}_{n}.jpg", self.base_url, listing.mls))
                .collect(),
            PhotoMode::Field => listing
                .photo_ref
                .iter()
                .filter(|url| !url.is_empty())
                .take(MAX_PHOTOS)
                .cloned()
                .collect(),
        }
    }

    /// First photo, used for sidebar thumbnails and marker previews.
    #[must_use]
    pub fn thumbnail(&self, listing: &Listing) -> Option<String> {
        self.urls(listing).into_iter().next()
    }

    #[must_use]
    pub fn placeholder(&self) -> String {
        format!("{}{}", self.base_url, PLACEHOLDER_FILE)
    }
}

/// Load state of a single photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoState {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub url: String,
    pub state: PhotoState,
}

/// Wrapping photo carousel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Carousel {
    photos: Vec<Photo>,
    index: usize,
}

impl Carousel {
    #[must_use]
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            photos: urls
                .into_iter()
                .map(|url| Photo {
                    url,
                    state: PhotoState::Pending,
                })
                .collect(),
            index: 0,
        }
    }

    pub fn next(&mut self) {
        if self.photos.len() > 1 {
            self.index = (self.index + 1) % self.photos.len();
        }
    }

    pub fn prev(&mut self) {
        if self.photos.len() > 1 {
            self.index = (self.index + self.photos.len() - 1) % self.photos.len();
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Photo> {
        self.photos.get(self.index)
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    fn set_state(&mut self, url: &str, state: PhotoState) {
        for photo in self.photos.iter_mut().filter(|p| p.url == url) {
            photo.state = state;
        }
    }
}

/// Everything the card displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub mls: Option<String>,
    pub price: String,
    pub address: String,
    pub details: String,
    pub sold_note: Option<String>,
    /// Target of the "view details" link; disabled when absent.
    pub view_url: Option<String>,
    /// Image to draw: the current photo, or the placeholder.
    pub image: String,
    pub image_failed: bool,
    /// e.g. `2 / 5`; empty when there are no photos.
    pub position: String,
    pub show_arrows: bool,
}

/// Detail card for the selected listing.
#[derive(Debug, Clone)]
pub struct PropertyCardPresenter {
    source: PhotoSource,
    listing: Option<Listing>,
    carousel: Carousel,
}

impl PropertyCardPresenter {
    #[must_use]
    pub fn new(source: PhotoSource) -> Self {
        Self {
            source,
            listing: None,
            carousel: Carousel::default(),
        }
    }

    /// Show `listing`, starting its carousel at the first photo.
    pub fn show(&mut self, listing: Listing) {
        self.carousel = Carousel::new(self.source.urls(&listing));
        self.listing = Some(listing);
    }

    /// Back to the empty placeholder card.
    pub fn clear(&mut self) {
        self.listing = None;
        self.carousel = Carousel::default();
    }

    pub fn next(&mut self) {
        self.carousel.next();
    }

    pub fn prev(&mut self) {
        self.carousel.prev();
    }

    pub fn mark_loaded(&mut self, url: &str) {
        self.carousel.set_state(url, PhotoState::Loaded);
    }

    /// Record a failed image; it will render as the placeholder from now on.
    pub fn mark_failed(&mut self, url: &str) {
        self.carousel.set_state(url, PhotoState::Failed);
    }

    #[must_use]
    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref()
    }

    #[must_use]
    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    #[must_use]
    pub fn photo_source(&self) -> &PhotoSource {
        &self.source
    }

    #[must_use]
    pub fn view(&self, now: DateTime<Utc>) -> CardView {
        let (image, image_failed) = match self.carousel.current() {
            Some(photo) if photo.state == PhotoState::Failed => (self.source.placeholder(), true),
            Some(photo) => (photo.url.clone(), false),
            None => (self.source.placeholder(), false),
        };
        let position = if self.carousel.is_empty() {
            String::new()
        } else {
            format!("{} / {}", self.carousel.index() + 1, self.carousel.len())
        };

        let Some(listing) = &self.listing else {
            return CardView {
                mls: None,
                price: format::PLACEHOLDER.to_string(),
                address: "Select a listing".to_string(),
                details: String::new(),
                sold_note: None,
                view_url: None,
                image,
                image_failed,
                position,
                show_arrows: false,
            };
        };

        let count = |v: Option<f64>| v.map_or_else(|| "?".to_string(), |n| format!("{n}"));
        CardView {
            mls: Some(listing.mls.clone()),
            price: format::or_placeholder(listing.price, format::currency),
            address: listing
                .address
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "Unknown address".to_string()),
            details: format!("{} bd | {} ba", count(listing.beds), count(listing.baths)),
            sold_note: listing.sold_date.map(|d| time_since_sold(d, now)),
            view_url: listing.url.clone().filter(|u| !u.is_empty()),
            image,
            image_failed,
            position,
            show_arrows: self.carousel.len() > 1,
        }
    }
}

/// Relative sold time: minutes under an hour, hours under a day, else days.
#[must_use]
pub fn time_since_sold(sold: NaiveDate, now: DateTime<Utc>) -> String {
    let sold_at = sold.and_time(chrono::NaiveTime::MIN).and_utc();
    let minutes = (now - sold_at).num_minutes().max(0);
    if minutes < 60 {
        return format!("{minutes} min ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours} hrs ago");
    }
    format!("{} days ago", hours / 24)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn listing() -> Listing {
        Listing {
            mls: "X123".to_string(),
            latitude: 45.4,
            longitude: -75.7,
            price: Some(725_500.0),
            beds: Some(4.0),
            baths: None,
            sold_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            days_on_market: Some(9.0),
            price_diff_pct: Some(2.0),
            address: None,
            url: Some("https://listing.example/X123".to_string()),
            photo_ref: Some("https://blob.example/x123.jpg".to_string()),
        }
    }

    fn card() -> PropertyCardPresenter {
        PropertyCardPresenter::new(PhotoSource::new(PhotoMode::Convention, "https://img/"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_convention_builds_bounded_photo_list() {
        let source = PhotoSource::new(PhotoMode::Convention, "https://img/");
        let urls = source.urls(&listing());
        assert_eq!(urls.len(), MAX_PHOTOS);
        assert_eq!(urls[0], "https://img/X123_1.jpg");
        assert_eq!(urls[4], "https://img/X123_5.jpg");
    }

    #[test]
    fn test_field_mode_uses_photo_column() {
        let source = PhotoSource::new(PhotoMode::Field, "https://img/");
        assert_eq!(source.urls(&listing()), vec!["https://blob.example/x123.jpg".to_string()]);

        let mut bare = listing();
        bare.photo_ref = None;
        assert!(source.urls(&bare).is_empty());
    }

    #[test]
    fn test_carousel_wraps_both_ways() {
        let mut card = card();
        card.show(listing());
        card.prev();
        assert_eq!(card.carousel().index(), 4);
        card.next();
        assert_eq!(card.carousel().index(), 0);
        card.next();
        assert_eq!(card.view(now()).position, "2 / 5");
    }

    #[test]
    fn test_failed_photo_falls_back_per_image() {
        let mut card = card();
        card.show(listing());
        card.mark_failed("https://img/X123_1.jpg");

        let view = card.view(now());
        assert!(view.image_failed);
        assert_eq!(view.image, "https://img/no-image.jpg");

        card.next();
        let view = card.view(now());
        assert!(!view.image_failed);
        assert_eq!(view.image, "https://img/X123_2.jpg");
    }

    #[test]
    fn test_card_fields() {
        let mut card = card();
        card.show(listing());
        let view = card.view(now());
        assert_eq!(view.price, "$725,500");
        assert_eq!(view.address, "Unknown address");
        assert_eq!(view.details, "4 bd | ? ba");
        assert_eq!(view.sold_note.as_deref(), Some("10 days ago"));
        assert!(view.show_arrows);
        assert!(view.view_url.is_some());
    }

    #[test]
    fn test_cleared_card_shows_placeholder() {
        let mut card = card();
        card.show(listing());
        card.clear();
        let view = card.view(now());
        assert_eq!(view.mls, None);
        assert_eq!(view.image, "https://img/no-image.jpg");
        assert!(!view.show_arrows);
    }

    #[test]
    fn test_time_since_sold() {
        let sold = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        let at = |h, m| Utc.with_ymd_and_hms(2025, 1, 20, h, m, 0).unwrap();
        assert_eq!(time_since_sold(sold, at(0, 42)), "42 min ago");
        assert_eq!(time_since_sold(sold, at(5, 0)), "5 hrs ago");
        assert_eq!(time_since_sold(sold, now() + chrono::Duration::days(2)), "2 days ago");
    }
}
