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

//! Sorted, paginated listing sidebar.
//!
//! Pages hold [`ITEMS_PER_PAGE`] rows and at most [`MAX_PAGES`] pages are
//! reachable, so anything past item 100 is never shown. Highlight requests
//! made before a render are settled at the end of that render, and callers
//! can register one-shot callbacks that fire with the finished view.

use std::cmp::Ordering;
use std::fmt;

use crate::card::PhotoSource;
use crate::format;
use crate::geo::{haversine_km, LatLng};
use crate::location::{LocationKey, LocationMatch};
use crate::model::Listing;
use crate::selection::Selection;

pub const ITEMS_PER_PAGE: usize = 20;
pub const MAX_PAGES: usize = 5;

/// Reachable page count for `count` rows.
#[must_use]
pub fn total_pages(count: usize) -> usize {
    count.div_ceil(ITEMS_PER_PAGE).min(MAX_PAGES)
}

/// Sidebar ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Closest to the AOI center first.
    #[default]
    Distance,
    PriceAsc,
    PriceDesc,
    /// Most recently sold first.
    Newest,
    Oldest,
}

impl SortKey {
    pub const ALL: [Self; 5] = [
        Self::Distance,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::Newest,
        Self::Oldest,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Distance => "Distance",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::Newest => "Newest sold",
            Self::Oldest => "Oldest sold",
        }
    }
}

/// Compare optional values, always placing missing ones last.
fn missing_last<T>(a: Option<T>, b: Option<T>, cmp: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort of `listings` by `key`.
pub fn sort_listings(listings: &mut [Listing], key: SortKey, center: LatLng) {
    match key {
        // Distances are non-negative, so their bit patterns order the same way
        SortKey::Distance => {
            listings.sort_by_cached_key(|l| haversine_km(center, LatLng::of(l)).to_bits());
        }
        SortKey::PriceAsc => {
            listings.sort_by(|a, b| missing_last(a.price, b.price, |x, y| x.total_cmp(&y)));
        }
        SortKey::PriceDesc => {
            listings.sort_by(|a, b| missing_last(a.price, b.price, |x, y| y.total_cmp(&x)));
        }
        SortKey::Newest => {
            listings.sort_by(|a, b| missing_last(a.sold_date, b.sold_date, |x, y| y.cmp(&x)));
        }
        SortKey::Oldest => {
            listings.sort_by(|a, b| missing_last(a.sold_date, b.sold_date, |x, y| x.cmp(&y)));
        }
    }
}

/// One rendered sidebar row.
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarRow {
    pub mls: String,
    pub address: String,
    pub price: String,
    pub details: String,
    pub sold: String,
    pub distance_km: f64,
    pub thumbnail: Option<String>,
    /// External listing page opened on row click.
    pub url: Option<String>,
    pub highlighted: bool,
}

/// Shown above the rows while a location is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionBanner {
    pub key: LocationKey,
    pub count: usize,
}

impl SelectionBanner {
    #[must_use]
    pub fn message(&self) -> String {
        format!("Showing {} listings at this address", self.count)
    }
}

/// Output of one sidebar render.
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarView {
    pub rows: Vec<SidebarRow>,
    pub banner: Option<SelectionBanner>,
    /// 1-based current page.
    pub page: usize,
    pub total_pages: usize,
    /// Rows in the selection-filtered list, including unreachable ones.
    pub total_count: usize,
    pub sort: SortKey,
    /// Row highlighted by this render, if any.
    pub highlighted: Option<String>,
}

type RenderCallback = Box<dyn FnOnce(&SidebarView) + Send>;

/// Sort, pagination and highlight state of the sidebar.
pub struct SidebarPresenter {
    sort: SortKey,
    page: usize,
    highlighted: Option<String>,
    pending_highlight: Option<String>,
    on_rendered: Vec<RenderCallback>,
}

impl fmt::Debug for SidebarPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SidebarPresenter")
            .field("sort", &self.sort)
            .field("page", &self.page)
            .field("highlighted", &self.highlighted)
            .field("pending_highlight", &self.pending_highlight)
            .field("callbacks", &self.on_rendered.len())
            .finish()
    }
}

impl Default for SidebarPresenter {
    fn default() -> Self {
        Self {
            sort: SortKey::default(),
            page: 1,
            highlighted: None,
            pending_highlight: None,
            on_rendered: Vec::new(),
        }
    }
}

impl SidebarPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the sort order. The current page is kept unless the next
    /// render finds it out of range.
    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    #[must_use]
    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, MAX_PAGES);
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    /// Back to page 1, used whenever the list composition changes.
    pub fn reset_page(&mut self) {
        self.page = 1;
    }

    /// Highlight `mls` once the next render has produced its row.
    pub fn highlight_after_render(&mut self, mls: String) {
        self.pending_highlight = Some(mls);
    }

    pub fn clear_highlight(&mut self) {
        self.highlighted = None;
        self.pending_highlight = None;
    }

    #[must_use]
    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    /// Run `callback` with the view produced by the next render.
    pub fn on_next_render(&mut self, callback: impl FnOnce(&SidebarView) + Send + 'static) {
        self.on_rendered.push(Box::new(callback));
    }

    /// Build the sidebar for `points` under the current selection.
    pub fn render(
        &mut self,
        points: &[Listing],
        matched: &LocationMatch,
        center: LatLng,
        selection: &Selection,
        photos: &PhotoSource,
    ) -> SidebarView {
        let (mut list, banner) = match selection {
            Selection::Location(key) => {
                let here: Vec<Listing> = matched
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| {
                        points
                            .iter()
                            .filter(|l| &LocationKey::of(l) == key)
                            .cloned()
                            .collect()
                    });
                let banner = SelectionBanner {
                    key: key.clone(),
                    count: here.len(),
                };
                (here, Some(banner))
            }
            _ => (points.to_vec(), None),
        };

        sort_listings(&mut list, self.sort, center);

        let total_count = list.len();
        let total_pages = total_pages(total_count);

        // Jump to the page holding a pending highlight, if it is reachable
        if let Some(mls) = &self.pending_highlight {
            if let Some(pos) = list.iter().position(|l| &l.mls == mls) {
                let page = pos / ITEMS_PER_PAGE + 1;
                if page <= MAX_PAGES {
                    self.page = page;
                }
            }
        }
        if self.page > total_pages.max(1) {
            self.page = 1;
        }

        let start = (self.page - 1) * ITEMS_PER_PAGE;
        let mut rows: Vec<SidebarRow> = list
            .iter()
            .skip(start)
            .take(ITEMS_PER_PAGE)
            .map(|l| row_for(l, center, photos))
            .collect();

        // Render complete: settle the pending highlight against real rows
        if let Some(mls) = self.pending_highlight.take() {
            if rows.iter().any(|r| r.mls == mls) {
                self.highlighted = Some(mls);
            }
        }
        for row in &mut rows {
            row.highlighted = self.highlighted.as_deref() == Some(row.mls.as_str());
        }

        let view = SidebarView {
            highlighted: rows.iter().find(|r| r.highlighted).map(|r| r.mls.clone()),
            rows,
            banner,
            page: self.page,
            total_pages,
            total_count,
            sort: self.sort,
        };

        for callback in self.on_rendered.drain(..) {
            callback(&view);
        }

        view
    }
}

fn row_for(listing: &Listing, center: LatLng, photos: &PhotoSource) -> SidebarRow {
    let count = |v: Option<f64>| v.map_or_else(|| "?".to_string(), |n| format!("{n}"));
    SidebarRow {
        mls: listing.mls.clone(),
        address: listing
            .address
            .clone()
            .unwrap_or_else(|| "Unknown address".to_string()),
        price: format::or_placeholder(listing.price, format::currency),
        details: format!("{} bd | {} ba", count(listing.beds), count(listing.baths)),
        sold: listing
            .sold_date
            .map_or_else(|| format::PLACEHOLDER.to_string(), |d| d.format("%b %-d, %Y").to_string()),
        distance_km: haversine_km(center, LatLng::of(listing)),
        thumbnail: photos.thumbnail(listing),
        url: listing.url.clone(),
        highlighted: false,
    }
}
