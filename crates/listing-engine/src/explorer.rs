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

//! The explorer: one owned state object tying every component together.
//!
//! User gestures mutate the geo selector or filter state and mark the query
//! coordinator dirty. Issued queries come back as [`QueryOutcome`]s; the
//! latest successful one is fanned out to the location index, markers,
//! sidebar and insights in one step, so a failed or stale response never
//! leaves the view half-updated.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::card::{CardView, PhotoMode, PhotoSource, PropertyCardPresenter};
use crate::client::ListingSource;
use crate::filter::{DateWindow, FilterState};
use crate::geo::{Bounds, GeoChange, GeoSelector, LatLng};
use crate::insights::{ChartMetric, ChartView, InsightsPresenter, InsightsView};
use crate::location::{LocationIndex, LocationKey, LocationMatch};
use crate::marker::{MarkerClick, MarkerPresenter};
use crate::model::{FilteredRequest, Listing, Summary};
use crate::query::{QueryCoordinator, QueryOutcome, QueryTicket, Resolution};
use crate::selection::Selection;
use crate::sidebar::{SidebarPresenter, SidebarView, SortKey};

/// Default photo container for the convention-based deployment.
pub const DEFAULT_PHOTO_BASE_URL: &str = "https://redfinstorage.blob.core.windows.net/images/";

/// Engine settings. Plain data; loading and saving is the host's concern.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub center: LatLng,
    pub radius_km: f64,
    pub bounds: Bounds,
    pub date_window: DateWindow,
    pub debounce: Duration,
    pub photo_mode: PhotoMode,
    pub photo_base_url: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            center: LatLng::new(45.4215, -75.6972),
            radius_km: 5.0,
            bounds: Bounds::OTTAWA,
            date_window: DateWindow::ending(Utc::now().date_naive(), 24),
            debounce: Duration::from_millis(150),
            photo_mode: PhotoMode::Convention,
            photo_base_url: DEFAULT_PHOTO_BASE_URL.to_string(),
        }
    }
}

/// Which panel the sidebar shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SidebarTab {
    #[default]
    Insights,
    Listings,
}

/// Transient panel state that survives re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panels {
    pub filters_open: bool,
    pub tab: SidebarTab,
}

impl Default for Panels {
    fn default() -> Self {
        Self {
            filters_open: true,
            tab: SidebarTab::default(),
        }
    }
}

/// Owned state of the listing explorer.
#[derive(Debug)]
pub struct Explorer {
    geo: GeoSelector,
    filters: FilterState,
    coordinator: QueryCoordinator,
    index: LocationIndex,
    markers: MarkerPresenter,
    sidebar: SidebarPresenter,
    insights: InsightsPresenter,
    card: PropertyCardPresenter,
    selection: Selection,
    points: Vec<Listing>,
    matched: LocationMatch,
    summary: Summary,
    panels: Panels,
}

impl Explorer {
    #[must_use]
    pub fn new(config: ExplorerConfig) -> Self {
        Self {
            geo: GeoSelector::new(config.center, config.radius_km, config.bounds),
            filters: FilterState::new(config.date_window),
            coordinator: QueryCoordinator::new(config.debounce),
            index: LocationIndex::new(),
            markers: MarkerPresenter::default(),
            sidebar: SidebarPresenter::new(),
            insights: InsightsPresenter::new(),
            card: PropertyCardPresenter::new(PhotoSource::new(
                config.photo_mode,
                config.photo_base_url,
            )),
            selection: Selection::None,
            points: Vec::new(),
            matched: LocationMatch::new(),
            summary: Summary::default(),
            panels: Panels::default(),
        }
    }

    // ----- data loading -------------------------------------------------

    /// Install the full dataset: rebuild location keys and markers, then
    /// schedule the first filtered query.
    pub fn load_all(&mut self, points: &[Listing]) {
        self.index.rebuild(points);
        self.markers = MarkerPresenter::from_index(&self.index);
        self.matched = self.index.match_filtered(&self.points);
        self.markers.render(&self.matched, &self.selection);
        info!(
            "Loaded {} listings at {} locations ({} inside the current circle)",
            points.len(),
            self.index.len(),
            self.listings_within_circle()
        );
        self.request_refresh();
    }

    /// Known locations inside the committed circle.
    #[must_use]
    pub fn listings_within_circle(&self) -> usize {
        self.geo.count_within(self.index.iter().map(|l| l.position))
    }

    // ----- area of interest ---------------------------------------------

    pub fn set_center(&mut self, lat: f64, lng: f64) {
        let change = self.geo.set_center(lat, lng);
        self.on_geo_change(change);
    }

    pub fn set_radius_km(&mut self, radius_km: f64) {
        let change = self.geo.set_radius_km(radius_km);
        self.on_geo_change(change);
    }

    /// Move the circle handle mid-drag. Visual only; no query.
    pub fn drag_handle(&mut self, lat: f64, lng: f64) {
        self.geo.drag_to(lat, lng);
    }

    /// Release the circle handle, committing its position.
    pub fn end_drag(&mut self) {
        let change = self.geo.end_drag();
        self.on_geo_change(change);
    }

    fn on_geo_change(&mut self, change: GeoChange) {
        if change == GeoChange::Committed {
            self.request_refresh();
        }
    }

    // ----- filters ------------------------------------------------------

    pub fn set_date_range(&mut self, start_offset: u32, end_offset: u32) {
        let before = self.filters.dates();
        self.filters.set_date_range(start_offset, end_offset);
        if self.filters.dates() != before {
            self.request_refresh();
        }
    }

    pub fn set_price_range(&mut self, min: u64, max: u64) {
        let before = self.filters.price();
        self.filters.set_price_range(min, max);
        if self.filters.price() != before {
            self.request_refresh();
        }
    }

    pub fn toggle_bed(&mut self, bed: u8) {
        self.filters.toggle_bed(bed);
        self.request_refresh();
    }

    /// Reset every filter and query once.
    pub fn clear_all(&mut self) {
        self.filters.clear_all();
        self.request_refresh();
    }

    // ----- querying -----------------------------------------------------

    pub fn request_refresh(&mut self) {
        self.coordinator.request_refresh(Instant::now());
    }

    /// Combined payload for the committed circle and current filters.
    #[must_use]
    pub fn build_request(&self) -> FilteredRequest {
        let circle = self.geo.circle();
        FilteredRequest {
            center: [circle.center.lat, circle.center.lng],
            radius_km: circle.radius_km,
            filters: self.filters.build_payload(),
        }
    }

    /// Issue the pending refresh if its debounce window has passed.
    pub fn poll_query(&mut self, now: Instant) -> Option<QueryTicket> {
        if self.coordinator.is_due(now) {
            Some(self.issue_query())
        } else {
            None
        }
    }

    /// Issue a query immediately, superseding any in flight.
    pub fn issue_query(&mut self) -> QueryTicket {
        let request = self.build_request();
        self.coordinator.issue(request)
    }

    /// Apply an outcome if it belongs to the latest request. Returns whether
    /// the view changed.
    pub fn apply_outcome(&mut self, outcome: QueryOutcome) -> bool {
        let response = match self.coordinator.resolve(outcome) {
            Resolution::Apply(response) => response,
            Resolution::Stale | Resolution::Failed => return false,
        };

        self.points = response.points;
        self.summary = response.summary;
        self.matched = self.index.match_filtered(&self.points);

        self.selection = Selection::None;
        self.sidebar.reset_page();
        self.sidebar.clear_highlight();

        self.markers.render(&self.matched, &self.selection);
        self.insights.render(&self.summary, &self.points);
        if self.summary.count == 0 {
            self.card.clear();
        }

        debug!(
            "Applied query #{}: {} points, {} visible markers",
            self.coordinator.latest_seq(),
            self.points.len(),
            self.markers.visible().count()
        );
        true
    }

    /// Issue a query, await it on `source` and apply the result.
    pub async fn refresh<S: ListingSource>(&mut self, source: &S) -> bool {
        let ticket = self.issue_query();
        let result = source.fetch_filtered(&ticket.request).await;
        self.apply_outcome(QueryOutcome {
            seq: ticket.seq,
            result,
        })
    }

    // ----- map interaction ----------------------------------------------

    /// Handle a click on the marker at `key`.
    pub fn click_marker(&mut self, key: &LocationKey) -> MarkerClick {
        let click = self.markers.click(key, &self.matched);
        if click == MarkerClick::Ignored {
            return click;
        }
        match &click {
            MarkerClick::Location(key) => {
                self.selection = Selection::Location(key.clone());
                self.panels.tab = SidebarTab::Listings;
                self.sidebar.clear_highlight();
                self.sidebar.reset_page();
            }
            MarkerClick::Listing(listing) => {
                self.selection = Selection::Listing(listing.mls.clone());
                self.panels.tab = SidebarTab::Listings;
                self.sidebar.highlight_after_render(listing.mls.clone());
                self.card.show(listing.clone());
            }
            MarkerClick::Ignored => {}
        }
        self.markers.restyle(&self.matched, &self.selection);
        click
    }

    /// Handle a click on empty map. Leaves a location selection, restoring
    /// the full sidebar list. Returns whether anything changed.
    pub fn click_map_background(&mut self) -> bool {
        if self.selection.location().is_none() {
            return false;
        }
        self.clear_selection();
        true
    }

    /// Drop any selection, e.g. from the sidebar banner's clear control.
    pub fn clear_selection(&mut self) {
        if self.selection.location().is_some() {
            self.sidebar.reset_page();
        }
        self.selection = Selection::None;
        self.sidebar.clear_highlight();
        self.markers.restyle(&self.matched, &self.selection);
    }

    // ----- sidebar ------------------------------------------------------

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sidebar.set_sort(sort);
    }

    pub fn set_page(&mut self, page: usize) {
        self.sidebar.set_page(page);
    }

    /// Render the sidebar for the current state.
    pub fn sidebar_view(&mut self) -> SidebarView {
        let center = self.geo.circle().center;
        self.sidebar.render(
            &self.points,
            &self.matched,
            center,
            &self.selection,
            self.card.photo_source(),
        )
    }

    /// External URL a row click should open. Not a state change.
    #[must_use]
    pub fn click_row(&self, mls: &str) -> Option<String> {
        self.listing(mls).and_then(|l| l.url.clone())
    }

    /// The row's "view details" control: show the listing on the card.
    pub fn view_details(&mut self, mls: &str) -> bool {
        let Some(listing) = self.listing(mls).cloned() else {
            return false;
        };
        if self.selection.location().is_none() {
            self.selection = Selection::Listing(listing.mls.clone());
            self.markers.restyle(&self.matched, &self.selection);
        }
        self.sidebar.highlight_after_render(listing.mls.clone());
        self.card.show(listing);
        true
    }

    // ----- insights -----------------------------------------------------

    pub fn set_metric(&mut self, metric: ChartMetric) -> &ChartView {
        self.insights.set_metric(metric)
    }

    #[must_use]
    pub fn insights(&self) -> &InsightsView {
        self.insights.view()
    }

    // ----- panels -------------------------------------------------------

    pub fn toggle_filter_panel(&mut self) {
        self.panels.filters_open = !self.panels.filters_open;
    }

    pub fn set_tab(&mut self, tab: SidebarTab) {
        self.panels.tab = tab;
    }

    #[must_use]
    pub fn panels(&self) -> Panels {
        self.panels
    }

    // ----- accessors ----------------------------------------------------

    #[must_use]
    pub fn card_view(&self, now: DateTime<Utc>) -> CardView {
        self.card.view(now)
    }

    #[must_use]
    pub fn card(&self) -> &PropertyCardPresenter {
        &self.card
    }

    pub fn card_mut(&mut self) -> &mut PropertyCardPresenter {
        &mut self.card
    }

    pub fn sidebar_mut(&mut self) -> &mut SidebarPresenter {
        &mut self.sidebar
    }

    #[must_use]
    pub fn geo(&self) -> &GeoSelector {
        &self.geo
    }

    #[must_use]
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerPresenter {
        &self.markers
    }

    #[must_use]
    pub fn coordinator(&self) -> &QueryCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Point set of the last applied response.
    #[must_use]
    pub fn points(&self) -> &[Listing] {
        &self.points
    }

    #[must_use]
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    fn listing(&self, mls: &str) -> Option<&Listing> {
        self.points.iter().find(|l| l.mls == mls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FilteredResponse;

    fn listing(mls: &str, lat: f64, price: f64) -> Listing {
        Listing {
            mls: mls.to_string(),
            latitude: lat,
            longitude: -75.70,
            price: Some(price),
            beds: Some(2.0),
            baths: Some(1.0),
            sold_date: None,
            days_on_market: Some(12.0),
            price_diff_pct: Some(1.0),
            address: None,
            url: Some(format!("https://listing.example/{mls}")),
            photo_ref: None,
        }
    }

    fn explorer() -> Explorer {
        Explorer::new(ExplorerConfig {
            debounce: Duration::ZERO,
            ..Default::default()
        })
    }

    fn respond(explorer: &mut Explorer, points: Vec<Listing>) -> bool {
        let ticket = explorer.issue_query();
        let count = points.len();
        let mut response = FilteredResponse {
            points,
            ..Default::default()
        };
        response.summary.count = count;
        explorer.apply_outcome(QueryOutcome {
            seq: ticket.seq,
            result: Ok(response),
        })
    }

    #[test]
    fn test_geo_commit_requests_refresh_but_drag_does_not() {
        let mut explorer = explorer();
        explorer.drag_handle(45.43, -75.70);
        assert!(!explorer.coordinator().is_dirty());

        explorer.end_drag();
        assert!(explorer.coordinator().is_dirty());
        let ticket = explorer.poll_query(Instant::now()).unwrap();
        assert_eq!(ticket.request.center, [45.43, -75.70]);
        assert!(explorer.poll_query(Instant::now()).is_none());
    }

    #[test]
    fn test_radius_input_is_clamped_in_request() {
        let mut explorer = explorer();
        explorer.set_radius_km(20.0);
        assert_eq!(explorer.build_request().radius_km, 15.0);
    }

    #[test]
    fn test_response_resets_selection_and_page() {
        let mut explorer = explorer();
        let points: Vec<Listing> = (0..30)
            .map(|i| listing(&format!("M{i}"), 45.40 + f64::from(i) * 0.001, 400_000.0))
            .collect();
        explorer.load_all(&points);
        respond(&mut explorer, points.clone());

        explorer.set_page(2);
        explorer.click_marker(&LocationKey::of(&points[3]));
        assert_eq!(explorer.selection(), &Selection::Listing("M3".to_string()));

        respond(&mut explorer, points);
        assert_eq!(explorer.selection(), &Selection::None);
        assert_eq!(explorer.sidebar_view().page, 1);
    }

    /// 20 spread-out listings plus 45 sharing one address.
    fn crowded() -> (Vec<Listing>, LocationKey) {
        let mut points: Vec<Listing> = (0..20)
            .map(|i| listing(&format!("S{i}"), 45.40 + f64::from(i) * 0.001, 400_000.0))
            .collect();
        points.extend((0..45).map(|i| listing(&format!("T{i}"), 45.45, 300_000.0 + f64::from(i))));
        let key = LocationKey::of(&points[20]);
        (points, key)
    }

    #[test]
    fn test_location_click_returns_to_first_page() {
        let mut explorer = explorer();
        let (points, key) = crowded();
        explorer.load_all(&points);
        respond(&mut explorer, points);

        explorer.set_page(3);
        assert_eq!(explorer.sidebar_view().page, 3);

        assert_eq!(explorer.click_marker(&key), MarkerClick::Location(key.clone()));
        let view = explorer.sidebar_view();
        assert_eq!(view.total_pages, 3);
        assert_eq!(view.page, 1);
    }

    #[test]
    fn test_background_click_returns_to_first_page() {
        let mut explorer = explorer();
        let (points, key) = crowded();
        explorer.load_all(&points);
        respond(&mut explorer, points);

        explorer.click_marker(&key);
        explorer.set_page(2);
        assert_eq!(explorer.sidebar_view().page, 2);

        assert!(explorer.click_map_background());
        let view = explorer.sidebar_view();
        assert!(view.banner.is_none());
        assert_eq!(view.total_count, 65);
        assert_eq!(view.page, 1);
    }

    #[test]
    fn test_clear_all_issues_exactly_one_query() {
        let mut explorer = explorer();
        explorer.set_price_range(300_000, 800_000);
        explorer.toggle_bed(3);
        assert!(explorer.poll_query(Instant::now()).is_some());

        explorer.clear_all();
        let ticket = explorer.poll_query(Instant::now()).unwrap();
        assert!(ticket.request.filters.is_empty());
        assert!(explorer.poll_query(Instant::now()).is_none());
    }

    #[test]
    fn test_empty_result_leaves_placeholder_card() {
        let mut explorer = explorer();
        let points = vec![listing("A", 45.41, 500_000.0)];
        explorer.load_all(&points);
        respond(&mut explorer, points.clone());
        explorer.click_marker(&LocationKey::of(&points[0]));
        assert_eq!(explorer.card_view(Utc::now()).mls.as_deref(), Some("A"));

        respond(&mut explorer, Vec::new());
        let view = explorer.card_view(Utc::now());
        assert_eq!(view.mls, None);
        assert_eq!(view.address, "Select a listing");
        assert!(view.view_url.is_none());
        assert!(!view.show_arrows);
    }

    #[test]
    fn test_panels_survive_responses() {
        let mut explorer = explorer();
        explorer.toggle_filter_panel();
        explorer.set_tab(SidebarTab::Listings);
        respond(&mut explorer, Vec::new());
        assert!(!explorer.panels().filters_open);
        assert_eq!(explorer.panels().tab, SidebarTab::Listings);
    }

    #[test]
    fn test_click_row_returns_url() {
        let mut explorer = explorer();
        let points = vec![listing("A", 45.41, 1.0)];
        explorer.load_all(&points);
        respond(&mut explorer, points);
        assert_eq!(
            explorer.click_row("A").as_deref(),
            Some("https://listing.example/A")
        );
        assert_eq!(explorer.selection(), &Selection::None);
    }
}
