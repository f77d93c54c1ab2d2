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

//! End-to-end explorer behaviour against an in-memory listing source.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use listing_engine::{
    dispatch, haversine_km, Badge, DateWindow, EngineError, Explorer, ExplorerConfig, FilteredRequest,
    FilteredResponse, LatLng, Listing, ListingSource, LocationKey, MarkerClick, MonthBucket,
    QueryOutcome, Selection, SidebarTab, Summary,
};
use tokio::sync::mpsc;

const CENTER: LatLng = LatLng::new(45.4215, -75.6972);

fn listing(mls: &str, lat: f64, lng: f64, price: f64, beds: f64, month: u32) -> Listing {
    Listing {
        mls: mls.to_string(),
        latitude: lat,
        longitude: lng,
        price: Some(price),
        beds: Some(beds),
        baths: Some(1.0),
        sold_date: NaiveDate::from_ymd_opt(2024, month, 15),
        days_on_market: Some(f64::from(month) * 2.0),
        price_diff_pct: Some(1.5),
        address: Some(format!("{mls} Elgin St")),
        url: Some(format!("https://listing.example/{mls}")),
        photo_ref: None,
    }
}

/// Three listings in one condo building plus scattered houses.
fn dataset() -> Vec<Listing> {
    let mut points = vec![
        listing("CONDO-1", 45.4200, -75.6950, 420_000.0, 1.0, 3),
        listing("CONDO-2", 45.4200, -75.6950, 455_000.0, 2.0, 4),
        listing("CONDO-3", 45.4200, -75.6950, 510_000.0, 2.0, 4),
    ];
    for i in 0..12u32 {
        let offset = f64::from(i) * 0.002;
        points.push(listing(
            &format!("HOUSE-{i}"),
            45.4100 + offset,
            -75.7000 + offset,
            600_000.0 + f64::from(i) * 25_000.0,
            f64::from(i % 5 + 1),
            i % 6 + 1,
        ));
    }
    // Well outside any small circle around the center
    points.push(listing("FAR", 45.7000, -75.4500, 999_000.0, 4.0, 5));
    points
}

/// Answers queries by filtering an in-memory dataset. Per-radius delays
/// let tests force responses to arrive out of order.
#[derive(Default)]
struct MemorySource {
    points: Vec<Listing>,
    delays: Vec<(f64, Duration)>,
    fail: Mutex<bool>,
}

impl MemorySource {
    fn new(points: Vec<Listing>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    fn with_delay(mut self, radius_km: f64, millis: u64) -> Self {
        self.delays.push((radius_km, Duration::from_millis(millis)));
        self
    }

    fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    fn answer(&self, request: &FilteredRequest) -> FilteredResponse {
        let center = LatLng::new(request.center[0], request.center[1]);
        let f = &request.filters;
        let points: Vec<Listing> = self
            .points
            .iter()
            .filter(|l| haversine_km(center, LatLng::of(l)) <= request.radius_km)
            .filter(|l| f.min_price.is_none_or(|min| l.price.unwrap_or(0.0) >= min as f64))
            .filter(|l| f.max_price.is_none_or(|max| l.price.unwrap_or(0.0) <= max as f64))
            .filter(|l| {
                f.beds
                    .as_ref()
                    .is_none_or(|beds| l.beds.is_some_and(|n| beds.contains(&(n.round() as u8))))
            })
            .filter(|l| f.sold_start.is_none_or(|s| l.sold_date.is_some_and(|d| d >= s)))
            .filter(|l| f.sold_end.is_none_or(|e| l.sold_date.is_some_and(|d| d <= e)))
            .cloned()
            .collect();

        let mut months: BTreeMap<String, Vec<&Listing>> = BTreeMap::new();
        for l in &points {
            if let Some(d) = l.sold_date {
                months
                    .entry(format!("{:04}-{:02}", d.year(), d.month()))
                    .or_default()
                    .push(l);
            }
        }
        let by_month = months
            .into_iter()
            .map(|(month, ls)| MonthBucket {
                month,
                count: ls.len(),
                avg_price: Some(ls.iter().filter_map(|l| l.price).sum::<f64>() / ls.len() as f64),
                avg_dom: None,
                avg_diff_pct: None,
            })
            .collect();

        let prices: Vec<f64> = points.iter().filter_map(|l| l.price).collect();
        let summary = Summary {
            count: points.len(),
            average_price: (!prices.is_empty())
                .then(|| prices.iter().sum::<f64>() / prices.len() as f64),
            max_price: prices.iter().copied().reduce(f64::max),
            min_price: prices.iter().copied().reduce(f64::min),
            avg_dom: None,
            avg_diff_pct: None,
            by_month,
        };
        FilteredResponse { points, summary }
    }
}

impl ListingSource for MemorySource {
    async fn fetch_all(&self) -> Result<Vec<Listing>, EngineError> {
        Ok(self.points.clone())
    }

    async fn fetch_filtered(
        &self,
        request: &FilteredRequest,
    ) -> Result<FilteredResponse, EngineError> {
        let delay = self
            .delays
            .iter()
            .find(|(radius, _)| (radius - request.radius_km).abs() < f64::EPSILON)
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock().unwrap() {
            return Err(EngineError::Status {
                status: 500,
                message: "database unavailable".to_string(),
            });
        }
        Ok(self.answer(request))
    }
}

fn explorer() -> Explorer {
    Explorer::new(ExplorerConfig {
        center: CENTER,
        radius_km: 5.0,
        debounce: Duration::ZERO,
        date_window: DateWindow::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 12),
        ..Default::default()
    })
}

async fn loaded(source: &MemorySource) -> Explorer {
    let mut explorer = explorer();
    explorer.load_all(&source.fetch_all().await.unwrap());
    assert!(explorer.refresh(source).await);
    explorer
}

fn condo_key() -> LocationKey {
    LocationKey::from_coords(45.4200, -75.6950)
}

#[tokio::test]
async fn test_initial_load_renders_every_view() {
    let source = MemorySource::new(dataset());
    let mut explorer = loaded(&source).await;

    // FAR is outside the 5 km circle
    assert_eq!(explorer.points().len(), 15);
    assert_eq!(explorer.markers().len(), 14);
    assert_eq!(explorer.markers().visible().count(), 13);
    assert_eq!(
        explorer.markers().get(&condo_key()).unwrap().badge,
        Badge::Count(3)
    );

    let sidebar = explorer.sidebar_view();
    assert_eq!(sidebar.total_count, 15);
    assert_eq!(sidebar.rows.len(), 15);
    assert_eq!(sidebar.total_pages, 1);

    let insights = explorer.insights();
    assert_eq!(insights.stats.count, "15");
    assert!(!insights.chart.labels.is_empty());
}

#[tokio::test]
async fn test_location_selection_then_background_restores_full_list() {
    let source = MemorySource::new(dataset());
    let mut explorer = loaded(&source).await;
    let full: Vec<String> = explorer.sidebar_view().rows.into_iter().map(|r| r.mls).collect();

    let click = explorer.click_marker(&condo_key());
    assert_eq!(click, MarkerClick::Location(condo_key()));
    assert_eq!(explorer.panels().tab, SidebarTab::Listings);

    let narrowed = explorer.sidebar_view();
    assert_eq!(narrowed.rows.len(), 3);
    assert!(narrowed.rows.iter().all(|r| r.mls.starts_with("CONDO")));
    assert_eq!(narrowed.banner.unwrap().count, 3);
    assert!(explorer.markers().get(&condo_key()).unwrap().selected);

    assert!(explorer.click_map_background());
    assert_eq!(explorer.selection(), &Selection::None);
    let restored: Vec<String> = explorer.sidebar_view().rows.into_iter().map(|r| r.mls).collect();
    assert_eq!(restored, full);
    assert!(!explorer.markers().get(&condo_key()).unwrap().selected);
}

#[tokio::test]
async fn test_single_marker_click_shows_card_and_highlights_row() {
    let source = MemorySource::new(dataset());
    let mut explorer = loaded(&source).await;
    let key = LocationKey::from_coords(45.4100, -75.7000);

    let MarkerClick::Listing(listing) = explorer.click_marker(&key) else {
        panic!("expected a single-listing marker");
    };
    assert_eq!(listing.mls, "HOUSE-0");
    assert_eq!(explorer.selection(), &Selection::Listing("HOUSE-0".to_string()));

    let card = explorer.card_view(Utc::now());
    assert_eq!(card.mls.as_deref(), Some("HOUSE-0"));
    assert_eq!(card.price, "$600,000");

    let view = explorer.sidebar_view();
    assert_eq!(view.highlighted.as_deref(), Some("HOUSE-0"));
}

#[tokio::test]
async fn test_bed_and_price_filters_narrow_results() {
    let source = MemorySource::new(dataset());
    let mut explorer = loaded(&source).await;

    explorer.toggle_bed(2);
    explorer.toggle_bed(2);
    explorer.set_price_range(450_000, 2_000_000);
    let request = explorer.build_request();
    assert_eq!(request.filters.beds, Some(vec![2]));
    assert_eq!(request.filters.min_price, Some(450_000));
    assert_eq!(request.filters.max_price, None);

    assert!(explorer.refresh(&source).await);
    let mls: Vec<&str> = explorer.points().iter().map(|l| l.mls.as_str()).collect();
    assert!(mls.contains(&"CONDO-2"));
    assert!(mls.contains(&"CONDO-3"));
    assert!(!mls.contains(&"CONDO-1"));

    // Two condos left at the shared address
    assert_eq!(
        explorer.markers().get(&condo_key()).unwrap().badge,
        Badge::Count(2)
    );

    explorer.clear_all();
    assert!(explorer.build_request().filters.is_empty());
}

#[tokio::test]
async fn test_failed_query_keeps_previous_view() {
    let source = MemorySource::new(dataset());
    let mut explorer = loaded(&source).await;
    let before = explorer.sidebar_view();

    source.set_failing(true);
    explorer.set_radius_km(1.0);
    assert!(!explorer.refresh(&source).await);

    assert_eq!(explorer.points().len(), 15);
    assert_eq!(explorer.sidebar_view(), before);
    assert_eq!(explorer.insights().stats.count, "15");
}

#[tokio::test]
async fn test_empty_result_clears_stats_chart_and_card() {
    let source = MemorySource::new(dataset());
    let mut explorer = loaded(&source).await;
    explorer.view_details("HOUSE-1");
    assert!(explorer.card().listing().is_some());

    explorer.set_radius_km(0.0);
    assert!(explorer.refresh(&source).await);

    let insights = explorer.insights();
    for stat in [
        &insights.stats.count,
        &insights.stats.average_price,
        &insights.stats.max_price,
        &insights.stats.min_price,
        &insights.stats.avg_days_on_market,
        &insights.stats.avg_sold_vs_list,
    ] {
        assert_eq!(stat, "–");
    }
    assert!(insights.chart.counts.is_empty());
    assert!(insights.chart.line.is_empty());
    assert!(explorer.card().listing().is_none());
    assert_eq!(explorer.markers().visible().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_responses_apply_latest_only() {
    // A is slow, B is fast: B arrives first, A arrives last and is stale
    let source = Arc::new(
        MemorySource::new(dataset())
            .with_delay(5.0, 500)
            .with_delay(0.5, 50),
    );
    let mut explorer = explorer();
    explorer.load_all(&source.fetch_all().await.unwrap());

    let (tx, mut rx) = mpsc::unbounded_channel::<QueryOutcome>();
    let handle = tokio::runtime::Handle::current();

    explorer.set_radius_km(5.0);
    let a = explorer.issue_query();
    dispatch(&handle, Arc::clone(&source), a.clone(), tx.clone());

    explorer.set_radius_km(0.5);
    let b = explorer.issue_query();
    dispatch(&handle, Arc::clone(&source), b.clone(), tx);

    let first = rx.recv().await.unwrap();
    assert_eq!(first.seq, b.seq);
    assert!(explorer.apply_outcome(first));
    let b_points = explorer.points().to_vec();

    let second = rx.recv().await.unwrap();
    assert_eq!(second.seq, a.seq);
    assert!(!explorer.apply_outcome(second));

    assert_eq!(explorer.points(), b_points.as_slice());
    assert_eq!(explorer.coordinator().applied_seq(), Some(b.seq));
    assert!(explorer.points().len() < 15);
}
