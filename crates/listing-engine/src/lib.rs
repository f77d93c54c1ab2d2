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

//! Filter, query and view-model engine for an interactive listing map.
//!
//! The engine owns everything a listing explorer front-end needs to keep in
//! sync: the draggable area-of-interest, date/price/bedroom filters, a
//! sequence-numbered query coordinator, the coordinate-keyed location index,
//! and presenters that turn the latest response into markers, a paginated
//! sidebar, summary statistics, a monthly chart and a property card. None of
//! it touches a real UI surface; front-ends paint the view models.
//!
//! - **Input layer**: [`GeoSelector`] and [`FilterState`]
//! - **Query layer**: [`QueryCoordinator`] and the [`ListingSource`] seam
//! - **Presentation layer**: [`MarkerPresenter`], [`SidebarPresenter`],
//!   [`InsightsPresenter`], [`PropertyCardPresenter`]
//!
//! [`Explorer`] wires the layers into one owned state object.
//!
//! # Quick Start
//!
//! ```
//! use listing_engine::{Explorer, ExplorerConfig, FilteredResponse, QueryOutcome};
//!
//! let mut explorer = Explorer::new(ExplorerConfig::default());
//! explorer.set_radius_km(20.0); // clamped to 15 km
//! explorer.toggle_bed(3); // 3, 4 or 5 bedrooms
//!
//! let ticket = explorer.issue_query();
//! assert_eq!(ticket.request.radius_km, 15.0);
//! assert_eq!(ticket.request.filters.beds, Some(vec![3, 4, 5]));
//!
//! let applied = explorer.apply_outcome(QueryOutcome {
//!     seq: ticket.seq,
//!     result: Ok(FilteredResponse::default()),
//! });
//! assert!(applied);
//! assert_eq!(explorer.insights().stats.count, "–");
//! ```
//!
//! # Talking to the Server
//!
//! ```no_run
//! use listing_engine::{Explorer, ExplorerConfig, HttpListingSource, HttpSourceConfig, ListingSource};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), listing_engine::EngineError> {
//!     let source = HttpListingSource::new(&HttpSourceConfig::default())?;
//!     let mut explorer = Explorer::new(ExplorerConfig::default());
//!
//!     explorer.load_all(&source.fetch_all().await?);
//!     explorer.refresh(&source).await;
//!
//!     for row in explorer.sidebar_view().rows {
//!         println!("{} {}", row.price, row.address);
//!     }
//!     Ok(())
//! }
//! ```

pub mod card;
pub mod client;
pub mod error;
pub mod explorer;
pub mod filter;
pub mod format;
pub mod geo;
pub mod insights;
pub mod location;
pub mod marker;
pub mod model;
pub mod query;
pub mod selection;
pub mod sidebar;

pub use card::{CardView, Carousel, PhotoMode, PhotoSource, PhotoState, PropertyCardPresenter};
pub use client::{HttpListingSource, HttpSourceConfig, ListingSource};
pub use error::EngineError;
pub use explorer::{Explorer, ExplorerConfig, Panels, SidebarTab, DEFAULT_PHOTO_BASE_URL};
pub use filter::{BedSelection, DateRange, DateWindow, FilterState, PriceRange, MAX_PRICE, MIN_PRICE};
pub use geo::{haversine_km, Bounds, Circle, GeoChange, GeoSelector, LatLng, MAX_RADIUS_KM};
pub use insights::{ChartMetric, ChartView, InsightsPresenter, InsightsView, StatsView};
pub use location::{Location, LocationIndex, LocationKey, LocationMatch};
pub use marker::{Badge, MarkerClick, MarkerPresenter, MarkerView};
pub use model::{
    FilterPayload, FilteredRequest, FilteredResponse, Listing, MonthBucket, RefreshStatus, Summary,
};
pub use query::{dispatch, QueryCoordinator, QueryOutcome, QueryTicket, Resolution};
pub use selection::Selection;
pub use sidebar::{SidebarPresenter, SidebarRow, SidebarView, SortKey, ITEMS_PER_PAGE, MAX_PAGES};
