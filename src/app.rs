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

//! The egui shell around the explorer engine.
//!
//! Layout: toolbar on top, filter panel on the left, insights/listings
//! sidebar on the right, the map in the middle and a floating property
//! card. Network work runs on the shared tokio runtime and reports back
//! over channels drained at the start of every frame.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use eframe::egui;
use listing_engine::{
    dispatch, format, ChartMetric, EngineError, Explorer, HttpListingSource, Listing,
    ListingSource, PhotoState, QueryOutcome, RefreshStatus, SidebarRow, SidebarTab, SortKey,
    MAX_PRICE, MAX_RADIUS_KM, MIN_PRICE,
};
use tokio::sync::mpsc;

use crate::chart_view;
use crate::config::AppConfig;
use crate::map_view::MapView;
use crate::photo_cache::{PhotoStatus, PhotoTextureManager};

const HEADER_COLOR: egui::Color32 = egui::Color32::from_rgb(100, 180, 220);
const MUTED_COLOR: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 90, 80);
const HIGHLIGHT_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(60, 90, 130, 200);

const THUMBNAIL_SIZE: egui::Vec2 = egui::vec2(72.0, 48.0);
const CARD_IMAGE_SIZE: egui::Vec2 = egui::vec2(320.0, 213.0);
const PRICE_STEP: f64 = 25_000.0;

/// Results of background work other than filtered queries.
#[derive(Debug)]
enum AppEvent {
    Points(Result<Vec<Listing>, EngineError>),
    Reloaded(Result<RefreshStatus, EngineError>),
}

/// One-line status shown in the toolbar.
#[derive(Debug, Clone)]
enum Status {
    Info(String),
    Error(String),
}

pub struct ExplorerApp {
    explorer: Explorer,
    config: AppConfig,
    source: Arc<HttpListingSource>,
    runtime: tokio::runtime::Handle,
    ctx: egui::Context,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    outcomes_tx: mpsc::UnboundedSender<QueryOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<QueryOutcome>,
    photos: PhotoTextureManager,
    map: MapView,
    status: Option<Status>,
    loading_points: bool,
    /// Row the sidebar should scroll to, filled by a render callback.
    scroll_target: Arc<Mutex<Option<String>>>,
}

impl std::fmt::Debug for ExplorerApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorerApp")
            .field("explorer", &self.explorer)
            .field("server", &self.config.server_url)
            .field("loading_points", &self.loading_points)
            .finish_non_exhaustive()
    }
}

impl ExplorerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        runtime: tokio::runtime::Handle,
        mut photos: PhotoTextureManager,
    ) -> Result<Self, EngineError> {
        let source = Arc::new(HttpListingSource::new(&config.source_config())?);
        photos.init_placeholder(&cc.egui_ctx);

        let explorer_config = config.to_explorer_config();
        let map = MapView::new(explorer_config.center);
        let mut explorer = Explorer::new(explorer_config);
        if !config.filters_panel_open {
            explorer.toggle_filter_panel();
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        let mut app = Self {
            explorer,
            config,
            source,
            runtime,
            ctx: cc.egui_ctx.clone(),
            events_tx,
            events_rx,
            outcomes_tx,
            outcomes_rx,
            photos,
            map,
            status: None,
            loading_points: false,
            scroll_target: Arc::new(Mutex::new(None)),
        };
        app.load_points();
        Ok(app)
    }

    /// Fetch the full dataset in the background.
    fn load_points(&mut self) {
        self.loading_points = true;
        let source = Arc::clone(&self.source);
        let events = self.events_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let result = source.fetch_all().await;
            if events.send(AppEvent::Points(result)).is_ok() {
                ctx.request_repaint();
            }
        });
    }

    /// Ask the server to reload its data, then reload ours.
    fn reload_data(&mut self) {
        self.status = Some(Status::Info("Reloading data...".to_string()));
        let source = Arc::clone(&self.source);
        let events = self.events_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let result = source.refresh_data().await;
            if events.send(AppEvent::Reloaded(result)).is_ok() {
                ctx.request_repaint();
            }
        });
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Points(Ok(points)) => {
                    self.loading_points = false;
                    self.explorer.load_all(&points);
                    if matches!(self.status, Some(Status::Error(_))) {
                        self.status = None;
                    }
                }
                AppEvent::Points(Err(e)) => {
                    self.loading_points = false;
                    log::error!("Failed to load listings: {e}");
                    self.status = Some(Status::Error(format!("Could not load listings: {e}")));
                }
                AppEvent::Reloaded(Ok(status)) if status.success => {
                    log::info!("Server data reloaded: {}", status.message);
                    self.status = Some(Status::Info(status.message));
                    self.load_points();
                }
                AppEvent::Reloaded(Ok(status)) => {
                    log::warn!("Server refused data reload: {}", status.message);
                    self.status = Some(Status::Error(status.message));
                }
                AppEvent::Reloaded(Err(e)) => {
                    log::error!("Data reload failed: {e}");
                    self.status = Some(Status::Error(format!("Reload failed: {e}")));
                }
            }
        }

        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            let seq = outcome.seq;
            let failure = outcome.result.as_ref().err().map(ToString::to_string);
            if self.explorer.apply_outcome(outcome) {
                if matches!(self.status, Some(Status::Error(_))) {
                    self.status = None;
                }
            } else if let Some(message) = failure {
                if seq == self.explorer.coordinator().latest_seq() {
                    self.status = Some(Status::Error(format!("Query failed: {message}")));
                }
            }
        }
    }

    fn poll_query(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        if let Some(ticket) = self.explorer.poll_query(now) {
            dispatch(
                &self.runtime,
                Arc::clone(&self.source),
                ticket,
                self.outcomes_tx.clone(),
            );
        }
        if let Some(wait) = self.explorer.coordinator().time_until_due(now) {
            ctx.request_repaint_after(wait);
        }
        if self.explorer.coordinator().is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            log::warn!("Failed to save configuration: {e}");
        }
    }

    // ----- toolbar ------------------------------------------------------

    fn draw_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new("◈ LISTING EXPLORER")
                        .color(HEADER_COLOR)
                        .size(13.0)
                        .strong(),
                );
                ui.separator();

                let open = self.explorer.panels().filters_open;
                if ui.selectable_label(open, "Filters").clicked() {
                    self.explorer.toggle_filter_panel();
                    self.config.filters_panel_open = !open;
                    self.save_config();
                }
                if ui
                    .button("⟳ Reload data")
                    .on_hover_text("Ask the server to reload its listings")
                    .clicked()
                {
                    self.reload_data();
                }

                if self.loading_points || self.explorer.coordinator().is_loading() {
                    ui.spinner();
                }

                match &self.status {
                    Some(Status::Info(message)) => {
                        ui.label(egui::RichText::new(message).color(MUTED_COLOR));
                    }
                    Some(Status::Error(message)) => {
                        ui.label(egui::RichText::new(message).color(ERROR_COLOR));
                    }
                    None => {}
                }
            });
        });
    }

    // ----- filter panel -------------------------------------------------

    fn draw_filters(&mut self, ctx: &egui::Context) {
        let open = self.explorer.panels().filters_open;
        egui::SidePanel::left("filters")
            .resizable(false)
            .default_width(260.0)
            .show_animated(ctx, open, |ui| {
                section_header(ui, "AREA");
                let mut radius = self.explorer.geo().circle().radius_km;
                if ui
                    .add(egui::Slider::new(&mut radius, 0.0..=MAX_RADIUS_KM).suffix(" km").text("Radius"))
                    .changed()
                {
                    self.explorer.set_radius_km(radius);
                }
                ui.label(
                    egui::RichText::new(format!(
                        "{} locations inside the circle",
                        self.explorer.listings_within_circle()
                    ))
                    .color(MUTED_COLOR)
                    .size(10.0),
                );

                ui.add_space(8.0);
                section_header(ui, "SOLD DATE");
                let window = self.explorer.filters().window();
                let dates = self.explorer.filters().dates();
                let (mut start, mut end) = (dates.start_offset, dates.end_offset);
                let last = window.last_offset();
                let from = ui.add(
                    egui::Slider::new(&mut start, 0..=last)
                        .text("From")
                        .custom_formatter(|v, _| window.label(v as u32)),
                );
                let to = ui.add(
                    egui::Slider::new(&mut end, 0..=last)
                        .text("To")
                        .custom_formatter(|v, _| window.label(v as u32)),
                );
                if from.changed() || to.changed() {
                    self.explorer.set_date_range(start, end);
                }

                ui.add_space(8.0);
                section_header(ui, "PRICE");
                let price = self.explorer.filters().price();
                let (mut min, mut max) = (price.min, price.max);
                let low = ui.add(
                    egui::Slider::new(&mut min, MIN_PRICE..=MAX_PRICE)
                        .step_by(PRICE_STEP)
                        .text("Min")
                        .custom_formatter(|v, _| format::currency(v)),
                );
                let high = ui.add(
                    egui::Slider::new(&mut max, MIN_PRICE..=MAX_PRICE)
                        .step_by(PRICE_STEP)
                        .text("Max")
                        .custom_formatter(|v, _| format::currency(v)),
                );
                if low.changed() || high.changed() {
                    self.explorer.set_price_range(min, max);
                }

                ui.add_space(8.0);
                section_header(ui, "BEDROOMS");
                ui.horizontal(|ui| {
                    for bed in 1..=listing_engine::filter::MAX_BEDS {
                        let label = if bed == listing_engine::filter::MAX_BEDS {
                            format!("{bed}+")
                        } else {
                            bed.to_string()
                        };
                        let selected = self.explorer.filters().beds().is_selected(bed);
                        if ui.selectable_label(selected, label).clicked() {
                            self.explorer.toggle_bed(bed);
                        }
                    }
                });
                if self.explorer.filters().beds().awaiting_exact() {
                    ui.label(
                        egui::RichText::new("Click again to pick an exact count")
                            .color(MUTED_COLOR)
                            .size(10.0),
                    );
                }

                ui.add_space(12.0);
                ui.add_enabled_ui(!self.explorer.filters().is_default(), |ui| {
                    if ui.button("Clear all filters").clicked() {
                        self.explorer.clear_all();
                    }
                });
            });
    }

    // ----- sidebar ------------------------------------------------------

    fn draw_sidebar(&mut self, ctx: &egui::Context) {
        let response = egui::SidePanel::right("sidebar")
            .default_width(self.config.sidebar_width)
            .width_range(280.0..=640.0)
            .show(ctx, |ui| {
                let mut tab = self.explorer.panels().tab;
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut tab, SidebarTab::Insights, "Insights");
                    ui.selectable_value(&mut tab, SidebarTab::Listings, "Listings");
                });
                if tab != self.explorer.panels().tab {
                    self.explorer.set_tab(tab);
                }
                ui.separator();

                match tab {
                    SidebarTab::Insights => self.draw_insights(ui),
                    SidebarTab::Listings => self.draw_listings(ui),
                }
            });

        let width = response.response.rect.width();
        if (width - self.config.sidebar_width).abs() > 1.0 && ctx.input(|i| i.pointer.any_released()) {
            self.config.sidebar_width = width;
            self.save_config();
        }
    }

    fn draw_insights(&mut self, ui: &mut egui::Ui) {
        let insights = self.explorer.insights().clone();
        egui::Grid::new("stats")
            .num_columns(2)
            .spacing([16.0, 4.0])
            .show(ui, |ui| {
                for (label, value) in [
                    ("Listings", &insights.stats.count),
                    ("Average price", &insights.stats.average_price),
                    ("Highest price", &insights.stats.max_price),
                    ("Lowest price", &insights.stats.min_price),
                    ("Average days on market", &insights.stats.avg_days_on_market),
                    ("Sold vs list", &insights.stats.avg_sold_vs_list),
                ] {
                    ui.label(egui::RichText::new(label).color(MUTED_COLOR));
                    ui.label(egui::RichText::new(value).strong());
                    ui.end_row();
                }
            });

        ui.add_space(8.0);
        let mut metric = insights.chart.metric;
        egui::ComboBox::from_id_salt("chart_metric")
            .selected_text(metric.label())
            .show_ui(ui, |ui| {
                for option in ChartMetric::ALL {
                    ui.selectable_value(&mut metric, option, option.label());
                }
            });
        let chart = if metric == insights.chart.metric {
            insights.chart
        } else {
            self.explorer.set_metric(metric).clone()
        };
        chart_view::show(ui, &chart, 220.0);
    }

    fn draw_listings(&mut self, ui: &mut egui::Ui) {
        let mut sort = self.explorer.sidebar_mut().sort();
        ui.horizontal(|ui| {
            ui.label("Sort by");
            egui::ComboBox::from_id_salt("sort_key")
                .selected_text(sort.label())
                .show_ui(ui, |ui| {
                    for option in SortKey::ALL {
                        ui.selectable_value(&mut sort, option, option.label());
                    }
                });
        });
        if sort != self.explorer.sidebar_mut().sort() {
            self.explorer.set_sort(sort);
        }

        let view = self.explorer.sidebar_view();

        if let Some(banner) = &view.banner {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(banner.message()).color(HEADER_COLOR));
                if ui.small_button("Show all").clicked() {
                    self.explorer.clear_selection();
                }
            });
        }
        ui.label(
            egui::RichText::new(format!("{} listings", view.total_count))
                .color(MUTED_COLOR)
                .size(10.0),
        );

        if view.total_pages > 1 {
            ui.horizontal(|ui| {
                for page in 1..=view.total_pages {
                    if ui.selectable_label(page == view.page, page.to_string()).clicked() {
                        self.explorer.set_page(page);
                    }
                }
            });
        }
        ui.separator();

        let scroll_target = self
            .scroll_target
            .lock()
            .ok()
            .and_then(|mut target| target.take());

        egui::ScrollArea::vertical().show(ui, |ui| {
            for row in &view.rows {
                let response = self.draw_row(ui, row);
                if scroll_target.as_deref() == Some(row.mls.as_str()) {
                    response.scroll_to_me(Some(egui::Align::Center));
                }
                ui.add_space(3.0);
            }
        });
    }

    fn draw_row(&mut self, ui: &mut egui::Ui, row: &SidebarRow) -> egui::Response {
        let frame = if row.highlighted {
            egui::Frame::group(ui.style()).fill(HIGHLIGHT_FILL)
        } else {
            egui::Frame::group(ui.style())
        };

        let mut details_clicked = false;
        let inner = frame.show(ui, |ui| {
            ui.horizontal(|ui| {
                let texture = row
                    .thumbnail
                    .as_deref()
                    .and_then(|url| self.photo_texture(url));
                match texture {
                    Some(texture) => {
                        ui.add(egui::Image::new(&texture).fit_to_exact_size(THUMBNAIL_SIZE));
                    }
                    None => {
                        ui.allocate_space(THUMBNAIL_SIZE);
                    }
                }

                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(&row.price).strong().size(13.0));
                    ui.label(&row.address);
                    ui.label(egui::RichText::new(&row.details).color(MUTED_COLOR).size(10.0));
                    ui.label(
                        egui::RichText::new(format!("Sold {} | {:.1} km", row.sold, row.distance_km))
                            .color(MUTED_COLOR)
                            .size(10.0),
                    );
                    if ui.small_button("View details").clicked() {
                        details_clicked = true;
                    }
                });
            });
        });

        let response = inner.response.interact(egui::Sense::click());
        if details_clicked {
            if self.explorer.view_details(&row.mls) {
                self.follow_highlight();
            }
        } else if response.clicked() {
            if let Some(url) = self.explorer.click_row(&row.mls) {
                if let Err(e) = webbrowser::open(&url) {
                    log::warn!("Could not open {url}: {e}");
                }
            }
        }
        response.on_hover_cursor(egui::CursorIcon::PointingHand)
    }

    /// Scroll to whichever row the next sidebar render highlights.
    fn follow_highlight(&mut self) {
        let target = Arc::clone(&self.scroll_target);
        self.explorer.sidebar_mut().on_next_render(move |view| {
            if let Ok(mut slot) = target.lock() {
                slot.clone_from(&view.highlighted);
            }
        });
        self.ctx.request_repaint();
    }

    /// Texture for `url`, falling back to the placeholder while loading or
    /// after a failure.
    fn photo_texture(&self, url: &str) -> Option<egui::TextureHandle> {
        match self.photos.status(&self.ctx, url) {
            PhotoStatus::Ready(texture) => Some(texture),
            PhotoStatus::Loading | PhotoStatus::Failed => self.photos.get_placeholder().cloned(),
        }
    }

    // ----- property card ------------------------------------------------

    fn draw_card(&mut self, ctx: &egui::Context) {
        // Settle the current photo's load state before building the view
        let current = self
            .explorer
            .card()
            .carousel()
            .current()
            .map(|photo| (photo.url.clone(), photo.state));
        if let Some((url, state)) = current {
            if state == PhotoState::Pending {
                match self.photos.status(ctx, &url) {
                    PhotoStatus::Ready(_) => self.explorer.card_mut().mark_loaded(&url),
                    PhotoStatus::Failed => self.explorer.card_mut().mark_failed(&url),
                    PhotoStatus::Loading => {}
                }
            }
        }

        let view = self.explorer.card_view(Utc::now());
        let showing = view.mls.is_some();
        let mut open = true;
        let window = egui::Window::new("Listing")
            .id(egui::Id::new("property_card"))
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
            .resizable(false)
            .collapsible(false);
        // The placeholder card has nothing to close
        let window = if showing { window.open(&mut open) } else { window };
        window
            .frame(
                egui::Frame::window(&ctx.style())
                    .fill(egui::Color32::from_rgba_unmultiplied(25, 30, 35, 235))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(60, 80, 100)))
                    .corner_radius(6.0),
            )
            .show(ctx, |ui| {
                ui.set_width(CARD_IMAGE_SIZE.x);

                let image = if view.image_failed {
                    self.photos.get_placeholder().cloned()
                } else {
                    self.photo_texture(&view.image)
                };
                match image {
                    Some(texture) => {
                        ui.add(egui::Image::new(&texture).fit_to_exact_size(CARD_IMAGE_SIZE));
                    }
                    None => {
                        ui.allocate_space(CARD_IMAGE_SIZE);
                    }
                }

                if view.show_arrows {
                    ui.horizontal(|ui| {
                        if ui.button("◀").clicked() {
                            self.explorer.card_mut().prev();
                        }
                        ui.label(egui::RichText::new(&view.position).color(MUTED_COLOR));
                        if ui.button("▶").clicked() {
                            self.explorer.card_mut().next();
                        }
                    });
                }

                ui.label(egui::RichText::new(&view.price).size(18.0).strong());
                ui.label(&view.address);
                ui.label(egui::RichText::new(&view.details).color(MUTED_COLOR));
                if let Some(note) = &view.sold_note {
                    ui.label(egui::RichText::new(format!("Sold {note}")).color(MUTED_COLOR));
                }
                match &view.view_url {
                    Some(url) => {
                        ui.hyperlink_to("View details ↗", url);
                    }
                    None => {
                        ui.add_enabled(false, egui::Button::new("View details"));
                    }
                }
            });

        if !open {
            self.explorer.card_mut().clear();
        }
    }
}

fn section_header(ui: &mut egui::Ui, text: &str) {
    ui.label(
        egui::RichText::new(format!("◈ {text}"))
            .color(HEADER_COLOR)
            .size(11.0)
            .strong(),
    );
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        self.draw_toolbar(ctx);
        self.draw_filters(ctx);
        self.draw_sidebar(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if self.map.show(ui, &mut self.explorer).is_some() {
                    self.follow_highlight();
                }
            });

        self.draw_card(ctx);

        // After this frame's gestures so a committed change is issued promptly
        self.poll_query(ctx);
    }
}
