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

//! Map canvas: area-of-interest circle, its drag handle and listing markers.
//!
//! Uses a local equirectangular projection around the view center, which is
//! accurate enough at city scale. Tiles are out of scope; the canvas draws
//! the supported region outline for orientation.

use eframe::egui;
use listing_engine::{Badge, Explorer, LatLng, LocationKey, MarkerClick};

const KM_PER_DEG_LAT: f64 = 110.574;
const KM_PER_DEG_LNG: f64 = 111.320;

const MIN_PX_PER_KM: f32 = 8.0;
const MAX_PX_PER_KM: f32 = 400.0;

const HANDLE_RADIUS: f32 = 7.0;
const HANDLE_GRAB_RADIUS: f32 = 14.0;

const BADGE_FONT: f32 = 11.0;
const BADGE_PADDING: egui::Vec2 = egui::vec2(5.0, 2.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Handle,
    Pan,
}

/// View state of the map canvas (pan and zoom only; the circle lives in
/// the explorer).
#[derive(Debug, Clone)]
pub struct MapView {
    center: LatLng,
    px_per_km: f32,
    drag: Option<DragMode>,
}

impl MapView {
    pub fn new(center: LatLng) -> Self {
        Self {
            center,
            px_per_km: 60.0,
            drag: None,
        }
    }

    fn to_screen(&self, rect: egui::Rect, point: LatLng) -> egui::Pos2 {
        let cos_lat = self.center.lat.to_radians().cos();
        let dx_km = (point.lng - self.center.lng) * KM_PER_DEG_LNG * cos_lat;
        let dy_km = (point.lat - self.center.lat) * KM_PER_DEG_LAT;
        rect.center() + egui::vec2(dx_km as f32, -dy_km as f32) * self.px_per_km
    }

    fn from_screen(&self, rect: egui::Rect, pos: egui::Pos2) -> LatLng {
        let cos_lat = self.center.lat.to_radians().cos();
        let offset = (pos - rect.center()) / self.px_per_km;
        LatLng::new(
            self.center.lat - f64::from(offset.y) / KM_PER_DEG_LAT,
            self.center.lng + f64::from(offset.x) / (KM_PER_DEG_LNG * cos_lat),
        )
    }

    fn zoom_by(&mut self, factor: f32) {
        self.px_per_km = (self.px_per_km * factor).clamp(MIN_PX_PER_KM, MAX_PX_PER_KM);
    }

    /// Draw the map and route its gestures into `explorer`.
    /// Draw the map and handle its gestures. Returns the MLS number of a
    /// listing picked from a single-listing marker this frame.
    pub fn show(&mut self, ui: &mut egui::Ui, explorer: &mut Explorer) -> Option<String> {
        let (response, painter) = ui.allocate_painter(
            egui::vec2(ui.available_width(), ui.available_height()),
            egui::Sense::click_and_drag(),
        );
        let rect = response.rect;

        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(28, 32, 38));

        if response.hovered() {
            let (zoom_delta, scroll) = ui.ctx().input(|i| (i.zoom_delta(), i.smooth_scroll_delta.y));
            if (zoom_delta - 1.0).abs() > 0.001 {
                self.zoom_by(zoom_delta);
            } else if scroll.abs() > 0.1 {
                self.zoom_by((scroll / 200.0).exp());
            }
        }

        self.draw_bounds(&painter, rect, explorer);

        // Circle and handle
        let circle = explorer.geo().visual_circle();
        let circle_center = self.to_screen(rect, circle.center);
        let circle_radius = circle.radius_km as f32 * self.px_per_km;
        painter.circle_filled(
            circle_center,
            circle_radius,
            egui::Color32::from_rgba_unmultiplied(70, 140, 220, 40),
        );
        painter.circle_stroke(
            circle_center,
            circle_radius,
            egui::Stroke::new(2.0, egui::Color32::from_rgb(70, 140, 220)),
        );

        // Gestures
        if response.drag_started() {
            let grabbed = response
                .interact_pointer_pos()
                .is_some_and(|pos| pos.distance(circle_center) <= HANDLE_GRAB_RADIUS);
            self.drag = Some(if grabbed { DragMode::Handle } else { DragMode::Pan });
        }
        if response.dragged() {
            match self.drag {
                Some(DragMode::Handle) => {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let point = self.from_screen(rect, pos);
                        explorer.drag_handle(point.lat, point.lng);
                    }
                }
                Some(DragMode::Pan) => {
                    let delta = response.drag_delta();
                    self.center = self.from_screen(rect, rect.center() - delta);
                }
                None => {}
            }
        }
        if response.drag_stopped() {
            if self.drag == Some(DragMode::Handle) {
                explorer.end_drag();
            }
            self.drag = None;
        }

        let handle_color = if explorer.geo().is_dragging() {
            egui::Color32::from_rgb(255, 200, 80)
        } else {
            egui::Color32::WHITE
        };
        painter.circle_filled(circle_center, HANDLE_RADIUS, handle_color);
        painter.circle_stroke(
            circle_center,
            HANDLE_RADIUS,
            egui::Stroke::new(2.0, egui::Color32::from_rgb(70, 140, 220)),
        );

        // Markers, selected ones drawn last so they sit on top
        let mut markers: Vec<_> = explorer.markers().visible().cloned().collect();
        markers.sort_by_key(|m| m.selected);
        let mut hit_boxes = Vec::with_capacity(markers.len());
        for marker in &markers {
            let pos = self.to_screen(rect, marker.position);
            if !rect.expand(40.0).contains(pos) {
                continue;
            }
            let hit = draw_marker(&painter, pos, &marker.badge, marker.selected);
            hit_boxes.push((marker.key.clone(), hit));
        }

        let mut picked = None;
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                match hit_test(&hit_boxes, pos) {
                    Some(key) => {
                        let key = key.clone();
                        if let MarkerClick::Listing(listing) = explorer.click_marker(&key) {
                            log::debug!("Selected listing {} from map", listing.mls);
                            picked = Some(listing.mls);
                        }
                    }
                    None => {
                        explorer.click_map_background();
                    }
                }
            }
        }
        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                if hit_test(&hit_boxes, pos).is_none() {
                    let point = self.from_screen(rect, pos);
                    explorer.set_center(point.lat, point.lng);
                }
            }
        }

        painter.text(
            rect.left_top() + egui::vec2(10.0, 10.0),
            egui::Align2::LEFT_TOP,
            "Drag to pan | Scroll to zoom | Drag handle to move area | Double-click to recenter",
            egui::FontId::proportional(12.0),
            egui::Color32::from_rgb(170, 170, 170),
        );
        painter.text(
            rect.left_bottom() + egui::vec2(10.0, -10.0),
            egui::Align2::LEFT_BOTTOM,
            format!(
                "{:.4}°, {:.4}° | radius {:.1} km",
                circle.center.lat, circle.center.lng, circle.radius_km
            ),
            egui::FontId::monospace(11.0),
            egui::Color32::from_rgb(150, 150, 150),
        );

        picked
    }

    fn draw_bounds(&self, painter: &egui::Painter, rect: egui::Rect, explorer: &Explorer) {
        let bounds = explorer.geo().bounds();
        let corners = [
            LatLng::new(bounds.north, bounds.west),
            LatLng::new(bounds.north, bounds.east),
            LatLng::new(bounds.south, bounds.east),
            LatLng::new(bounds.south, bounds.west),
        ]
        .map(|p| self.to_screen(rect, p));
        let stroke = egui::Stroke::new(1.0, egui::Color32::from_rgb(70, 75, 85));
        for (from, to) in corners.iter().zip(corners.iter().cycle().skip(1)) {
            painter.line_segment([*from, *to], stroke);
        }
    }
}

/// Draw a badge marker anchored at `pos`; returns its clickable area.
fn draw_marker(painter: &egui::Painter, pos: egui::Pos2, badge: &Badge, selected: bool) -> egui::Rect {
    let (fill, text_color) = match (badge, selected) {
        (_, true) => (egui::Color32::from_rgb(255, 90, 60), egui::Color32::WHITE),
        (Badge::Count(_), false) => (egui::Color32::from_rgb(40, 110, 200), egui::Color32::WHITE),
        (Badge::Price(_), false) => (egui::Color32::from_rgb(240, 240, 240), egui::Color32::BLACK),
    };

    let label = badge.label();
    let galley = painter.layout_no_wrap(label.clone(), egui::FontId::proportional(BADGE_FONT), text_color);
    let badge_center = pos - egui::vec2(0.0, galley.size().y / 2.0 + 6.0);
    let badge_rect = egui::Rect::from_center_size(badge_center, galley.size() + BADGE_PADDING * 2.0);

    painter.line_segment([pos, badge_rect.center_bottom()], egui::Stroke::new(1.5, fill));
    painter.circle_filled(pos, 2.5, fill);
    painter.rect_filled(badge_rect, 4.0, fill);
    painter.text(
        badge_rect.center(),
        egui::Align2::CENTER_CENTER,
        label,
        egui::FontId::proportional(BADGE_FONT),
        text_color,
    );

    badge_rect.union(egui::Rect::from_center_size(pos, egui::vec2(8.0, 8.0)))
}

/// Topmost marker under `pos`. Later entries are drawn above earlier ones.
fn hit_test(hit_boxes: &[(LocationKey, egui::Rect)], pos: egui::Pos2) -> Option<&LocationKey> {
    hit_boxes
        .iter()
        .rev()
        .find(|(_, rect)| rect.contains(pos))
        .map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    #[test]
    fn test_view_center_maps_to_canvas_center() {
        let view = MapView::new(LatLng::new(45.4215, -75.6972));
        let pos = view.to_screen(canvas(), LatLng::new(45.4215, -75.6972));
        assert_eq!(pos, canvas().center());
    }

    #[test]
    fn test_north_is_up_and_east_is_right() {
        let view = MapView::new(LatLng::new(45.4215, -75.6972));
        let north = view.to_screen(canvas(), LatLng::new(45.43, -75.6972));
        let east = view.to_screen(canvas(), LatLng::new(45.4215, -75.68));
        assert!(north.y < canvas().center().y);
        assert!(east.x > canvas().center().x);
    }

    #[test]
    fn test_screen_position_converts_back_to_coordinates() {
        let view = MapView::new(LatLng::new(45.4215, -75.6972));
        let point = LatLng::new(45.43, -75.71);
        let back = view.from_screen(canvas(), view.to_screen(canvas(), point));
        assert!((back.lat - point.lat).abs() < 1e-4);
        assert!((back.lng - point.lng).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = MapView::new(LatLng::new(45.0, -75.0));
        view.zoom_by(1000.0);
        assert_eq!(view.px_per_km, MAX_PX_PER_KM);
        view.zoom_by(0.0001);
        assert_eq!(view.px_per_km, MIN_PX_PER_KM);
    }

    #[test]
    fn test_hit_test_prefers_topmost_marker() {
        let a = LocationKey::from_coords(45.0, -75.0);
        let b = LocationKey::from_coords(45.1, -75.1);
        let boxes = vec![
            (a.clone(), egui::Rect::from_center_size(egui::pos2(10.0, 10.0), egui::vec2(20.0, 20.0))),
            (b.clone(), egui::Rect::from_center_size(egui::pos2(15.0, 10.0), egui::vec2(20.0, 20.0))),
        ];
        assert_eq!(hit_test(&boxes, egui::pos2(12.0, 10.0)), Some(&b));
        assert_eq!(hit_test(&boxes, egui::pos2(1.0, 10.0)), Some(&a));
        assert_eq!(hit_test(&boxes, egui::pos2(100.0, 100.0)), None);
    }
}
