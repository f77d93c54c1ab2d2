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

//! Monthly chart: sold counts as bars, the selected metric as a line.

use eframe::egui;
use listing_engine::{ChartMetric, ChartView};

const BAR_COLOR: egui::Color32 = egui::Color32::from_rgb(70, 140, 220);
const LINE_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 170, 60);
const AXIS_COLOR: egui::Color32 = egui::Color32::from_rgb(90, 95, 105);
const TEXT_COLOR: egui::Color32 = egui::Color32::from_rgb(160, 160, 160);

/// Value range for a line series, always containing zero and never empty.
fn line_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if (max - min).abs() < f64::EPSILON {
        (min, min + 1.0)
    } else {
        (min, max)
    }
}

/// Show every `n`th month label so they don't overlap.
fn label_step(count: usize, width: f32, label_width: f32) -> usize {
    let fit = (width / label_width).floor().max(1.0) as usize;
    count.div_ceil(fit).max(1)
}

fn format_metric(metric: ChartMetric, value: f64) -> String {
    match metric {
        ChartMetric::Price => listing_engine::format::compact_price(value),
        ChartMetric::DaysOnMarket => format!("{value:.0} days"),
        ChartMetric::SoldVsList => listing_engine::format::percent(value),
    }
}

/// Draw `chart` into the available width.
pub fn show(ui: &mut egui::Ui, chart: &ChartView, height: f32) {
    let (response, painter) =
        ui.allocate_painter(egui::vec2(ui.available_width(), height), egui::Sense::hover());
    let rect = response.rect;

    if chart.is_empty() {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "No sales in this area",
            egui::FontId::proportional(12.0),
            TEXT_COLOR,
        );
        return;
    }

    let plot = egui::Rect::from_min_max(
        rect.min + egui::vec2(8.0, 8.0),
        rect.max - egui::vec2(8.0, 22.0),
    );
    painter.line_segment(
        [plot.left_bottom(), plot.right_bottom()],
        egui::Stroke::new(1.0, AXIS_COLOR),
    );

    let n = chart.labels.len();
    let slot = plot.width() / n as f32;
    let max_count = chart.counts.iter().copied().fold(1.0_f64, f64::max);
    let (line_min, line_max) = line_range(&chart.line);
    let line_y = |v: f64| {
        let t = ((v - line_min) / (line_max - line_min)) as f32;
        plot.bottom() - t * plot.height()
    };

    // Bars
    for (i, count) in chart.counts.iter().enumerate() {
        let h = (count / max_count) as f32 * plot.height();
        let x = plot.left() + slot * i as f32;
        let bar = egui::Rect::from_min_max(
            egui::pos2(x + slot * 0.15, plot.bottom() - h),
            egui::pos2(x + slot * 0.85, plot.bottom()),
        );
        painter.rect_filled(bar, 2.0, BAR_COLOR.gamma_multiply(0.8));
    }

    // Line overlay
    let points: Vec<egui::Pos2> = chart
        .line
        .iter()
        .enumerate()
        .map(|(i, v)| egui::pos2(plot.left() + slot * (i as f32 + 0.5), line_y(*v)))
        .collect();
    painter.add(egui::Shape::line(points.clone(), egui::Stroke::new(2.0, LINE_COLOR)));
    for p in &points {
        painter.circle_filled(*p, 2.5, LINE_COLOR);
    }

    // Month labels
    let step = label_step(n, plot.width(), 52.0);
    for (i, label) in chart.labels.iter().enumerate().step_by(step) {
        painter.text(
            egui::pos2(plot.left() + slot * (i as f32 + 0.5), plot.bottom() + 4.0),
            egui::Align2::CENTER_TOP,
            label,
            egui::FontId::proportional(10.0),
            TEXT_COLOR,
        );
    }

    // Hover readout
    if let Some(pos) = response.hover_pos() {
        if plot.x_range().contains(pos.x) {
            let i = (((pos.x - plot.left()) / slot) as usize).min(n - 1);
            let x = plot.left() + slot * (i as f32 + 0.5);
            painter.line_segment(
                [egui::pos2(x, plot.top()), egui::pos2(x, plot.bottom())],
                egui::Stroke::new(1.0, AXIS_COLOR),
            );
            let text = format!(
                "{}: {} sold, {} {}",
                chart.labels[i],
                chart.counts.get(i).copied().unwrap_or_default(),
                chart.metric.label(),
                format_metric(chart.metric, chart.line.get(i).copied().unwrap_or_default()),
            );
            painter.text(
                plot.left_top(),
                egui::Align2::LEFT_TOP,
                text,
                egui::FontId::proportional(11.0),
                egui::Color32::WHITE,
            );
        }
    }
}
