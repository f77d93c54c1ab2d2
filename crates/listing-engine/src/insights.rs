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

//! Headline statistics and the monthly trend chart.
//!
//! Count and price extremes come straight from the server summary. Average
//! days on market and sold-vs-list percentage are recomputed from the points
//! actually on screen. The chart keeps the last monthly series so switching
//! the line metric never needs a refetch.

use crate::format;
use crate::model::{Listing, MonthBucket, Summary};

/// Metric drawn as the chart's line dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChartMetric {
    #[default]
    Price,
    DaysOnMarket,
    SoldVsList,
}

impl ChartMetric {
    pub const ALL: [Self; 3] = [Self::Price, Self::DaysOnMarket, Self::SoldVsList];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Price => "Average Sold Price",
            Self::DaysOnMarket => "Average Days on Market",
            Self::SoldVsList => "Sold vs List (%)",
        }
    }

    fn value(self, bucket: &MonthBucket) -> f64 {
        let v = match self {
            Self::Price => bucket.avg_price,
            Self::DaysOnMarket => bucket.avg_dom,
            Self::SoldVsList => bucket.avg_diff_pct,
        };
        v.filter(|x| x.is_finite()).unwrap_or(0.0)
    }
}

/// Headline figures, already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsView {
    pub count: String,
    pub average_price: String,
    pub max_price: String,
    pub min_price: String,
    pub avg_days_on_market: String,
    pub avg_sold_vs_list: String,
}

impl StatsView {
    fn empty() -> Self {
        let dash = || format::PLACEHOLDER.to_string();
        Self {
            count: dash(),
            average_price: dash(),
            max_price: dash(),
            min_price: dash(),
            avg_days_on_market: dash(),
            avg_sold_vs_list: dash(),
        }
    }
}

/// Combined bar + line chart keyed by calendar month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartView {
    pub labels: Vec<String>,
    /// Listings sold per month (bars).
    pub counts: Vec<f64>,
    /// Selected metric per month (line).
    pub line: Vec<f64>,
    pub metric: ChartMetric,
}

impl ChartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightsView {
    pub stats: StatsView,
    pub chart: ChartView,
}

/// Owner of the insights panel state.
#[derive(Debug, Clone)]
pub struct InsightsPresenter {
    metric: ChartMetric,
    by_month: Vec<MonthBucket>,
    view: InsightsView,
}

impl Default for InsightsPresenter {
    fn default() -> Self {
        Self {
            metric: ChartMetric::default(),
            by_month: Vec::new(),
            view: InsightsView {
                stats: StatsView::empty(),
                chart: ChartView::default(),
            },
        }
    }
}

impl InsightsPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive stats and chart from a fresh response.
    pub fn render(&mut self, summary: &Summary, points: &[Listing]) -> &InsightsView {
        if summary.count == 0 {
            self.by_month.clear();
            self.view = InsightsView {
                stats: StatsView::empty(),
                chart: ChartView {
                    metric: self.metric,
                    ..ChartView::default()
                },
            };
            return &self.view;
        }

        let money = |v: Option<f64>| {
            format::or_placeholder(v.filter(|x| x.is_finite() && *x != 0.0), format::currency)
        };
        let stats = StatsView {
            count: format::thousands(summary.count as u64),
            average_price: money(summary.average_price),
            max_price: money(summary.max_price),
            min_price: money(summary.min_price),
            avg_days_on_market: format::or_placeholder(
                mean(points.iter().map(|l| l.days_on_market)),
                |d| format!("{d:.0} days"),
            ),
            avg_sold_vs_list: format::or_placeholder(
                mean(points.iter().map(|l| l.price_diff_pct)),
                format::percent,
            ),
        };

        let mut by_month = summary.by_month.clone();
        by_month.sort_by(|a, b| a.month.cmp(&b.month));
        self.by_month = by_month;

        self.view = InsightsView {
            stats,
            chart: self.build_chart(),
        };
        &self.view
    }

    /// Switch the line metric, rebuilding only the line dataset.
    pub fn set_metric(&mut self, metric: ChartMetric) -> &ChartView {
        self.metric = metric;
        self.view.chart.metric = metric;
        self.view.chart.line = self.by_month.iter().map(|b| metric.value(b)).collect();
        &self.view.chart
    }

    #[must_use]
    pub fn metric(&self) -> ChartMetric {
        self.metric
    }

    #[must_use]
    pub fn view(&self) -> &InsightsView {
        &self.view
    }

    fn build_chart(&self) -> ChartView {
        ChartView {
            labels: self.by_month.iter().map(|b| b.month.clone()).collect(),
            counts: self.by_month.iter().map(|b| b.count as f64).collect(),
            line: self.by_month.iter().map(|b| self.metric.value(b)).collect(),
            metric: self.metric,
        }
    }
}

/// Mean of the finite values, or `None` when there are none.
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
