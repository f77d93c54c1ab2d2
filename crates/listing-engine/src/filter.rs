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

//! Non-geographic filter state: sold-date window, price range and bedrooms.
//!
//! Every setter clamps instead of rejecting, so the state is always valid.
//! [`FilterState::build_payload`] only emits constraints that differ from the
//! full range, making the default state identical to "no filters".

use std::collections::BTreeSet;

use chrono::{Datelike, Months, NaiveDate};

use crate::model::FilterPayload;

/// Lowest selectable price in dollars.
pub const MIN_PRICE: u64 = 0;
/// Highest selectable price in dollars.
pub const MAX_PRICE: u64 = 2_000_000;
/// Largest bed button; the top button means "this many or more".
pub const MAX_BEDS: u8 = 5;

/// Calendar months the date slider can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    origin: NaiveDate,
    months: u32,
}

impl DateWindow {
    /// Window of `months` months starting at the month containing `origin`.
    #[must_use]
    pub fn new(origin: NaiveDate, months: u32) -> Self {
        Self {
            origin: first_of_month(origin),
            months: months.max(1),
        }
    }

    /// Window of `months` months ending with the month containing `today`.
    #[must_use]
    pub fn ending(today: NaiveDate, months: u32) -> Self {
        let months = months.max(1);
        let origin = first_of_month(today)
            .checked_sub_months(Months::new(months - 1))
            .unwrap_or(NaiveDate::MIN);
        Self::new(origin, months)
    }

    /// Highest valid month offset.
    #[must_use]
    pub fn last_offset(&self) -> u32 {
        self.months - 1
    }

    /// First day of the month at `offset`.
    #[must_use]
    pub fn month_start(&self, offset: u32) -> NaiveDate {
        self.origin
            .checked_add_months(Months::new(offset.min(self.last_offset())))
            .unwrap_or(self.origin)
    }

    /// Last day of the month at `offset`.
    #[must_use]
    pub fn month_end(&self, offset: u32) -> NaiveDate {
        let start = self.month_start(offset);
        start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(start)
    }

    /// `YYYY-MM` label of the month at `offset`.
    #[must_use]
    pub fn label(&self, offset: u32) -> String {
        let start = self.month_start(offset);
        format!("{:04}-{:02}", start.year(), start.month())
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Sold-date range expressed as inclusive month offsets into a [`DateWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start_offset: u32,
    pub end_offset: u32,
}

/// Inclusive price range in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: u64,
    pub max: u64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: MIN_PRICE,
            max: MAX_PRICE,
        }
    }
}

/// Bedroom selection with its two-click interaction.
///
/// The first click on bed `b` selects `b..=MAX_BEDS`; the next click on any
/// button collapses the selection to exactly that button, after which the
/// following click starts a new range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BedSelection {
    selected: BTreeSet<u8>,
    range_mode: bool,
}

impl BedSelection {
    pub fn toggle(&mut self, bed: u8) {
        let bed = bed.clamp(1, MAX_BEDS);
        if self.range_mode {
            self.selected = BTreeSet::from([bed]);
            self.range_mode = false;
        } else {
            self.selected = (bed..=MAX_BEDS).collect();
            self.range_mode = true;
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.range_mode = false;
    }

    #[must_use]
    pub fn selected(&self) -> &BTreeSet<u8> {
        &self.selected
    }

    #[must_use]
    pub fn is_selected(&self, bed: u8) -> bool {
        self.selected.contains(&bed)
    }

    /// True when the next click will collapse to an exact value.
    #[must_use]
    pub fn awaiting_exact(&self) -> bool {
        self.range_mode
    }
}

/// Owner of date, price and bed filters.
#[derive(Debug, Clone)]
pub struct FilterState {
    window: DateWindow,
    dates: DateRange,
    price: PriceRange,
    beds: BedSelection,
}

impl FilterState {
    #[must_use]
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            dates: DateRange {
                start_offset: 0,
                end_offset: window.last_offset(),
            },
            price: PriceRange::default(),
            beds: BedSelection::default(),
        }
    }

    /// Set the sold-date range. Offsets are clamped into the window and
    /// swapped if given in reverse.
    pub fn set_date_range(&mut self, start_offset: u32, end_offset: u32) {
        let last = self.window.last_offset();
        let (a, b) = (start_offset.min(last), end_offset.min(last));
        self.dates = DateRange {
            start_offset: a.min(b),
            end_offset: a.max(b),
        };
    }

    /// Set the price range, clamped to `[MIN_PRICE, MAX_PRICE]`.
    pub fn set_price_range(&mut self, min: u64, max: u64) {
        let (a, b) = (min.clamp(MIN_PRICE, MAX_PRICE), max.clamp(MIN_PRICE, MAX_PRICE));
        self.price = PriceRange {
            min: a.min(b),
            max: a.max(b),
        };
    }

    pub fn toggle_bed(&mut self, bed: u8) {
        self.beds.toggle(bed);
    }

    /// Reset every filter to its full range.
    pub fn clear_all(&mut self) {
        self.beds.clear();
        self.dates = DateRange {
            start_offset: 0,
            end_offset: self.window.last_offset(),
        };
        self.price = PriceRange::default();
    }

    #[must_use]
    pub fn window(&self) -> DateWindow {
        self.window
    }

    #[must_use]
    pub fn dates(&self) -> DateRange {
        self.dates
    }

    #[must_use]
    pub fn price(&self) -> PriceRange {
        self.price
    }

    #[must_use]
    pub fn beds(&self) -> &BedSelection {
        &self.beds
    }

    /// Whether every filter is at its default.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.build_payload().is_empty()
    }

    /// Filters that differ from their full-range defaults.
    #[must_use]
    pub fn build_payload(&self) -> FilterPayload {
        let DateRange {
            start_offset,
            end_offset,
        } = self.dates;

        FilterPayload {
            sold_start: (start_offset > 0).then(|| self.window.month_start(start_offset)),
            sold_end: (end_offset < self.window.last_offset())
                .then(|| self.window.month_end(end_offset)),
            min_price: (self.price.min > MIN_PRICE).then_some(self.price.min),
            max_price: (self.price.max < MAX_PRICE).then_some(self.price.max),
            beds: (!self.beds.selected.is_empty())
                .then(|| self.beds.selected.iter().copied().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DateWindow {
        DateWindow::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 12)
    }

    #[test]
    fn test_bed_first_click_selects_range() {
        let mut beds = BedSelection::default();
        beds.toggle(3);
        assert_eq!(beds.selected(), &BTreeSet::from([3, 4, 5]));
        assert!(beds.awaiting_exact());
    }

    #[test]
    fn test_bed_second_click_collapses_to_exact() {
        let mut beds = BedSelection::default();
        beds.toggle(3);
        beds.toggle(2);
        assert_eq!(beds.selected(), &BTreeSet::from([2]));
        assert!(!beds.awaiting_exact());

        // Third click starts a fresh range
        beds.toggle(4);
        assert_eq!(beds.selected(), &BTreeSet::from([4, 5]));
    }

    #[test]
    fn test_default_state_builds_empty_payload() {
        let filters = FilterState::new(window());
        assert!(filters.build_payload().is_empty());
        assert!(filters.is_default());
    }

    #[test]
    fn test_payload_contains_only_changed_filters() {
        let mut filters = FilterState::new(window());
        filters.set_date_range(2, 11);
        filters.set_price_range(400_000, MAX_PRICE);

        let payload = filters.build_payload();
        assert_eq!(payload.sold_start, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(payload.sold_end, None);
        assert_eq!(payload.min_price, Some(400_000));
        assert_eq!(payload.max_price, None);
        assert_eq!(payload.beds, None);
    }

    #[test]
    fn test_date_end_is_last_day_of_month() {
        let mut filters = FilterState::new(window());
        filters.set_date_range(0, 1);
        assert_eq!(
            filters.build_payload().sold_end,
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let mut filters = FilterState::new(window());
        filters.set_price_range(9_000_000, 100_000);
        assert_eq!(
            filters.price(),
            PriceRange {
                min: 100_000,
                max: MAX_PRICE
            }
        );

        filters.set_date_range(40, 3);
        assert_eq!(
            filters.dates(),
            DateRange {
                start_offset: 3,
                end_offset: 11
            }
        );
    }

    #[test]
    fn test_clear_all_restores_defaults() {
        let mut filters = FilterState::new(window());
        filters.toggle_bed(2);
        filters.set_price_range(100_000, 500_000);
        filters.set_date_range(1, 4);
        filters.clear_all();
        assert!(filters.is_default());
        assert!(!filters.beds().awaiting_exact());
    }

    #[test]
    fn test_window_ending_today() {
        let w = DateWindow::ending(NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(), 24);
        assert_eq!(w.label(0), "2023-07");
        assert_eq!(w.label(w.last_offset()), "2025-06");
    }
}
