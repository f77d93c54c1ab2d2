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

//! Display formatting shared by the presenters.

/// Shown wherever a value is unavailable.
pub const PLACEHOLDER: &str = "–";

/// Group an integer with thousands separators: `1234567` -> `1,234,567`.
#[must_use]
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Whole-dollar amount, e.g. `$1,234,567`. Negative values are shown as `-$…`.
#[must_use]
pub fn currency(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", thousands(rounded.abs() as u64))
}

/// Short price for map badges: `$950K`, `$1.2M`.
#[must_use]
pub fn compact_price(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.0}K", value / 1_000.0)
    } else {
        format!("${value:.0}")
    }
}

/// Signed percentage with one decimal, e.g. `+2.4%`.
#[must_use]
pub fn percent(value: f64) -> String {
    format!("{value:+.1}%")
}

/// Optional value rendered with `f`, or the placeholder.
pub fn or_placeholder<T>(value: Option<T>, f: impl FnOnce(T) -> String) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), f)
}
