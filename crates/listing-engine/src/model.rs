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

//! Wire types exchanged with the listing server.
//!
//! The server is loose about its JSON: numeric columns may be `null`, the
//! MLS id may arrive as a number, and sold dates come in several textual
//! shapes depending on which endpoint produced them. Decoding here absorbs
//! those differences so the rest of the engine only sees typed values.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A single sold listing as returned by `/points.json` or `/filtered-points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// MLS number, unique per listing.
    #[serde(deserialize_with = "string_or_number")]
    pub mls: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Sold price in dollars.
    #[serde(default)]
    pub price: Option<f64>,
    /// Bedroom count.
    #[serde(default)]
    pub beds: Option<f64>,
    /// Bathroom count.
    #[serde(default)]
    pub baths: Option<f64>,
    /// Date the listing sold.
    #[serde(default, deserialize_with = "lenient_date")]
    pub sold_date: Option<NaiveDate>,
    /// Days on market before selling.
    #[serde(default, alias = "dom")]
    pub days_on_market: Option<f64>,
    /// Sold price relative to list price, in percent.
    #[serde(default)]
    pub price_diff_pct: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    /// External listing page.
    #[serde(default)]
    pub url: Option<String>,
    /// Explicit photo URL, when the deployment stores one per listing.
    #[serde(default, rename = "photo", alias = "photo_ref")]
    pub photo_ref: Option<String>,
}

impl Listing {
    /// Whether the coordinate pair is usable for placement.
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Monthly aggregate row of the server summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthBucket {
    /// Calendar month, `YYYY-MM`.
    pub month: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub avg_dom: Option<f64>,
    #[serde(default)]
    pub avg_diff_pct: Option<f64>,
}

/// Summary block of a filtered query response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub average_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_price: Option<f64>,
    /// Server-side average days on market. Decoded but not displayed.
    #[serde(default)]
    pub avg_dom: Option<f64>,
    /// Server-side average sold-vs-list percentage. Decoded but not displayed.
    #[serde(default)]
    pub avg_diff_pct: Option<f64>,
    #[serde(default)]
    pub by_month: Vec<MonthBucket>,
}

/// Response body of `POST /filtered-points`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredResponse {
    #[serde(default)]
    pub points: Vec<Listing>,
    #[serde(default)]
    pub summary: Summary,
}

/// Filters sent to the server. Keys at their default value are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_end: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beds: Option<Vec<u8>>,
}

impl FilterPayload {
    /// True when no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sold_start.is_none()
            && self.sold_end.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.beds.is_none()
    }
}

/// Request body of `POST /filtered-points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredRequest {
    /// `[lat, lng]` of the area-of-interest center.
    pub center: [f64; 2],
    pub radius_km: f64,
    pub filters: FilterPayload,
}

/// Response body of `POST /refresh-data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshStatus {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => format!("{f}"),
    })
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_sold_date))
}

/// Parse the date formats the server is known to emit.
///
/// Returns `None` for anything unrecognized rather than failing the whole
/// payload over one bad row.
#[must_use]
pub fn parse_sold_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    // Flask renders timestamps as "Tue, 14 Jan 2025 00:00:00 GMT"
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%a, %d %b %Y %H:%M:%S GMT") {
        return Some(dt.date());
    }
    // Scraped export format: "January-14-2025"
    NaiveDate::parse_from_str(raw, "%B-%d-%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_tolerates_nulls_and_aliases() {
        let json = r#"{
            "mls": 1234567,
            "latitude": 45.42,
            "longitude": -75.69,
            "price": null,
            "beds": 3.0,
            "baths": null,
            "sold_date": "Tue, 14 Jan 2025 00:00:00 GMT",
            "dom": 12.0,
            "price_diff_pct": -1.5,
            "address": "1 Main St",
            "url": null,
            "photo": "https://img.example/1.jpg"
        }"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.mls, "1234567");
        assert_eq!(listing.price, None);
        assert_eq!(listing.beds, Some(3.0));
        assert_eq!(listing.days_on_market, Some(12.0));
        assert_eq!(listing.sold_date, NaiveDate::from_ymd_opt(2025, 1, 14));
        assert_eq!(listing.photo_ref.as_deref(), Some("https://img.example/1.jpg"));
    }

    #[test]
    fn test_parse_sold_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_sold_date("2024-03-05"), expected);
        assert_eq!(parse_sold_date("2024-03-05T10:00:00"), expected);
        assert_eq!(parse_sold_date("2024-03-05 10:00:00"), expected);
        assert_eq!(parse_sold_date("March-05-2024"), expected);
        assert_eq!(parse_sold_date("not a date"), None);
        assert_eq!(parse_sold_date(""), None);
    }

    #[test]
    fn test_empty_summary_decodes() {
        let response: FilteredResponse =
            serde_json::from_str(r#"{"points": [], "summary": {"count": 0}}"#).unwrap();
        assert!(response.points.is_empty());
        assert_eq!(response.summary.count, 0);
        assert!(response.summary.by_month.is_empty());
        assert_eq!(response.summary.average_price, None);
    }

    #[test]
    fn test_payload_omits_defaults() {
        let payload = FilterPayload {
            min_price: Some(300_000),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "min_price": 300_000 }));
        assert!(FilterPayload::default().is_empty());
    }
}
