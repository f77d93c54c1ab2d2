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

//! Application configuration management.
//!
//! Settings persist as TOML through `confy`. Command-line flags override the
//! stored values for a single run; the engine only ever sees the plain
//! [`ExplorerConfig`] built from them.

use std::time::Duration;

use chrono::Utc;
use listing_engine::{
    Bounds, DateWindow, ExplorerConfig, HttpSourceConfig, LatLng, PhotoMode,
    DEFAULT_PHOTO_BASE_URL,
};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "listing-explorer";
const CONFIG_NAME: &str = "config";

/// Default listing server address
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Root URL of the listing server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Container that listing photos are served from
    #[serde(default = "default_photo_base_url")]
    pub photo_base_url: String,

    /// How photo URLs are derived: "convention" or "field"
    #[serde(default)]
    pub photo_mode: PhotoMode,

    /// Circle center on startup
    #[serde(default = "default_center_lat")]
    pub default_center_lat: f64,

    #[serde(default = "default_center_lng")]
    pub default_center_lng: f64,

    /// Circle radius on startup (0 - 15 km)
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,

    /// Quiet period before a burst of filter changes is sent
    #[serde(default = "default_query_debounce_ms")]
    pub query_debounce_ms: u64,

    /// Months covered by the sold-date slider, ending this month
    #[serde(default = "default_date_window_months")]
    pub date_window_months: u32,

    /// Filter panel expanded state
    #[serde(default = "default_true")]
    pub filters_panel_open: bool,

    /// Sidebar panel width in pixels
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: f32,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_photo_base_url() -> String {
    DEFAULT_PHOTO_BASE_URL.to_string()
}

fn default_center_lat() -> f64 {
    45.4215
}

fn default_center_lng() -> f64 {
    -75.6972
}

fn default_radius_km() -> f64 {
    5.0
}

fn default_query_debounce_ms() -> u64 {
    150
}

fn default_date_window_months() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

fn default_sidebar_width() -> f32 {
    380.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            server_url: default_server_url(),
            photo_base_url: default_photo_base_url(),
            photo_mode: PhotoMode::default(),
            default_center_lat: default_center_lat(),
            default_center_lng: default_center_lng(),
            default_radius_km: default_radius_km(),
            query_debounce_ms: default_query_debounce_ms(),
            date_window_months: default_date_window_months(),
            filters_panel_open: true,
            sidebar_width: default_sidebar_width(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        let config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;
        log::info!("Loaded configuration (server {})", config.server_url);
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)?;
        log::debug!("Configuration saved");
        Ok(())
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Settings for the HTTP listing source
    pub fn source_config(&self) -> HttpSourceConfig {
        HttpSourceConfig {
            base_url: self.server_url.clone(),
            ..Default::default()
        }
    }

    /// Engine settings; the date window ends in the current month
    pub fn to_explorer_config(&self) -> ExplorerConfig {
        ExplorerConfig {
            center: LatLng::new(self.default_center_lat, self.default_center_lng),
            radius_km: self.default_radius_km,
            bounds: Bounds::OTTAWA,
            date_window: DateWindow::ending(Utc::now().date_naive(), self.date_window_months),
            debounce: Duration::from_millis(self.query_debounce_ms),
            photo_mode: self.photo_mode,
            photo_base_url: self.photo_base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig = from_partial(r#"{"server_url": "http://listings.local:8080"}"#);
        assert_eq!(config.server_url, "http://listings.local:8080");
        assert_eq!(config.default_radius_km, 5.0);
        assert_eq!(config.query_debounce_ms, 150);
        assert_eq!(config.photo_mode, PhotoMode::Convention);
        assert!(config.filters_panel_open);
    }

    #[test]
    fn test_photo_mode_uses_lowercase_names() {
        let config: AppConfig = from_partial(r#"{"photo_mode": "field"}"#);
        assert_eq!(config.photo_mode, PhotoMode::Field);
    }

    #[test]
    fn test_explorer_config_carries_settings() {
        let config = AppConfig {
            default_center_lat: 45.40,
            default_center_lng: -75.70,
            default_radius_km: 3.0,
            query_debounce_ms: 250,
            date_window_months: 12,
            ..Default::default()
        };
        let explorer = config.to_explorer_config();
        assert_eq!(explorer.center, LatLng::new(45.40, -75.70));
        assert_eq!(explorer.radius_km, 3.0);
        assert_eq!(explorer.debounce, Duration::from_millis(250));
        assert_eq!(explorer.date_window.last_offset(), 11);
    }

    fn from_partial(json: &str) -> AppConfig {
        serde_json::from_str(json).unwrap()
    }
}
