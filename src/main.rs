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

mod app;
mod chart_view;
mod config;
mod map_view;
mod photo_cache;

use clap::Parser;
use eframe::egui;

use app::ExplorerApp;
use config::AppConfig;
use photo_cache::{PhotoCache, PhotoTextureManager};

type AppError = Box<dyn std::error::Error + Send + Sync>;

/// Desktop explorer for sold real-estate listings
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Listing server root URL (overrides the saved setting)
    #[arg(long)]
    server: Option<String>,

    /// Starting search radius in kilometres (0 - 15)
    #[arg(long)]
    radius: Option<f64>,

    /// Starting circle latitude
    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Starting circle longitude
    #[arg(long, allow_negative_numbers = true)]
    lng: Option<f64>,

    /// Overwrite the saved configuration with defaults before starting
    #[arg(long)]
    reset_config: bool,
}

impl Args {
    /// Apply command-line overrides on top of the stored configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.server_url.clone_from(server);
        }
        if let Some(radius) = self.radius {
            config.default_radius_km = radius;
        }
        if let Some(lat) = self.lat {
            config.default_center_lat = lat;
        }
        if let Some(lng) = self.lng {
            config.default_center_lng = lng;
        }
    }
}

fn load_config(args: &Args) -> AppConfig {
    let mut config = if args.reset_config {
        let config = AppConfig::default();
        match config.save() {
            Ok(()) => log::info!("Configuration reset to defaults"),
            Err(e) => log::warn!("Failed to reset configuration: {e}"),
        }
        config
    } else {
        AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load configuration, using defaults: {e}");
            AppConfig::default()
        })
    };
    if let Ok(path) = AppConfig::get_config_path() {
        log::debug!("Configuration file: {}", path.display());
    }
    args.apply(&mut config);
    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("Starting Listing Explorer...");

    let config = load_config(&args);
    log::info!(
        "Listing server {} | center {:.4}, {:.4} | radius {} km",
        config.server_url,
        config.default_center_lat,
        config.default_center_lng,
        config.default_radius_km
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let photos = PhotoTextureManager::new(PhotoCache::new()?, runtime.handle().clone());
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 860.0])
            .with_title("Listing Explorer"),
        ..Default::default()
    };

    eframe::run_native(
        "Listing Explorer",
        options,
        Box::new(
            move |cc: &eframe::CreationContext<'_>| -> Result<Box<dyn eframe::App>, AppError> {
                let app = ExplorerApp::new(cc, config, handle, photos)?;
                Ok(Box::new(app))
            },
        ),
    )?;

    Ok(())
}
