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

//! Listing photo texture cache and loading.
//!
//! Photos are downloaded on the shared runtime, cached on disk with
//! SHA256-based filenames and uploaded as egui textures. A URL that fails
//! once (HTTP error or undecodable bytes) is remembered and never retried;
//! callers render the placeholder for it instead.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type PhotoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Longest edge of a decoded photo; card and thumbnails scale from this.
const MAX_EDGE: u32 = 480;

/// Disk cache for listing photos
#[derive(Debug, Clone)]
pub struct PhotoCache {
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl PhotoCache {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let cache_dir = dirs::cache_dir()
            .ok_or("Could not determine cache directory")?
            .join("listing-explorer")
            .join("photos");
        Self::with_dir(cache_dir)
    }

    pub fn with_dir(cache_dir: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            client: reqwest::Client::new(),
        })
    }

    /// Get cache file path for a given URL
    fn get_cache_path(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        let ext = Path::new(url.rsplit('/').next().unwrap_or_default())
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");

        self.cache_dir.join(format!("{hash}.{ext}"))
    }

    /// Get cached image bytes
    pub fn get_cached_bytes(&self, url: &str) -> Option<Vec<u8>> {
        fs::read(self.get_cache_path(url)).ok()
    }

    /// Download an image and write it to the cache
    pub async fn download_and_cache(&self, url: &str) -> PhotoResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()).into());
        }

        let bytes = response.bytes().await?.to_vec();
        self.store(url, &bytes);
        Ok(bytes)
    }

    /// Write downloaded bytes to disk. A failed write only costs the cache
    /// entry; the bytes are still good for this session.
    fn store(&self, url: &str, bytes: &[u8]) -> bool {
        let path = self.get_cache_path(url);
        match fs::write(&path, bytes) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not cache photo {url} at {}: {e}", path.display());
                false
            }
        }
    }
}

/// Decode and downscale photo bytes for upload.
fn decode_image(bytes: &[u8]) -> Option<egui::ColorImage> {
    let image = image::load_from_memory(bytes).ok()?;
    let image = if image.width() > MAX_EDGE || image.height() > MAX_EDGE {
        image.resize(MAX_EDGE, MAX_EDGE, image::imageops::FilterType::Triangle)
    } else {
        image
    };
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Some(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Where a photo URL stands.
#[derive(Clone)]
pub enum PhotoStatus {
    Loading,
    Ready(egui::TextureHandle),
    Failed,
}

#[derive(Default)]
struct Slots {
    textures: HashMap<String, egui::TextureHandle>,
    loading: HashSet<String>,
    failed: HashSet<String>,
}

/// Manages loading listing photos into egui textures
pub struct PhotoTextureManager {
    cache: PhotoCache,
    runtime: tokio::runtime::Handle,
    slots: Arc<Mutex<Slots>>,
    placeholder: Option<egui::TextureHandle>,
}

impl std::fmt::Debug for PhotoTextureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoTextureManager")
            .field("cache", &self.cache)
            .field("placeholder", &self.placeholder.is_some())
            .finish_non_exhaustive()
    }
}

impl PhotoTextureManager {
    pub fn new(cache: PhotoCache, runtime: tokio::runtime::Handle) -> Self {
        Self {
            cache,
            runtime,
            slots: Arc::new(Mutex::new(Slots::default())),
            placeholder: None,
        }
    }

    /// Initialize placeholder texture (call once during UI setup)
    pub fn init_placeholder(&mut self, ctx: &egui::Context) {
        let width = 96;
        let height = 64;
        let background = egui::Color32::from_rgb(60, 60, 70);
        let glyph = egui::Color32::from_rgb(110, 110, 120);
        let mut pixels = vec![background; width * height];

        // House outline: roof triangle over a square body
        for y in 16..32 {
            let half = y - 16;
            for x in (48 - half)..(48 + half) {
                pixels[y * width + x] = glyph;
            }
        }
        for y in 32..50 {
            for x in 34..62 {
                pixels[y * width + x] = glyph;
            }
        }

        let image = egui::ColorImage {
            size: [width, height],
            pixels,
            source_size: egui::Vec2::new(width as f32, height as f32),
        };
        self.placeholder = Some(ctx.load_texture(
            "listing_placeholder",
            image,
            egui::TextureOptions::LINEAR,
        ));
    }

    /// Get placeholder texture
    pub fn get_placeholder(&self) -> Option<&egui::TextureHandle> {
        self.placeholder.as_ref()
    }

    /// Current status of `url`, starting a download on first sight.
    pub fn status(&self, ctx: &egui::Context, url: &str) -> PhotoStatus {
        let Ok(mut slots) = self.slots.lock() else {
            return PhotoStatus::Failed;
        };
        if let Some(texture) = slots.textures.get(url) {
            return PhotoStatus::Ready(texture.clone());
        }
        if slots.failed.contains(url) {
            return PhotoStatus::Failed;
        }
        if slots.loading.contains(url) {
            return PhotoStatus::Loading;
        }

        if let Some(bytes) = self.cache.get_cached_bytes(url) {
            let Some(image) = decode_image(&bytes) else {
                slots.failed.insert(url.to_string());
                return PhotoStatus::Failed;
            };
            let texture = ctx.load_texture(url, image, egui::TextureOptions::LINEAR);
            slots.textures.insert(url.to_string(), texture.clone());
            return PhotoStatus::Ready(texture);
        }

        slots.loading.insert(url.to_string());
        drop(slots);

        let cache = self.cache.clone();
        let slots = Arc::clone(&self.slots);
        let ctx = ctx.clone();
        let url = url.to_string();
        self.runtime.spawn(async move {
            let texture = match cache.download_and_cache(&url).await {
                Ok(bytes) => decode_image(&bytes)
                    .map(|image| ctx.load_texture(&url, image, egui::TextureOptions::LINEAR)),
                Err(e) => {
                    log::warn!("Photo download failed for {url}: {e}");
                    None
                }
            };

            if let Ok(mut slots) = slots.lock() {
                slots.loading.remove(&url);
                match texture {
                    Some(texture) => {
                        slots.textures.insert(url, texture);
                    }
                    None => {
                        log::debug!("Marking photo as unavailable: {url}");
                        slots.failed.insert(url);
                    }
                }
            }
            ctx.request_repaint();
        });

        PhotoStatus::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> PhotoCache {
        PhotoCache::with_dir(std::env::temp_dir().join("listing-explorer-test-photos")).unwrap()
    }

    #[test]
    fn test_cache_path_is_stable_and_keeps_extension() {
        let cache = cache();
        let a = cache.get_cache_path("https://photos.example/X123_1.jpg");
        let b = cache.get_cache_path("https://photos.example/X123_1.jpg");
        let c = cache.get_cache_path("https://photos.example/X123_2.png");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.extension().unwrap(), "jpg");
        assert_eq!(c.extension().unwrap(), "png");
    }

    #[test]
    fn test_cache_path_without_extension_defaults_to_jpg() {
        let path = cache().get_cache_path("https://photos.example/photo?id=5");
        assert_eq!(path.extension().unwrap(), "jpg");
    }

    #[test]
    fn test_stored_bytes_are_read_back() {
        let cache = cache();
        let url = "https://photos.example/STORE_1.jpg";
        assert!(cache.store(url, b"jpeg bytes"));
        assert_eq!(cache.get_cached_bytes(url).as_deref(), Some(&b"jpeg bytes"[..]));
    }

    #[test]
    fn test_unwritable_cache_dir_is_not_fatal() {
        let dir = std::env::temp_dir().join("listing-explorer-test-gone");
        let cache = PhotoCache::with_dir(dir.clone()).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let url = "https://photos.example/GONE_1.jpg";
        assert!(!cache.store(url, b"jpeg bytes"));
        assert!(cache.get_cached_bytes(url).is_none());
    }

    #[test]
    fn test_undecodable_bytes_are_rejected() {
        assert!(decode_image(b"<html>not found</html>").is_none());
    }

    #[test]
    fn test_large_images_are_downscaled() {
        let image = image::RgbaImage::from_pixel(1200, 600, image::Rgba([200, 10, 10, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(bytes.get_ref()).unwrap();
        assert_eq!(decoded.size, [480, 240]);
    }
}
