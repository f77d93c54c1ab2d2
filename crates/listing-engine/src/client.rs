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

//! HTTP access to the listing server.
//!
//! [`ListingSource`] is the seam between the engine and the network; the
//! explorer and query coordinator only ever see the trait, which keeps them
//! testable with in-memory sources.

use std::future::Future;
use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::EngineError;
use crate::model::{FilteredRequest, FilteredResponse, Listing, RefreshStatus};

/// Source of listing data.
pub trait ListingSource: Send + Sync {
    /// Full unfiltered dataset, loaded once at startup.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Listing>, EngineError>> + Send;

    /// Listings matching the given area and filters.
    fn fetch_filtered(
        &self,
        request: &FilteredRequest,
    ) -> impl Future<Output = Result<FilteredResponse, EngineError>> + Send;
}

/// Configuration for the HTTP listing source.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Server root, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// Listing source backed by the Flask listing server.
#[derive(Debug, Clone)]
pub struct HttpListingSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ServerError {
    error: String,
}

impl HttpListingSource {
    pub fn new(config: &HttpSourceConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Ask the server to reload its dataset.
    pub async fn refresh_data(&self) -> Result<RefreshStatus, EngineError> {
        let response = self.client.post(self.endpoint("refresh-data")).send().await?;
        decode(response).await
    }
}

impl ListingSource for HttpListingSource {
    async fn fetch_all(&self) -> Result<Vec<Listing>, EngineError> {
        let response = self.client.get(self.endpoint("points.json")).send().await?;
        let points: Vec<Listing> = decode(response).await?;
        debug!("Fetched {} points from {}", points.len(), self.base_url);
        Ok(points)
    }

    async fn fetch_filtered(
        &self,
        request: &FilteredRequest,
    ) -> Result<FilteredResponse, EngineError> {
        let response = self
            .client
            .post(self.endpoint("filtered-points"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, EngineError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ServerError>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
        return Err(EngineError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_slice(&body)?)
}
