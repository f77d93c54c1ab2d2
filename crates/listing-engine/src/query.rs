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

//! Query coordination with last-request-wins ordering.
//!
//! Filter and AOI mutations only mark the coordinator dirty. Once the
//! debounce interval has passed, a single request is issued carrying a
//! sequence number. A response is applied only if its sequence is the most
//! recently issued one; anything older is discarded on arrival. No in-flight
//! request is ever cancelled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::client::ListingSource;
use crate::error::EngineError;
use crate::model::{FilteredRequest, FilteredResponse};

/// A request that has been issued and is awaiting its response.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTicket {
    pub seq: u64,
    pub request: FilteredRequest,
}

/// The result of a ticket, paired with its sequence number.
#[derive(Debug)]
pub struct QueryOutcome {
    pub seq: u64,
    pub result: Result<FilteredResponse, EngineError>,
}

/// What to do with an arriving outcome.
#[derive(Debug)]
pub enum Resolution {
    /// Latest response; fan it out.
    Apply(FilteredResponse),
    /// A newer request has been issued since.
    Stale,
    /// The latest request failed; keep the current view.
    Failed,
}

/// Debounced, sequence-numbered query issuer.
#[derive(Debug)]
pub struct QueryCoordinator {
    debounce: Duration,
    last_seq: u64,
    last_applied: Option<u64>,
    dirty_since: Option<Instant>,
    in_flight: usize,
}

impl QueryCoordinator {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            last_seq: 0,
            last_applied: None,
            dirty_since: None,
            in_flight: 0,
        }
    }

    /// Mark state as changed. Repeated calls before the query is issued
    /// coalesce into one request; the debounce window restarts on each call.
    pub fn request_refresh(&mut self, now: Instant) {
        self.dirty_since = Some(now);
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// Whether a coalesced refresh is ready to be issued at `now`.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.dirty_since
            .is_some_and(|since| now.saturating_duration_since(since) >= self.debounce)
    }

    /// Time left until the pending refresh becomes due.
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.dirty_since
            .map(|since| self.debounce.saturating_sub(now.saturating_duration_since(since)))
    }

    /// Issue a request, superseding every earlier one.
    pub fn issue(&mut self, request: FilteredRequest) -> QueryTicket {
        self.dirty_since = None;
        self.last_seq += 1;
        self.in_flight += 1;
        info!(
            "Issuing query #{} (radius {:.1} km, {} filter(s))",
            self.last_seq,
            request.radius_km,
            filter_count(&request)
        );
        QueryTicket {
            seq: self.last_seq,
            request,
        }
    }

    /// Decide whether an arriving outcome may be applied.
    pub fn resolve(&mut self, outcome: QueryOutcome) -> Resolution {
        self.in_flight = self.in_flight.saturating_sub(1);

        if outcome.seq != self.last_seq {
            debug!(
                "Discarding stale response #{} (latest is #{})",
                outcome.seq, self.last_seq
            );
            return Resolution::Stale;
        }

        match outcome.result {
            Ok(response) => {
                self.last_applied = Some(outcome.seq);
                Resolution::Apply(response)
            }
            Err(e) => {
                warn!("Failed to fetch filtered points (query #{}): {}", outcome.seq, e);
                Resolution::Failed
            }
        }
    }

    /// Sequence number of the most recently issued request.
    #[must_use]
    pub fn latest_seq(&self) -> u64 {
        self.last_seq
    }

    /// Sequence number of the response currently on screen.
    #[must_use]
    pub fn applied_seq(&self) -> Option<u64> {
        self.last_applied
    }

    /// Whether any issued request has not yet resolved.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

fn filter_count(request: &FilteredRequest) -> usize {
    let f = &request.filters;
    [
        f.sold_start.is_some(),
        f.sold_end.is_some(),
        f.min_price.is_some(),
        f.max_price.is_some(),
        f.beds.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count()
}

/// Run a ticket against `source` on the given runtime and post the outcome
/// to `outcomes`. The receiver decides whether the result is still wanted.
pub fn dispatch<S>(
    runtime: &tokio::runtime::Handle,
    source: Arc<S>,
    ticket: QueryTicket,
    outcomes: mpsc::UnboundedSender<QueryOutcome>,
) where
    S: ListingSource + 'static,
{
    runtime.spawn(async move {
        let result = source.fetch_filtered(&ticket.request).await;
        if outcomes
            .send(QueryOutcome {
                seq: ticket.seq,
                result,
            })
            .is_err()
        {
            debug!("Query #{} finished after receiver closed", ticket.seq);
        }
    });
}
