//! Fetch-on-proximity feed pagination.
//!
//! [`FeedPaginator`] owns the ordered list of received items and drives one
//! fetch at a time:
//!
//! ```text
//!            request_next()            apply(Ok)
//!   Idle ───────────────────► Fetching ──────────► Idle
//!                                │    apply(Err(other))
//!                                ├──────────────────► Idle
//!                                │    apply(Err(Auth))
//!                                └──────────────────► Unauthorized (terminal)
//! ```
//!
//! The fetch itself runs on a spawned task and reports back as a
//! [`FetchOutcome`] over an [`mpsc`] channel.  The event loop hands each
//! outcome to [`FeedPaginator::apply`], so all state changes happen on the
//! loop and never concurrently.
//!
//! ## For contributors
//!
//! There is no retry.  A dropped fetch is picked up again the
//! next time the proximity observer fires.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::client::ClientError;
use crate::source::{FeedItem, FeedSource};

/// Identifies one mounted feed view.  Results addressed to another view are
/// stale and get discarded.
pub type ViewId = u64;

/// Result of one fetch, sent back to the event loop.
#[derive(Debug)]
pub struct FetchOutcome {
    pub view: ViewId,
    pub result: Result<FeedItem, ClientError>,
}

/// What [`FeedPaginator::apply`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSignal {
    /// A new item was appended.
    Appended,
    /// The fetch failed; nothing was appended.
    Dropped,
    /// The backend rejected the session.  The feed is now terminal and the
    /// caller should send the user to the login screen.
    RedirectToLogin,
    /// The outcome belonged to another view.
    Stale,
}

/// An item plus the moment it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub item: FeedItem,
    pub received_at: DateTime<Utc>,
}

/// Observable pagination state.
#[derive(Debug, Default)]
pub struct FeedState {
    /// Append-only, in arrival order.
    pub items: Vec<FeedEntry>,
    pub fetch_in_flight: bool,
    /// Terminal once set.
    pub unauthorized: bool,
}

pub struct FeedPaginator<S> {
    view: ViewId,
    state: FeedState,
    source: Arc<S>,
    tx: mpsc::UnboundedSender<FetchOutcome>,
}

impl<S: FeedSource> FeedPaginator<S> {
    pub fn new(view: ViewId, source: S, tx: mpsc::UnboundedSender<FetchOutcome>) -> Self {
        Self {
            view,
            state: FeedState::default(),
            source: Arc::new(source),
            tx,
        }
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn items(&self) -> &[FeedEntry] {
        &self.state.items
    }

    pub fn len(&self) -> usize {
        self.state.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.items.is_empty()
    }

    /// Start fetching the next item.
    ///
    /// Returns `false` without doing anything when the feed is unauthorized
    /// or a fetch is already outstanding.  Must be called from within a
    /// tokio runtime.
    pub fn request_next(&mut self) -> bool {
        if self.state.unauthorized || self.state.fetch_in_flight {
            tracing::trace!(
                view = self.view,
                unauthorized = self.state.unauthorized,
                in_flight = self.state.fetch_in_flight,
                "request_next ignored"
            );
            return false;
        }

        self.state.fetch_in_flight = true;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let view = self.view;
        tracing::debug!(view, source = source.name(), "fetching next item");

        tokio::spawn(async move {
            let result = source.fetch_next().await;
            // The receiver is gone only when the app is shutting down.
            let _ = tx.send(FetchOutcome { view, result });
        });
        true
    }

    /// Fold a finished fetch into the state.
    pub fn apply(&mut self, outcome: FetchOutcome) -> FeedSignal {
        if outcome.view != self.view {
            tracing::debug!(view = self.view, stale = outcome.view, "discarding stale fetch result");
            return FeedSignal::Stale;
        }

        self.state.fetch_in_flight = false;
        match outcome.result {
            Ok(item) => {
                self.state.items.push(FeedEntry {
                    item,
                    received_at: Utc::now(),
                });
                tracing::debug!(view = self.view, total = self.state.items.len(), "item appended");
                FeedSignal::Appended
            }
            Err(e) if e.is_auth() => {
                self.state.unauthorized = true;
                tracing::info!(view = self.view, "feed unauthorized, stopping pagination");
                FeedSignal::RedirectToLogin
            }
            Err(e) => {
                tracing::warn!(view = self.view, error = %e, "failed to fetch feed item");
                FeedSignal::Dropped
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
