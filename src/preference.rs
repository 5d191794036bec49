//! Optimistic like / unlike with rollback.
//!
//! Each displayed item has a [`PreferenceState`] that moves through
//!
//! ```text
//!   Idle ──toggle()──► Pending ──settle(Ok)──► Committed
//!                         └─────settle(Err)──► RolledBack
//! ```
//!
//! `toggle` flips `liked` immediately so the UI can show it before the
//! request resolves.  `settle` either keeps that value or restores the one
//! from before the toggle.  A new toggle is only accepted once the previous
//! one has settled.
//!
//! Items are keyed by their position in the feed; the feed is append-only and
//! never deduplicated, so positions are stable for the lifetime of a view.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::client::ClientError;
use crate::paginator::ViewId;
use crate::session::SessionStore;
use crate::source::PreferenceSink;

pub type ItemKey = usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferenceState {
    pub liked: bool,
    pub phase: Phase,
}

impl PreferenceState {
    /// While pending, the like control must be disabled.
    pub fn pending(&self) -> bool {
        self.phase == Phase::Pending
    }
}

/// Why a toggle was refused.  Nothing changed and nothing was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ToggleRejected {
    #[error("sign in to like items")]
    Anonymous,

    #[error("a previous change for this item is still pending")]
    Pending,
}

/// Result of one like/unlike request, sent back to the event loop.
#[derive(Debug)]
pub struct PreferenceOutcome {
    pub view: ViewId,
    pub key: ItemKey,
    /// The value the toggle set optimistically.
    pub desired: bool,
    pub result: Result<(), ClientError>,
}

/// How a pending toggle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Committed { liked: bool },
    RolledBack { liked: bool },
}

impl Settled {
    /// Status-bar text for this result.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Committed { liked: true } => "Liked!",
            Self::Committed { liked: false } => "Like removed",
            // `liked` is the restored value, so the failed attempt was the opposite.
            Self::RolledBack { liked: false } => "Could not like",
            Self::RolledBack { liked: true } => "Could not remove like",
        }
    }
}

pub struct PreferenceMutator<P> {
    view: ViewId,
    states: HashMap<ItemKey, PreferenceState>,
    sink: Arc<P>,
    session: SessionStore,
    tx: mpsc::UnboundedSender<PreferenceOutcome>,
}

impl<P: PreferenceSink> PreferenceMutator<P> {
    pub fn new(
        view: ViewId,
        sink: P,
        session: SessionStore,
        tx: mpsc::UnboundedSender<PreferenceOutcome>,
    ) -> Self {
        Self {
            view,
            states: HashMap::new(),
            sink: Arc::new(sink),
            session,
            tx,
        }
    }

    /// Current state for `key`; untouched items are `Idle` and not liked.
    pub fn state(&self, key: ItemKey) -> PreferenceState {
        self.states.get(&key).copied().unwrap_or_default()
    }

    /// Flip the like flag for `key` and send the change.
    ///
    /// On success returns the optimistic value now visible.  Must be called
    /// from within a tokio runtime.
    pub fn toggle(&mut self, key: ItemKey, category: &str) -> Result<bool, ToggleRejected> {
        if !self.session.is_authenticated() {
            tracing::debug!(view = self.view, key, "toggle rejected: anonymous");
            return Err(ToggleRejected::Anonymous);
        }

        let state = self.states.entry(key).or_default();
        if state.pending() {
            tracing::debug!(view = self.view, key, "toggle rejected: pending");
            return Err(ToggleRejected::Pending);
        }

        let desired = !state.liked;
        state.liked = desired;
        state.phase = Phase::Pending;

        let sink = Arc::clone(&self.sink);
        let tx = self.tx.clone();
        let view = self.view;
        let category = category.to_string();
        tracing::debug!(view, key, desired, %category, "sending preference");

        tokio::spawn(async move {
            let result = sink.set_liked(&category, desired).await;
            let _ = tx.send(PreferenceOutcome {
                view,
                key,
                desired,
                result,
            });
        });
        Ok(desired)
    }

    /// Reconcile a finished request.  Returns `None` for outcomes that do not
    /// belong to this view or to a pending toggle.
    pub fn settle(&mut self, outcome: PreferenceOutcome) -> Option<Settled> {
        if outcome.view != self.view {
            tracing::debug!(view = self.view, stale = outcome.view, "discarding stale preference result");
            return None;
        }
        let state = self.states.get_mut(&outcome.key).filter(|s| s.pending())?;

        match outcome.result {
            Ok(()) => {
                state.phase = Phase::Committed;
                Some(Settled::Committed { liked: state.liked })
            }
            Err(e) => {
                state.liked = !outcome.desired;
                state.phase = Phase::RolledBack;
                tracing::warn!(view = self.view, key = outcome.key, error = %e, "preference change failed, rolled back");
                Some(Settled::RolledBack { liked: state.liked })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
