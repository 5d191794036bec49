//! "Approaching the end of the list" detection.
//!
//! The terminal has no viewport intersection to observe, so proximity is
//! measured in items: the selection is *inside the margin* when at most
//! `lookahead` items remain below it.  [`ProximityObserver::observe`] is
//! called whenever the selection or the list length changes and emits a
//! [`ProximitySignal`] on its channel:
//!
//! * once per list length while inside the margin, so each appended item
//!   moves the boundary and can trigger the next fetch;
//! * never twice for the same length, so a failed fetch does not loop;
//! * again after the selection leaves the margin and comes back, or after
//!   [`ProximityObserver::rearm`] when a fetch was dropped.
//!
//! Whoever receives the signal decides whether to fetch.  The paginator's
//! in-flight guard turns bursts into a single request.

use tokio::sync::mpsc;

use crate::paginator::ViewId;

/// Default number of items kept ready below the selection.
pub const DEFAULT_LOOKAHEAD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximitySignal {
    pub view: ViewId,
}

pub struct ProximityObserver {
    view: ViewId,
    lookahead: usize,
    /// List length at which we last fired while inside the margin.
    fired_at: Option<usize>,
    tx: Option<mpsc::UnboundedSender<ProximitySignal>>,
}

impl ProximityObserver {
    pub fn new(view: ViewId, lookahead: usize, tx: mpsc::UnboundedSender<ProximitySignal>) -> Self {
        Self {
            view,
            lookahead,
            fired_at: None,
            tx: Some(tx),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.tx.is_some()
    }

    /// Report the current selection.  Returns `true` if a signal was sent.
    pub fn observe(&mut self, selected: Option<usize>, len: usize) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };

        let position = selected.unwrap_or(0);
        let remaining = len.saturating_sub(position + 1);
        if remaining > self.lookahead {
            self.fired_at = None;
            return false;
        }
        if self.fired_at == Some(len) {
            return false;
        }

        self.fired_at = Some(len);
        tracing::trace!(view = self.view, position, len, "approaching end of list");
        tx.send(ProximitySignal { view: self.view }).is_ok()
    }

    /// Forget the last crossing, so the next observation inside the margin
    /// fires even at the same list length.
    pub fn rearm(&mut self) {
        self.fired_at = None;
    }

    /// Stop emitting.  Called when the feed view is torn down.
    pub fn disconnect(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!(view = self.view, "proximity observer disconnected");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn observer(lookahead: usize) -> (ProximityObserver, mpsc::UnboundedReceiver<ProximitySignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ProximityObserver::new(3, lookahead, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ProximitySignal>) -> usize {
        let mut n = 0;
        while rx.try_recv().is_ok() {
            n += 1;
        }
        n
    }

    #[test]
    fn empty_list_is_inside_the_margin() {
        let (mut obs, mut rx) = observer(2);
        assert!(obs.observe(None, 0));
        assert_eq!(rx.try_recv().unwrap(), ProximitySignal { view: 3 });
    }

    #[test]
    fn fires_once_per_length() {
        let (mut obs, mut rx) = observer(2);
        assert!(obs.observe(Some(0), 1));
        assert!(!obs.observe(Some(0), 1));
        assert!(!obs.observe(Some(0), 1));
        assert_eq!(drain(&mut rx), 1);
    }

    #[test]
    fn appended_item_moves_the_boundary() {
        let (mut obs, mut rx) = observer(2);
        assert!(obs.observe(Some(0), 1));
        assert!(obs.observe(Some(0), 2));
        assert!(obs.observe(Some(0), 3));
        // Three items below the selection now: outside the margin.
        assert!(!obs.observe(Some(0), 4));
        assert_eq!(drain(&mut rx), 3);
    }

    #[test]
    fn far_from_end_does_not_fire() {
        let (mut obs, mut rx) = observer(2);
        assert!(!obs.observe(Some(0), 10));
        assert!(!obs.observe(Some(6), 10));
        assert!(obs.observe(Some(7), 10));
        assert_eq!(drain(&mut rx), 1);
    }

    #[test]
    fn leaving_the_margin_rearms() {
        let (mut obs, mut rx) = observer(1);
        assert!(obs.observe(Some(4), 5));
        assert!(!obs.observe(Some(4), 5), "same crossing");

        assert!(!obs.observe(Some(1), 5), "left the margin");
        assert!(obs.observe(Some(4), 5), "new crossing at the same length");
        assert_eq!(drain(&mut rx), 2);
    }

    #[test]
    fn rearm_allows_a_new_signal_at_the_same_length() {
        let (mut obs, mut rx) = observer(2);
        assert!(obs.observe(Some(0), 1));
        assert!(!obs.observe(Some(0), 1));

        obs.rearm();
        assert!(obs.observe(Some(0), 1));
        assert!(!obs.observe(Some(0), 1), "fires once after rearm");
        assert_eq!(drain(&mut rx), 2);
    }

    #[test]
    fn zero_lookahead_needs_last_item() {
        let (mut obs, _rx) = observer(0);
        assert!(!obs.observe(Some(3), 5));
        assert!(obs.observe(Some(4), 5));
    }

    #[test]
    fn disconnected_observer_is_silent() {
        let (mut obs, mut rx) = observer(2);
        obs.disconnect();
        assert!(!obs.is_connected());
        assert!(!obs.observe(None, 0));
        assert!(rx.try_recv().is_err());
    }
}
