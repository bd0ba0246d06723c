//! Agent readiness handshake.
//!
//! A freshly injected agent announces itself with `agentReady`. The
//! controller registers a waiter for the tab *before* injecting, so an
//! announcement that arrives early is never lost.
//!
//! Each registration carries its own [`ReadyToken`]. Two activations of the
//! same tab may overlap; cancelling one never drops the other's waiter.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::identifiers::TabId;

// ============================================================================
// ReadyToken
// ============================================================================

/// Identifies one registration with the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadyToken {
    tab_id: TabId,
    serial: u64,
}

impl ReadyToken {
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }
}

// ============================================================================
// ReadinessTracker
// ============================================================================

/// Waiters for pending agent announcements, grouped by tab.
#[derive(Default)]
pub struct ReadinessTracker {
    waiters: Mutex<FxHashMap<TabId, Vec<(u64, oneshot::Sender<()>)>>>,
    next_serial: AtomicU64,
}

impl ReadinessTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `tab_id`.
    ///
    /// Earlier waiters for the same tab stay registered.
    #[must_use]
    pub fn register(&self, tab_id: TabId) -> ReadyWaiter {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        let mut waiters = self.waiters.lock();
        let entry = waiters.entry(tab_id).or_default();
        if !entry.is_empty() {
            trace!(%tab_id, pending = entry.len(), "Overlapping readiness waiter");
        }
        entry.push((serial, tx));

        ReadyWaiter {
            token: ReadyToken { tab_id, serial },
            rx,
        }
    }

    /// Resolves every waiter for `tab_id`.
    ///
    /// Returns `false` if nobody was waiting (an agent that loaded on its
    /// own, or an announcement after the timeout).
    pub fn notify(&self, tab_id: TabId) -> bool {
        let waiters = self.waiters.lock().remove(&tab_id).unwrap_or_default();
        if waiters.is_empty() {
            trace!(%tab_id, "Ready announcement with no waiter");
            return false;
        }

        let mut woke = false;
        for (_, tx) in waiters {
            woke |= tx.send(()).is_ok();
        }
        woke
    }

    /// Drops the waiter registered under `token`, if it is still pending.
    ///
    /// Other waiters for the same tab are left alone.
    pub fn cancel(&self, token: ReadyToken) {
        let mut waiters = self.waiters.lock();
        if let Some(entry) = waiters.get_mut(&token.tab_id) {
            entry.retain(|(serial, _)| *serial != token.serial);
            if entry.is_empty() {
                waiters.remove(&token.tab_id);
            }
        }
    }

    /// Returns the number of pending waiters across all tabs.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.waiters.lock().values().map(Vec::len).sum()
    }
}

// ============================================================================
// ReadyWaiter
// ============================================================================

/// Pending readiness for one tab.
pub struct ReadyWaiter {
    token: ReadyToken,
    rx: oneshot::Receiver<()>,
}

impl ReadyWaiter {
    /// Returns the token to cancel this registration with.
    #[inline]
    #[must_use]
    pub fn token(&self) -> ReadyToken {
        self.token
    }

    /// Waits for the announcement, up to `limit`.
    ///
    /// Returns `true` if the agent announced itself in time.
    pub async fn wait(self, limit: Duration) -> bool {
        match timeout(limit, self.rx).await {
            Ok(Ok(())) => {
                debug!(tab_id = %self.token.tab_id, "Agent announced ready");
                true
            }
            Ok(Err(_)) => {
                debug!(tab_id = %self.token.tab_id, "Readiness waiter dropped");
                false
            }
            Err(_) => {
                debug!(
                    tab_id = %self.token.tab_id,
                    timeout_ms = limit.as_millis() as u64,
                    "Agent did not announce ready in time"
                );
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(id: u32) -> TabId {
        TabId::new(id).expect("valid tab id")
    }

    #[tokio::test]
    async fn test_notify_resolves_waiter() {
        let tracker = ReadinessTracker::new();
        let waiter = tracker.register(tab(1));

        assert_eq!(tracker.pending_count(), 1);
        assert!(tracker.notify(tab(1)));
        assert!(waiter.wait(Duration::from_secs(1)).await);
        assert_eq!(tracker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_before_wait_is_kept() {
        let tracker = ReadinessTracker::new();
        let waiter = tracker.register(tab(2));
        tracker.notify(tab(2));

        assert!(waiter.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let tracker = ReadinessTracker::new();
        let waiter = tracker.register(tab(3));

        assert!(!waiter.wait(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_notify_other_tab_does_not_resolve() {
        let tracker = ReadinessTracker::new();
        let waiter = tracker.register(tab(4));

        assert!(!tracker.notify(tab(5)));
        assert!(!waiter.wait(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_cancel_drops_waiter() {
        let tracker = ReadinessTracker::new();
        let waiter = tracker.register(tab(6));
        tracker.cancel(waiter.token());

        assert_eq!(tracker.pending_count(), 0);
        assert!(!waiter.wait(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_overlapping_registrations_are_independent() {
        let tracker = ReadinessTracker::new();
        let first = tracker.register(tab(7));
        let second = tracker.register(tab(7));
        assert_ne!(first.token(), second.token());
        assert_eq!(tracker.pending_count(), 2);

        // The first activation gives up; the second must keep waiting.
        tracker.cancel(first.token());
        assert_eq!(tracker.pending_count(), 1);
        assert!(!first.wait(Duration::from_millis(5)).await);

        assert!(tracker.notify(tab(7)));
        assert!(second.wait(Duration::from_secs(1)).await);
        assert_eq!(tracker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_wakes_all_waiters_for_tab() {
        let tracker = ReadinessTracker::new();
        let first = tracker.register(tab(8));
        let second = tracker.register(tab(8));

        assert!(tracker.notify(tab(8)));
        assert!(first.wait(Duration::from_secs(1)).await);
        assert!(second.wait(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_stale_cancel_is_ignored() {
        let tracker = ReadinessTracker::new();
        let first = tracker.register(tab(9));
        let token = first.token();
        tracker.notify(tab(9));
        assert!(first.wait(Duration::from_secs(1)).await);

        let second = tracker.register(tab(9));
        tracker.cancel(token);
        assert_eq!(tracker.pending_count(), 1);

        tracker.notify(tab(9));
        assert!(second.wait(Duration::from_secs(1)).await);
    }
}
