//! Quota tracker: passive reader of rate-limit headers.
//!
//! The shared executor feeds it the headers of every response and every
//! failure. It never makes a call of its own.

use tokio::sync::watch;

use hvacq_domain::quota::QuotaSnapshot;
use hvacq_domain::remote::ResponseHeaders;
use hvacq_domain::time::now;

/// Holds the latest [`QuotaSnapshot`], or `None` until one is observed.
pub struct QuotaTracker {
    sender: watch::Sender<Option<QuotaSnapshot>>,
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaTracker {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Replace the snapshot if `headers` carry both quota fields.
    ///
    /// Returns the new snapshot, or `None` when the headers were missing or
    /// malformed and the previous snapshot was kept.
    pub fn observe(&self, headers: &ResponseHeaders) -> Option<QuotaSnapshot> {
        let snapshot = QuotaSnapshot::from_headers(headers, now())?;
        self.sender.send_replace(Some(snapshot));
        tracing::trace!(
            limit = snapshot.daily_limit,
            remaining = snapshot.remaining,
            "quota observed"
        );
        Some(snapshot)
    }

    #[must_use]
    pub fn current(&self) -> Option<QuotaSnapshot> {
        *self.sender.borrow()
    }

    /// Watch snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<QuotaSnapshot>> {
        self.sender.subscribe()
    }
}
