//! Debounce gate: latest-wins collapsing of rapid intents.
//!
//! Each command key has at most one pending intent and one armed timer. A
//! newer intent for the same key aborts the timer and re-arms it, so only the
//! final value of a burst ever reaches the [`CommandQueue`]. Keys debounce
//! independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use hvacq_domain::command::{Command, CommandKey, Intent};

use super::command_queue::CommandQueue;

struct Pending {
    ticket: u64,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct Slots {
    next_ticket: u64,
    pending: HashMap<CommandKey, Pending>,
}

struct Inner {
    grace: Duration,
    queue: Arc<CommandQueue>,
    slots: Mutex<Slots>,
    pending_count: watch::Sender<usize>,
}

/// Cloneable handle; clones share the same pending set.
#[derive(Clone)]
pub struct DebounceGate {
    inner: Arc<Inner>,
}

impl DebounceGate {
    #[must_use]
    pub fn new(grace: Duration, queue: Arc<CommandQueue>) -> Self {
        let (pending_count, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                grace,
                queue,
                slots: Mutex::new(Slots::default()),
                pending_count,
            }),
        }
    }

    /// Record `intent` as the pending value for its key and (re)arm the timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, intent: Intent) {
        let key = intent.key();
        let mut slots = self.inner.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.next_ticket += 1;
        let ticket = slots.next_ticket;

        let inner = Arc::clone(&self.inner);
        let timer_key = key.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.grace).await;
            inner.fire(&timer_key, ticket, intent);
        });

        if let Some(previous) = slots.pending.insert(key.clone(), Pending { ticket, timer }) {
            previous.timer.abort();
            tracing::debug!(%key, "pending intent superseded");
        } else {
            tracing::debug!(%key, grace_ms = self.inner.grace.as_millis(), "debounce armed");
        }
        self.inner.pending_count.send_replace(slots.pending.len());
    }

    /// Number of keys with an armed timer.
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.inner.pending_count.borrow()
    }

    /// Resolve once no intent is pending.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.pending_count.subscribe();
        // the sender lives in `inner`, so the channel cannot close here
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    /// Abort every armed timer. Pending intents are discarded.
    pub fn cancel_all(&self) {
        let mut slots = self.inner.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, pending) in slots.pending.drain() {
            pending.timer.abort();
        }
        self.inner.pending_count.send_replace(0);
    }
}

impl Inner {
    fn fire(&self, key: &CommandKey, ticket: u64, intent: Intent) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // a newer submit may have replaced us after the sleep completed
        if slots.pending.get(key).is_none_or(|p| p.ticket != ticket) {
            return;
        }
        slots.pending.remove(key);
        let outcome = self.queue.enqueue(Command::from_intent(intent));
        tracing::debug!(%key, ?outcome, "debounced command enqueued");
        self.pending_count.send_replace(slots.pending.len());
    }
}
