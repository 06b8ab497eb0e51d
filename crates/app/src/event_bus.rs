//! Fan-out of bridge events to every live host subscription.
//!
//! Subscribers that fall more than `capacity` events behind skip ahead:
//! their next receive reports how many events they lost, then resumes with
//! the oldest event still buffered. Nothing is kept for hosts that have not
//! subscribed yet.

use std::future::Future;

use tokio::sync::broadcast;

use hvacq_domain::error::HvacqError;
use hvacq_domain::event::Event;

use crate::ports::EventPublisher;

pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// A bus buffering up to `capacity` events per subscriber. A zero
    /// capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Start receiving events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HvacqError>> + Send {
        let kind = event.kind.name();
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(kind, receivers, "event published"),
            Err(_) => tracing::trace!(kind, "event dropped, no subscribers"),
        }
        async { Ok(()) }
    }
}
