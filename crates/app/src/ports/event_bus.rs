//! Event bus port: publish/subscribe for bridge events.

use std::future::Future;

use hvacq_domain::error::HvacqError;
use hvacq_domain::event::Event;

/// Publishes bridge events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HvacqError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HvacqError>> + Send {
        (**self).publish(event)
    }
}
