//! Bridge services: the components that sit between the host and the remote.
//!
//! Each service accepts port implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod command_queue;
pub mod command_worker;
pub mod context;
pub mod debounce_gate;
pub mod executor;
pub mod poller;
pub mod quota_tracker;
pub mod readings;
pub mod state_cache;

use hvacq_domain::event::{Event, EventKind};

use crate::ports::EventPublisher;

/// Publish `kind`, logging instead of failing when the bus refuses it.
pub(crate) async fn publish<P: EventPublisher>(publisher: &P, kind: EventKind) {
    if let Err(err) = publisher.publish(Event::new(kind)).await {
        tracing::warn!(error = %err, "failed to publish event");
    }
}
