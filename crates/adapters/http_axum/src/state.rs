//! Shared application state for axum handlers.

use std::sync::Arc;

use hvacq_app::bridge::Bridge;
use hvacq_app::event_bus::InProcessEventBus;
use hvacq_app::ports::{RemoteApi, SessionRefresher};

/// The bridge type served over HTTP: events go to an in-process bus so the
/// SSE endpoint can subscribe to them.
pub type HttpBridge<A, S> = Bridge<A, S, Arc<InProcessEventBus>>;

/// Application state shared across all axum handlers.
///
/// Generic over the remote API and session refresher to avoid dynamic
/// dispatch. `Clone` is implemented manually so only the `Arc` wrappers
/// are cloned.
pub struct AppState<A, S> {
    pub bridge: Arc<HttpBridge<A, S>>,
    /// Bus the bridge publishes to.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<A, S> Clone for AppState<A, S> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<A, S> AppState<A, S>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    /// `event_bus` must be the publisher `bridge` was built with.
    pub fn new(bridge: Arc<HttpBridge<A, S>>, event_bus: Arc<InProcessEventBus>) -> Self {
        Self { bridge, event_bus }
    }
}
