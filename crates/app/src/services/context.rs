//! State shared by the worker, the poller and the [`Bridge`](crate::bridge::Bridge).

use std::sync::Arc;
use std::time::Duration;

use hvacq_domain::attribute::Source;
use hvacq_domain::event::EventKind;
use hvacq_domain::id::HomeId;
use hvacq_domain::remote::ResponseBody;
use hvacq_domain::time::now;

use super::executor::SharedExecutor;
use super::publish;
use super::quota_tracker::QuotaTracker;
use super::readings::readings;
use super::state_cache::{AttributeChange, StateCache};
use crate::ports::{EventPublisher, RemoteApi, SessionRefresher};

/// Owned per-bridge state: nothing here is global, and nothing outlives the
/// bridge that built it.
pub struct BridgeContext<A, S, P> {
    pub home: HomeId,
    pub executor: SharedExecutor<A, S, P>,
    pub cache: StateCache,
    pub quota: Arc<QuotaTracker>,
    pub publisher: Arc<P>,
}

impl<A, S, P> BridgeContext<A, S, P>
where
    A: RemoteApi,
    S: SessionRefresher,
    P: EventPublisher + Send + Sync,
{
    pub fn new(
        home: HomeId,
        api: A,
        sessions: S,
        publisher: Arc<P>,
        call_timeout: Duration,
        optimistic_grace: Duration,
    ) -> Self {
        let quota = Arc::new(QuotaTracker::new());
        let executor = SharedExecutor::new(
            api,
            sessions,
            Arc::clone(&publisher),
            Arc::clone(&quota),
            call_timeout,
        );
        Self {
            home,
            executor,
            cache: StateCache::new(optimistic_grace),
            quota,
            publisher,
        }
    }

    pub async fn publish(&self, kind: EventKind) {
        publish(&*self.publisher, kind).await;
    }

    /// Write every reading of `body` into the cache and announce the changes.
    ///
    /// Returns the number of attributes whose value changed.
    pub async fn apply(&self, body: &ResponseBody, source: Source) -> usize {
        let changes = self.cache.apply(readings(self.home, body), source, now());
        let changed = changes.len();
        for AttributeChange {
            attribute,
            previous,
        } in changes
        {
            self.publish(EventKind::AttributeChanged {
                attribute,
                previous,
            })
            .await;
        }
        changed
    }
}
