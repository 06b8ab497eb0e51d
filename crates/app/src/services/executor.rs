//! Shared execution point: the single-flight gate for every remote call.
//!
//! Commands, confirmations, scheduled polls and manual polls all acquire the
//! same [`tokio::sync::Mutex`]. Its queue is FIFO, so contention resolves in
//! arrival order. Holding an [`ExecutorGuard`] grants exclusive use of the
//! remote API; a batch keeps its guard from the first command through the
//! confirmation read.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use hvacq_domain::event::EventKind;
use hvacq_domain::remote::{ApiError, ApiRequest, ApiResponse, ResponseHeaders};

use super::publish;
use super::quota_tracker::QuotaTracker;
use crate::ports::{EventPublisher, RemoteApi, SessionRefresher};

pub struct SharedExecutor<A, S, P> {
    api: A,
    sessions: S,
    publisher: Arc<P>,
    quota: Arc<QuotaTracker>,
    call_timeout: Duration,
    gate: Mutex<()>,
}

/// Exclusive access to the remote API.
pub struct ExecutorGuard<'a, A, S, P> {
    executor: &'a SharedExecutor<A, S, P>,
    _permit: MutexGuard<'a, ()>,
}

impl<A, S, P> SharedExecutor<A, S, P>
where
    A: RemoteApi,
    S: SessionRefresher,
    P: EventPublisher + Send + Sync,
{
    pub fn new(
        api: A,
        sessions: S,
        publisher: Arc<P>,
        quota: Arc<QuotaTracker>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            api,
            sessions,
            publisher,
            quota,
            call_timeout,
            gate: Mutex::new(()),
        }
    }

    /// Wait for exclusive access.
    pub async fn acquire(&self) -> ExecutorGuard<'_, A, S, P> {
        ExecutorGuard {
            executor: self,
            _permit: self.gate.lock().await,
        }
    }

    async fn observe(&self, headers: &ResponseHeaders) {
        if let Some(snapshot) = self.quota.observe(headers) {
            publish(&*self.publisher, EventKind::QuotaUpdated { snapshot }).await;
        }
    }

    async fn attempt(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        tracing::debug!(%request, "remote call");
        let result = tokio::time::timeout(self.call_timeout, self.api.call(request.clone()))
            .await
            .unwrap_or_else(|_| Err(ApiError::timeout(self.call_timeout)));
        let headers = match &result {
            Ok(response) => &response.headers,
            Err(err) => err.headers(),
        };
        self.observe(headers).await;
        result
    }
}

impl<A, S, P> ExecutorGuard<'_, A, S, P>
where
    A: RemoteApi,
    S: SessionRefresher,
    P: EventPublisher + Send + Sync,
{
    /// Perform one call under this guard.
    ///
    /// An expired session is refreshed and the call retried exactly once.
    /// Retrying transient failures is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the last attempt. When the refresh itself
    /// fails, the original `AuthExpired` error is returned.
    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let executor = self.executor;
        match executor.attempt(request).await {
            Err(err @ ApiError::AuthExpired { .. }) => {
                if let Err(refresh) = executor.sessions.refresh_session().await {
                    tracing::warn!(%request, error = %refresh, "session refresh failed");
                    return Err(err);
                }
                tracing::info!(%request, "session refreshed, retrying call");
                executor.attempt(request).await
            }
            other => other,
        }
    }
}
