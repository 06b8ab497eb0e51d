//! Remote API port: the rate-limited HVAC service and its session.
//!
//! The client performs the network call and hands back a typed response or
//! a typed failure. Both carry the response headers, so callers can read
//! rate-limit metadata off every outcome without intercepting the client.

use std::future::Future;
use std::sync::Arc;

use hvacq_domain::error::HvacqError;
use hvacq_domain::remote::{ApiError, ApiRequest, ApiResponse};

/// Client for the remote HVAC API.
///
/// Implementations must normalize nullable upstream fields into the typed
/// [`ResponseBody`](hvacq_domain::remote::ResponseBody) before returning.
pub trait RemoteApi: Send + Sync {
    /// Perform one remote call.
    fn call(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

impl<T: RemoteApi> RemoteApi for Arc<T> {
    fn call(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send {
        (**self).call(request)
    }
}

/// External collaborator that re-establishes an expired session.
///
/// The bridge never runs the authentication flow itself; it asks for a
/// refresh and retries once the returned future resolves successfully.
pub trait SessionRefresher: Send + Sync {
    fn refresh_session(&self) -> impl Future<Output = Result<(), HvacqError>> + Send;
}

impl<T: SessionRefresher> SessionRefresher for Arc<T> {
    fn refresh_session(&self) -> impl Future<Output = Result<(), HvacqError>> + Send {
        (**self).refresh_session()
    }
}
