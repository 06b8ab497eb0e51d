//! # hvacq-adapter-virtual
//!
//! A simulated HVAC account for demos and end-to-end tests.
//!
//! [`VirtualHome`] implements both [`RemoteApi`] and [`SessionRefresher`].
//! It keeps one home with configurable zones in memory, answers every call
//! with upstream-shaped JSON normalized through [`wire`], and attaches
//! `RateLimit-Policy` / `RateLimit` headers to every outcome.
//!
//! | Behaviour | How |
//! |-----------|-----|
//! | Daily quota | Each call consumes one; at zero the account answers `429` |
//! | Faults | [`VirtualHome::inject`] queues a failure for the next call |
//! | Session expiry | [`VirtualHome::expire_session`] makes calls fail with `AuthExpired` until refreshed |
//! | Introspection | call log and in-flight high-water mark |
//!
//! ## Dependency rule
//!
//! Depends on `hvacq-app` (port traits) and `hvacq-domain` only.

mod account;
pub mod config;
pub mod error;
pub mod wire;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use hvacq_app::ports::{RemoteApi, SessionRefresher};
use hvacq_domain::error::HvacqError;
use hvacq_domain::id::HomeId;
use hvacq_domain::quota::{POLICY_HEADER, REMAINING_HEADER};
use hvacq_domain::remote::{ApiError, ApiRequest, ApiResponse, ResponseHeaders};

use account::Account;
pub use config::{VirtualConfig, ZoneConfig};
use error::VirtualError;

/// A failure to inject into the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Network-level failure.
    Transient,
    /// The remote refuses the call with this status.
    Rejected(u16),
    AuthExpired,
}

impl Fault {
    fn into_error(self, headers: ResponseHeaders) -> ApiError {
        match self {
            Self::Transient => ApiError::Transient {
                reason: "injected connection reset".to_string(),
                headers,
            },
            Self::Rejected(status) => ApiError::Rejected {
                status,
                reason: "injected rejection".to_string(),
                headers,
            },
            Self::AuthExpired => ApiError::AuthExpired { headers },
        }
    }
}

struct Quota {
    limit: u32,
    remaining: u32,
}

impl Quota {
    fn headers(&self) -> ResponseHeaders {
        ResponseHeaders::from_pairs([
            (
                POLICY_HEADER,
                format!("\"perday\";q={};w=86400", self.limit),
            ),
            (REMAINING_HEADER, format!("\"perday\";r={}", self.remaining)),
        ])
    }
}

/// Simulated remote account.
pub struct VirtualHome {
    home: HomeId,
    latency: Duration,
    account: Mutex<Account>,
    quota: Mutex<Quota>,
    faults: Mutex<VecDeque<Fault>>,
    calls: Mutex<Vec<ApiRequest>>,
    session_valid: AtomicBool,
    refreshes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl VirtualHome {
    #[must_use]
    pub fn new(config: &VirtualConfig) -> Self {
        let account = Account::new(config);
        Self {
            home: account.home(),
            latency: Duration::from_millis(config.latency_ms),
            account: Mutex::new(account),
            quota: Mutex::new(Quota {
                limit: config.daily_limit,
                remaining: config.daily_limit,
            }),
            faults: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            session_valid: AtomicBool::new(true),
            refreshes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn home(&self) -> HomeId {
        self.home
    }

    /// Fail an upcoming call with `fault`. Faults are consumed in order.
    pub fn inject(&self, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(fault);
    }

    /// Invalidate the session until the next [`SessionRefresher::refresh_session`].
    pub fn expire_session(&self) {
        self.session_valid.store(false, Ordering::SeqCst);
    }

    /// Restore the full daily allowance.
    pub fn reset_quota(&self) {
        let mut quota = self.quota.lock().unwrap_or_else(PoisonError::into_inner);
        quota.remaining = quota.limit;
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.quota
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remaining
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Highest number of calls ever observed running at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Charge one call against the quota. Returns the headers to send and
    /// whether the call may proceed.
    fn charge(&self) -> (ResponseHeaders, bool) {
        let mut quota = self.quota.lock().unwrap_or_else(PoisonError::into_inner);
        if quota.remaining == 0 {
            return (quota.headers(), false);
        }
        quota.remaining -= 1;
        (quota.headers(), true)
    }

    fn answer(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let (headers, allowed) = self.charge();
        if !allowed {
            return Err(ApiError::Rejected {
                status: 429,
                reason: "daily quota exhausted".to_string(),
                headers,
            });
        }
        let fault = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(fault) = fault {
            tracing::debug!(%request, ?fault, "injecting fault");
            return Err(fault.into_error(headers));
        }
        if !self.session_valid.load(Ordering::SeqCst) {
            return Err(ApiError::AuthExpired { headers });
        }

        let raw = self
            .account
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle(request)
            .map_err(VirtualError::from);
        let body = raw.and_then(|raw| {
            wire::normalize(request.method, request.endpoint, raw).map_err(VirtualError::Malformed)
        });
        match body {
            Ok(body) => Ok(ApiResponse::ok(body, headers)),
            Err(err) => Err(err.into_api_error(headers)),
        }
    }
}

impl RemoteApi for VirtualHome {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = self.answer(&request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl SessionRefresher for VirtualHome {
    async fn refresh_session(&self) -> Result<(), HvacqError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.session_valid.store(true, Ordering::SeqCst);
        tracing::info!("virtual session refreshed");
        Ok(())
    }
}
