//! In-memory fakes shared by the service tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use hvacq_domain::error::HvacqError;
use hvacq_domain::event::{Event, EventKind};
use hvacq_domain::id::{HomeId, ZoneId};
use hvacq_domain::remote::{
    ApiError, ApiRequest, ApiResponse, DeviceInfo, Endpoint, HomeState, Method, ResponseBody,
    ResponseHeaders, ZoneInfo, ZoneState,
};
use hvacq_domain::value::{BatteryState, Presence};

use crate::ports::{EventPublisher, RemoteApi, SessionRefresher};

pub const HOME: HomeId = HomeId::new(1);
pub const DAILY_LIMIT: u32 = 1000;

struct Script {
    calls: Vec<ApiRequest>,
    failures: HashMap<Endpoint, VecDeque<ApiError>>,
    overlays: BTreeMap<ZoneId, bool>,
    presence: Presence,
    remaining: u32,
}

/// Remote API double with a call log and an in-flight high-water mark.
pub struct ScriptedApi {
    latency: Duration,
    quota_headers: AtomicBool,
    script: Mutex<Script>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    /// An account with zones `1..=zones`, all following their schedule.
    pub fn new(zones: u64) -> Self {
        Self {
            latency: Duration::ZERO,
            quota_headers: AtomicBool::new(true),
            script: Mutex::new(Script {
                calls: Vec::new(),
                failures: HashMap::new(),
                overlays: (1..=zones).map(|id| (ZoneId::new(id), false)).collect(),
                presence: Presence::Home,
                remaining: DAILY_LIMIT,
            }),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call to `endpoint` with `error`. Queued failures are
    /// consumed in order.
    pub fn fail(&self, endpoint: Endpoint, error: ApiError) {
        self.script()
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(error);
    }

    pub fn without_quota_headers(&self) {
        self.quota_headers.store(false, Ordering::SeqCst);
    }

    pub fn set_remaining(&self, remaining: u32) {
        self.script().remaining = remaining;
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.script().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<ApiRequest> {
        std::mem::take(&mut self.script().calls)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn headers(&self, remaining: u32) -> ResponseHeaders {
        if !self.quota_headers.load(Ordering::SeqCst) {
            return ResponseHeaders::default();
        }
        ResponseHeaders::from_pairs([
            (
                "RateLimit-Policy",
                format!("\"perday\";q={DAILY_LIMIT};w=86400"),
            ),
            ("RateLimit", format!("\"perday\";r={remaining}")),
        ])
    }

    fn respond(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut script = self.script();
        script.calls.push(request.clone());
        script.remaining = script.remaining.saturating_sub(1);
        let headers = self.headers(script.remaining);

        if let Some(error) = script
            .failures
            .get_mut(&request.endpoint)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        let body = match (request.method, request.endpoint) {
            (Method::Get, Endpoint::HomeState { home }) => ResponseBody::HomeState(HomeState {
                home,
                presence: script.presence,
            }),
            (Method::Get, Endpoint::ZoneStates { .. }) => ResponseBody::ZoneStates(
                script
                    .overlays
                    .iter()
                    .map(|(zone, overlay)| {
                        let state = ZoneState {
                            overlay_active: *overlay,
                            power: None,
                            target_temperature: Some(20.0),
                            inside_temperature: Some(19.5),
                            humidity: Some(45.0),
                            heating_power: Some(12.0),
                        };
                        (*zone, state)
                    })
                    .collect(),
            ),
            (Method::Get, Endpoint::Zones { .. }) => ResponseBody::Zones(
                script
                    .overlays
                    .keys()
                    .map(|zone| ZoneInfo {
                        id: *zone,
                        name: format!("Zone {zone}"),
                        zone_type: "HEATING".to_string(),
                        devices: vec![DeviceInfo {
                            serial: format!("VA{zone:04}"),
                            battery: Some(BatteryState::Normal),
                        }],
                    })
                    .collect(),
            ),
            (Method::Put, Endpoint::PresenceLock { .. }) => {
                let presence = request
                    .payload
                    .as_ref()
                    .and_then(|p| serde_json::from_value(p["homePresence"].clone()).ok());
                if let Some(presence) = presence {
                    script.presence = presence;
                }
                ResponseBody::Empty
            }
            (Method::Put, Endpoint::ZoneOverlay { zone, .. }) => {
                script.overlays.insert(zone, true);
                ResponseBody::Empty
            }
            (Method::Delete, Endpoint::ZoneOverlay { zone, .. }) => {
                script.overlays.insert(zone, false);
                ResponseBody::Empty
            }
            _ => {
                return Err(ApiError::Rejected {
                    status: 405,
                    reason: format!("unsupported {request}"),
                    headers,
                });
            }
        };
        Ok(ApiResponse::ok(body, headers))
    }
}

impl RemoteApi for ScriptedApi {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        let result = self.respond(&request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Session refresher that counts calls and can be told to fail.
#[derive(Default)]
pub struct RecordingRefresher {
    refreshes: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingRefresher {
    pub fn failing() -> Self {
        let refresher = Self::default();
        refresher.fail.store(true, Ordering::SeqCst);
        refresher
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl SessionRefresher for RecordingRefresher {
    async fn refresh_session(&self) -> Result<(), HvacqError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HvacqError::Remote(ApiError::Rejected {
                status: 401,
                reason: "refresh token revoked".to_string(),
                headers: ResponseHeaders::default(),
            }));
        }
        Ok(())
    }
}

/// Publisher that keeps every event.
#[derive(Default)]
pub struct SpyPublisher {
    events: Mutex<Vec<Event>>,
}

impl SpyPublisher {
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.kind.clone())
            .collect()
    }
}

impl EventPublisher for SpyPublisher {
    async fn publish(&self, event: Event) -> Result<(), HvacqError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

pub fn transient(reason: &str) -> ApiError {
    ApiError::Transient {
        reason: reason.to_string(),
        headers: ResponseHeaders::default(),
    }
}

pub fn rejected(status: u16) -> ApiError {
    ApiError::Rejected {
        status,
        reason: "invalid state transition".to_string(),
        headers: ResponseHeaders::default(),
    }
}

pub fn auth_expired() -> ApiError {
    ApiError::AuthExpired {
        headers: ResponseHeaders::default(),
    }
}

pub fn overlay(zone: u64) -> Endpoint {
    Endpoint::ZoneOverlay {
        home: HOME,
        zone: ZoneId::new(zone),
    }
}

pub type TestContext =
    crate::services::context::BridgeContext<Arc<ScriptedApi>, Arc<RecordingRefresher>, SpyPublisher>;

/// A context over `api` with a 10 s call timeout and 30 s optimistic grace.
pub fn context(api: &Arc<ScriptedApi>) -> (Arc<TestContext>, Arc<SpyPublisher>) {
    let publisher = Arc::new(SpyPublisher::default());
    let context = crate::services::context::BridgeContext::new(
        HOME,
        Arc::clone(api),
        Arc::new(RecordingRefresher::default()),
        Arc::clone(&publisher),
        Duration::from_secs(10),
        Duration::from_secs(30),
    );
    (Arc::new(context), publisher)
}
