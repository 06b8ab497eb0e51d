//! Types exchanged with the remote HVAC API boundary.
//!
//! The core talks to the remote service in terms of an [`ApiRequest`] and
//! gets back either an [`ApiResponse`] or an [`ApiError`]. Both carry the
//! response headers so rate-limit metadata is visible on every outcome.
//! Bodies arrive already normalized into typed [`ResponseBody`] variants;
//! tolerating nullable upstream fields is the adapter's job.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::id::{HomeId, ZoneId};
use crate::value::{BatteryState, Presence};

/// HTTP-like verb of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Put => f.write_str("PUT"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// Remote resource addressed by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "endpoint", rename_all = "snake_case")]
pub enum Endpoint {
    HomeState { home: HomeId },
    ZoneStates { home: HomeId },
    Zones { home: HomeId },
    PresenceLock { home: HomeId },
    ZoneOverlay { home: HomeId, zone: ZoneId },
}

impl Endpoint {
    /// Path relative to the API root.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::HomeState { home } => format!("homes/{home}/state"),
            Self::ZoneStates { home } => format!("homes/{home}/zoneStates"),
            Self::Zones { home } => format!("homes/{home}/zones"),
            Self::PresenceLock { home } => format!("homes/{home}/presenceLock"),
            Self::ZoneOverlay { home, zone } => format!("homes/{home}/zones/{zone}/overlay"),
        }
    }
}

/// A single outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn get(endpoint: Endpoint) -> Self {
        Self {
            method: Method::Get,
            endpoint,
            payload: None,
        }
    }

    #[must_use]
    pub fn put(endpoint: Endpoint, payload: serde_json::Value) -> Self {
        Self {
            method: Method::Put,
            endpoint,
            payload: Some(payload),
        }
    }

    #[must_use]
    pub fn delete(endpoint: Endpoint) -> Self {
        Self {
            method: Method::Delete,
            endpoint,
            payload: None,
        }
    }

    /// Whether the call only reads remote state.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.method == Method::Get
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint.path())
    }
}

/// Response header map with case-insensitive names.
///
/// Names are lowercased on insertion; values are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeaders(BTreeMap<String, String>);

impl ResponseHeaders {
    /// Build from name/value pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut headers = Self::default();
        for (name, value) in pairs {
            headers.insert(name.as_ref(), value);
        }
        headers
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Home-level state as returned by `homes/{id}/state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeState {
    pub home: HomeId,
    pub presence: Presence,
}

/// Operating state of one zone as returned by `homes/{id}/zoneStates`.
///
/// Every reading is optional: devices without a sensor, or zones whose
/// heating is switched off, leave fields absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneState {
    pub overlay_active: bool,
    /// `setting.power`; `None` when the remote omits the setting.
    pub power: Option<bool>,
    pub target_temperature: Option<f64>,
    pub inside_temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub heating_power: Option<f64>,
}

/// A physical device installed in a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub serial: String,
    pub battery: Option<BatteryState>,
}

/// Zone metadata as returned by `homes/{id}/zones`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub id: ZoneId,
    pub name: String,
    pub zone_type: String,
    pub devices: Vec<DeviceInfo>,
}

/// Typed body of a successful call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "body", content = "data", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Writes answer with no useful payload.
    Empty,
    HomeState(HomeState),
    ZoneStates(BTreeMap<ZoneId, ZoneState>),
    Zones(Vec<ZoneInfo>),
}

/// A successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
    pub headers: ResponseHeaders,
}

impl ApiResponse {
    /// A `200` response carrying `body`.
    #[must_use]
    pub fn ok(body: ResponseBody, headers: ResponseHeaders) -> Self {
        Self {
            status: 200,
            body,
            headers,
        }
    }
}

/// Typed failure of a remote call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Network failure or timeout. Safe to retry.
    #[error("transient failure: {reason}")]
    Transient {
        reason: String,
        headers: ResponseHeaders,
    },

    /// The remote declared the operation invalid.
    #[error("rejected with status {status}: {reason}")]
    Rejected {
        status: u16,
        reason: String,
        headers: ResponseHeaders,
    },

    /// The session must be refreshed before the call can succeed.
    #[error("session expired")]
    AuthExpired { headers: ResponseHeaders },
}

impl ApiError {
    /// A transient failure raised locally when a call exceeds its deadline.
    #[must_use]
    pub fn timeout(limit: Duration) -> Self {
        Self::Transient {
            reason: format!("call timed out after {}ms", limit.as_millis()),
            headers: ResponseHeaders::default(),
        }
    }

    /// Headers observed alongside the failure (possibly empty).
    #[must_use]
    pub fn headers(&self) -> &ResponseHeaders {
        match self {
            Self::Transient { headers, .. }
            | Self::Rejected { headers, .. }
            | Self::AuthExpired { headers } => headers,
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
