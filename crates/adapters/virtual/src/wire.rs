//! Upstream JSON shapes and their normalization into domain bodies.
//!
//! The upstream API leaves many fields `null`: `overlay` while a zone follows
//! its schedule, `sensorDataPoints` on zones without a sensor, `nextTimeBlock`
//! at the end of a schedule, `batteryState` on mains-powered devices. Every
//! such field is optional here, so a missing value becomes an absent reading
//! instead of a parse failure.

use std::collections::BTreeMap;

use serde::Deserialize;

use hvacq_domain::id::{HomeId, ZoneId};
use hvacq_domain::remote::{
    DeviceInfo, Endpoint, HomeState, Method, ResponseBody, ZoneInfo, ZoneState,
};
use hvacq_domain::value::{BatteryState, Presence};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHomeState {
    presence: Presence,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawZoneStates {
    zone_states: BTreeMap<ZoneId, RawZoneState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawZoneState {
    #[serde(default)]
    setting: Option<RawSetting>,
    #[serde(default)]
    overlay: Option<serde_json::Value>,
    #[serde(default)]
    sensor_data_points: Option<RawSensorData>,
    #[serde(default)]
    activity_data_points: Option<RawActivity>,
}

#[derive(Debug, Deserialize)]
struct RawSetting {
    #[serde(default)]
    power: Option<String>,
    #[serde(default)]
    temperature: Option<RawTemperature>,
}

#[derive(Debug, Deserialize)]
struct RawTemperature {
    celsius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPercentage {
    percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSensorData {
    #[serde(default)]
    inside_temperature: Option<RawTemperature>,
    #[serde(default)]
    humidity: Option<RawPercentage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActivity {
    #[serde(default)]
    heating_power: Option<RawPercentage>,
}

#[derive(Debug, Deserialize)]
struct RawZone {
    id: ZoneId,
    name: String,
    #[serde(rename = "type")]
    zone_type: String,
    #[serde(default)]
    devices: Vec<RawDevice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevice {
    serial_no: String,
    #[serde(default)]
    battery_state: Option<BatteryState>,
}

impl From<RawZoneState> for ZoneState {
    fn from(raw: RawZoneState) -> Self {
        let power = raw
            .setting
            .as_ref()
            .and_then(|s| s.power.as_deref())
            .map(|p| p != "OFF");
        let target_temperature = raw
            .setting
            .filter(|s| s.power.as_deref() != Some("OFF"))
            .and_then(|s| s.temperature)
            .and_then(|t| t.celsius);
        let sensors = raw.sensor_data_points;
        let inside_temperature = sensors
            .as_ref()
            .and_then(|s| s.inside_temperature.as_ref())
            .and_then(|t| t.celsius);
        let humidity = sensors
            .as_ref()
            .and_then(|s| s.humidity.as_ref())
            .and_then(|h| h.percentage);
        let heating_power = raw
            .activity_data_points
            .and_then(|a| a.heating_power)
            .and_then(|p| p.percentage);
        Self {
            overlay_active: raw.overlay.is_some_and(|o| !o.is_null()),
            power,
            target_temperature,
            inside_temperature,
            humidity,
            heating_power,
        }
    }
}

impl From<RawZone> for ZoneInfo {
    fn from(raw: RawZone) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            zone_type: raw.zone_type,
            devices: raw
                .devices
                .into_iter()
                .map(|d| DeviceInfo {
                    serial: d.serial_no,
                    battery: d.battery_state,
                })
                .collect(),
        }
    }
}

/// Turn an upstream body into the typed body for `endpoint`.
///
/// # Errors
///
/// Returns the deserialization error when a required field is missing or
/// has the wrong type.
pub fn normalize(
    method: Method,
    endpoint: Endpoint,
    raw: serde_json::Value,
) -> Result<ResponseBody, serde_json::Error> {
    if method != Method::Get {
        return Ok(ResponseBody::Empty);
    }
    Ok(match endpoint {
        Endpoint::HomeState { home } => {
            let raw: RawHomeState = serde_json::from_value(raw)?;
            ResponseBody::HomeState(home_state(home, raw))
        }
        Endpoint::ZoneStates { .. } => {
            let raw: RawZoneStates = serde_json::from_value(raw)?;
            ResponseBody::ZoneStates(
                raw.zone_states
                    .into_iter()
                    .map(|(zone, state)| (zone, state.into()))
                    .collect(),
            )
        }
        Endpoint::Zones { .. } => {
            let raw: Vec<RawZone> = serde_json::from_value(raw)?;
            ResponseBody::Zones(raw.into_iter().map(Into::into).collect())
        }
        Endpoint::PresenceLock { .. } | Endpoint::ZoneOverlay { .. } => ResponseBody::Empty,
    })
}

fn home_state(home: HomeId, raw: RawHomeState) -> HomeState {
    HomeState {
        home,
        presence: raw.presence,
    }
}
