//! In-memory state of the simulated home, answered in upstream JSON.

use serde_json::json;

use hvacq_domain::id::{HomeId, ZoneId};
use hvacq_domain::remote::{ApiRequest, Endpoint, Method};
use hvacq_domain::value::Presence;

use crate::config::VirtualConfig;

/// A refused request, before headers are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    pub status: u16,
    pub reason: String,
}

impl Refusal {
    fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

/// A manual overlay as the simulated home stores it.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Overlay {
    Heating(f64),
    Off,
}

#[derive(Debug, Clone)]
struct Zone {
    id: ZoneId,
    name: String,
    zone_type: String,
    schedule_setpoint: f64,
    overlay: Option<Overlay>,
    inside_temperature: f64,
    humidity: f64,
    low_battery: bool,
}

impl Zone {
    fn is_heating(&self) -> bool {
        self.zone_type == "HEATING"
    }

    /// `None` while the zone is switched off.
    fn setpoint(&self) -> Option<f64> {
        match self.overlay {
            Some(Overlay::Heating(celsius)) => Some(celsius),
            Some(Overlay::Off) => None,
            None => Some(self.schedule_setpoint),
        }
    }

    fn setting(&self) -> serde_json::Value {
        match self.setpoint() {
            Some(celsius) => json!({
                "type": self.zone_type,
                "power": "ON",
                "temperature": {"celsius": celsius},
            }),
            None => json!({"type": self.zone_type, "power": "OFF", "temperature": null}),
        }
    }

    fn state(&self) -> serde_json::Value {
        let overlay = self.overlay.map(|_| {
            json!({
                "type": "MANUAL",
                "setting": self.setting(),
                "termination": {"type": "MANUAL"},
            })
        });
        if !self.is_heating() {
            return json!({
                "tadoMode": "HOME",
                "setting": self.setting(),
                "overlay": overlay,
                "sensorDataPoints": null,
                "activityDataPoints": null,
                "nextTimeBlock": null,
            });
        }
        let power = match self.setpoint() {
            Some(celsius) if celsius > self.inside_temperature => 40.0,
            _ => 0.0,
        };
        json!({
            "tadoMode": "HOME",
            "setting": self.setting(),
            "overlay": overlay,
            "overlayType": self.overlay.map(|_| "MANUAL"),
            "sensorDataPoints": {
                "insideTemperature": {"celsius": self.inside_temperature},
                "humidity": {"percentage": self.humidity},
            },
            "activityDataPoints": {"heatingPower": {"percentage": power}},
            "nextTimeBlock": null,
        })
    }

    fn info(&self) -> serde_json::Value {
        // hot water controllers are mains powered and report no battery
        let device = if self.is_heating() {
            let battery = if self.low_battery { "LOW" } else { "NORMAL" };
            json!({
                "serialNo": format!("VA{:04}", self.id.get()),
                "batteryState": battery,
            })
        } else {
            json!({"serialNo": format!("BP{:04}", self.id.get())})
        };
        json!({
            "id": self.id.get(),
            "name": self.name,
            "type": self.zone_type,
            "devices": [device],
        })
    }
}

pub struct Account {
    home: HomeId,
    presence: Presence,
    zones: Vec<Zone>,
}

impl Account {
    pub fn new(config: &VirtualConfig) -> Self {
        let zones = config
            .zones
            .iter()
            .zip(1u64..)
            .map(|(zone, id)| Zone {
                id: ZoneId::new(id),
                name: zone.name.clone(),
                zone_type: zone.zone_type.clone(),
                schedule_setpoint: zone.setpoint,
                overlay: None,
                inside_temperature: 19.0,
                humidity: 50.0,
                low_battery: zone.low_battery,
            })
            .collect();
        Self {
            home: HomeId::new(config.home_id),
            presence: Presence::Home,
            zones,
        }
    }

    pub fn home(&self) -> HomeId {
        self.home
    }

    fn zone_mut(&mut self, id: ZoneId) -> Result<&mut Zone, Refusal> {
        self.zones
            .iter_mut()
            .find(|z| z.id == id)
            .ok_or_else(|| Refusal::new(404, format!("zone {id} not found")))
    }

    fn check_home(&self, home: HomeId) -> Result<(), Refusal> {
        if home == self.home {
            Ok(())
        } else {
            Err(Refusal::new(404, format!("home {home} not found")))
        }
    }

    /// Apply `request`, returning the upstream JSON body.
    pub fn handle(&mut self, request: &ApiRequest) -> Result<serde_json::Value, Refusal> {
        let endpoint = request.endpoint;
        match endpoint {
            Endpoint::HomeState { home }
            | Endpoint::ZoneStates { home }
            | Endpoint::Zones { home }
            | Endpoint::PresenceLock { home }
            | Endpoint::ZoneOverlay { home, .. } => self.check_home(home)?,
        }
        match (request.method, endpoint) {
            (Method::Get, Endpoint::HomeState { .. }) => Ok(json!({
                "presence": self.presence,
                "presenceLocked": false,
            })),
            (Method::Get, Endpoint::ZoneStates { .. }) => {
                let states: serde_json::Map<_, _> = self
                    .zones
                    .iter()
                    .map(|z| (z.id.to_string(), z.state()))
                    .collect();
                Ok(json!({ "zoneStates": states }))
            }
            (Method::Get, Endpoint::Zones { .. }) => {
                Ok(self.zones.iter().map(Zone::info).collect())
            }
            (Method::Put, Endpoint::PresenceLock { .. }) => {
                let presence = request
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("homePresence"))
                    .and_then(|p| serde_json::from_value::<Presence>(p.clone()).ok())
                    .ok_or_else(|| Refusal::new(422, "homePresence must be HOME or AWAY"))?;
                self.presence = presence;
                Ok(serde_json::Value::Null)
            }
            (Method::Put, Endpoint::ZoneOverlay { zone, .. }) => {
                let overlay = overlay_from(request.payload.as_ref())?;
                self.zone_mut(zone)?.overlay = Some(overlay);
                Ok(serde_json::Value::Null)
            }
            (Method::Delete, Endpoint::ZoneOverlay { zone, .. }) => {
                self.zone_mut(zone)?.overlay = None;
                Ok(serde_json::Value::Null)
            }
            (method, endpoint) => Err(Refusal::new(
                405,
                format!("{method} not allowed on {}", endpoint.path()),
            )),
        }
    }
}

fn overlay_from(payload: Option<&serde_json::Value>) -> Result<Overlay, Refusal> {
    let setting = payload.and_then(|p| p.get("setting"));
    if setting.and_then(|s| s.get("power")).and_then(serde_json::Value::as_str) == Some("OFF") {
        return Ok(Overlay::Off);
    }
    setting
        .and_then(|s| s.pointer("/temperature/celsius"))
        .and_then(serde_json::Value::as_f64)
        .map(Overlay::Heating)
        .ok_or_else(|| Refusal::new(422, "overlay needs setting.temperature.celsius"))
}
