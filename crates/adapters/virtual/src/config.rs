//! Simulated account configuration.

use serde::Deserialize;

/// One heating zone of the simulated home.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub name: String,
    /// Upstream zone type, e.g. `HEATING` or `HOT_WATER`.
    pub zone_type: String,
    /// Schedule setpoint in °C.
    pub setpoint: f64,
    /// Devices whose battery is reported low.
    pub low_battery: bool,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            name: "Zone".to_string(),
            zone_type: "HEATING".to_string(),
            setpoint: 20.0,
            low_battery: false,
        }
    }
}

/// Configuration for the simulated account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VirtualConfig {
    /// Identifier of the single home.
    pub home_id: u64,
    /// Zones in id order, numbered from 1.
    pub zones: Vec<ZoneConfig>,
    /// Calls allowed per day before the account answers `429`.
    pub daily_limit: u32,
    /// Simulated network latency per call, in milliseconds.
    pub latency_ms: u64,
}

impl Default for VirtualConfig {
    fn default() -> Self {
        Self {
            home_id: 1,
            zones: vec![
                ZoneConfig {
                    name: "Living Room".to_string(),
                    setpoint: 21.0,
                    ..ZoneConfig::default()
                },
                ZoneConfig {
                    name: "Bedroom".to_string(),
                    setpoint: 18.0,
                    ..ZoneConfig::default()
                },
                ZoneConfig {
                    name: "Hot Water".to_string(),
                    zone_type: "HOT_WATER".to_string(),
                    setpoint: 55.0,
                    low_battery: false,
                },
            ],
            daily_limit: 100,
            latency_ms: 150,
        }
    }
}
