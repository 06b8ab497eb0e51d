//! Targets: what an intent controls and what a cached attribute describes.
//!
//! A [`Target`] is a resource in the account tree (a home or one of its
//! zones) combined with an [`AttributeKind`]. Every attribute kind belongs to
//! exactly one scope and one polling [`Track`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{HomeId, ZoneId};

/// The resource an attribute hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum Scope {
    Home(HomeId),
    Zone(ZoneId),
}

impl Scope {
    /// Lowercase scope name, as used in paths and error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Home(_) => "home",
            Self::Zone(_) => "zone",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home(id) => write!(f, "home/{id}"),
            Self::Zone(id) => write!(f, "zone/{id}"),
        }
    }
}

/// Polling cadence responsible for refreshing an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Presence and HVAC operating state.
    Fast,
    /// Battery and static metadata.
    Slow,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::Slow => f.write_str("slow"),
        }
    }
}

/// Every attribute the bridge tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Home/away state of the household.
    Presence,
    /// `true` while a zone follows its schedule, `false` under a manual overlay.
    AutoMode,
    /// Setpoint of the zone in °C.
    TargetTemperature,
    /// `false` while the zone's heating is switched off.
    Power,
    InsideTemperature,
    Humidity,
    HeatingPower,
    /// Worst battery state across the zone's devices.
    Battery,
    ZoneName,
    ZoneType,
}

impl AttributeKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Presence,
        Self::AutoMode,
        Self::TargetTemperature,
        Self::Power,
        Self::InsideTemperature,
        Self::Humidity,
        Self::HeatingPower,
        Self::Battery,
        Self::ZoneName,
        Self::ZoneType,
    ];

    /// Snake-case name used in paths, logs and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Presence => "presence",
            Self::AutoMode => "auto_mode",
            Self::TargetTemperature => "target_temperature",
            Self::Power => "power",
            Self::InsideTemperature => "inside_temperature",
            Self::Humidity => "humidity",
            Self::HeatingPower => "heating_power",
            Self::Battery => "battery",
            Self::ZoneName => "zone_name",
            Self::ZoneType => "zone_type",
        }
    }

    /// Whether users may submit intents for this kind.
    #[must_use]
    pub fn is_writable(self) -> bool {
        matches!(
            self,
            Self::Presence | Self::AutoMode | Self::TargetTemperature | Self::Power
        )
    }

    /// Whether the kind is attached to a home (as opposed to a zone).
    #[must_use]
    pub fn is_home_scoped(self) -> bool {
        matches!(self, Self::Presence)
    }

    /// The polling track that refreshes this kind.
    #[must_use]
    pub fn track(self) -> Track {
        match self {
            Self::Battery | Self::ZoneName | Self::ZoneType => Track::Slow,
            _ => Track::Fast,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no [`AttributeKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attribute kind {0:?}")]
pub struct UnknownAttributeKind(pub String);

impl FromStr for AttributeKind {
    type Err = UnknownAttributeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownAttributeKind(s.to_string()))
    }
}

/// A home or zone attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Target {
    pub scope: Scope,
    pub kind: AttributeKind,
}

impl Target {
    /// Target a home-level attribute.
    #[must_use]
    pub fn home(home: HomeId, kind: AttributeKind) -> Self {
        Self {
            scope: Scope::Home(home),
            kind,
        }
    }

    /// Target a zone-level attribute.
    #[must_use]
    pub fn zone(zone: ZoneId, kind: AttributeKind) -> Self {
        Self {
            scope: Scope::Zone(zone),
            kind,
        }
    }

    /// The zone this target belongs to, if zone-scoped.
    #[must_use]
    pub fn zone_id(&self) -> Option<ZoneId> {
        match self.scope {
            Scope::Zone(id) => Some(id),
            Scope::Home(_) => None,
        }
    }

    /// Check that the kind belongs to the scope.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ScopeMismatch`] for e.g. a zone presence target.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let home_scope = matches!(self.scope, Scope::Home(_));
        if home_scope != self.kind.is_home_scoped() {
            return Err(ValidationError::ScopeMismatch {
                kind: self.kind,
                scope: self.scope.name(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.kind)
    }
}
