//! Attribute values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether anybody is at home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Presence {
    Home,
    Away,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("HOME"),
            Self::Away => f.write_str("AWAY"),
        }
    }
}

/// Battery state reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatteryState {
    Normal,
    Low,
}

/// A typed attribute value.
///
/// Serialized untagged so API consumers see plain JSON scalars. `Presence`
/// and `Battery` are tried before `Text`, so `"HOME"` and `"LOW"` deserialize
/// to their enum variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Presence(Presence),
    Battery(BatteryState),
    Text(String),
}

impl AttributeValue {
    /// Numeric view of the value, if it has one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_presence(&self) -> Option<Presence> {
        match self {
            Self::Presence(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => v.fmt(f),
            Self::Int(v) => v.fmt(f),
            Self::Float(v) => v.fmt(f),
            Self::Presence(v) => v.fmt(f),
            Self::Battery(BatteryState::Normal) => f.write_str("NORMAL"),
            Self::Battery(BatteryState::Low) => f.write_str("LOW"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Presence> for AttributeValue {
    fn from(v: Presence) -> Self {
        Self::Presence(v)
    }
}

impl From<BatteryState> for AttributeValue {
    fn from(v: BatteryState) -> Self {
        Self::Battery(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}
