//! Cached attribute values and where they came from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::target::{Target, Track};
use crate::time::Timestamp;
use crate::value::AttributeValue;

/// Which path last wrote an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    FastTrack,
    SlowTrack,
    /// The targeted re-read that follows a batch.
    Confirmation,
}

impl From<Track> for Source {
    fn from(track: Track) -> Self {
        match track {
            Track::Fast => Self::FastTrack,
            Track::Slow => Self::SlowTrack,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FastTrack => f.write_str("fast_track"),
            Self::SlowTrack => f.write_str("slow_track"),
            Self::Confirmation => f.write_str("confirmation"),
        }
    }
}

/// Last value observed from the remote for one target.
///
/// Only ever built from a remote reading. An attribute that was never
/// observed has no entry at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAttribute {
    pub target: Target,
    pub value: AttributeValue,
    pub last_updated: Timestamp,
    pub source: Source,
}
