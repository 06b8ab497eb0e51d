//! Events published to hosts when bridge state changes.

use serde::{Deserialize, Serialize};

use crate::attribute::CachedAttribute;
use crate::id::EventId;
use crate::quota::QuotaSnapshot;
use crate::target::{Target, Track};
use crate::time::{Timestamp, now};
use crate::value::AttributeValue;

/// A timestamped notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Stamp `kind` with a fresh id and the current time.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: EventId::new(),
            timestamp: now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A cached attribute was written with a new value.
    AttributeChanged {
        attribute: CachedAttribute,
        previous: Option<AttributeValue>,
    },
    /// An intent was accepted and its value is shown optimistically.
    OptimisticSet {
        target: Target,
        value: AttributeValue,
    },
    /// A command was dropped without reaching the remote state.
    CommandFailed {
        target: Target,
        value: AttributeValue,
        reason: String,
        attempts: u32,
    },
    /// A batch was executed and its confirmation read applied.
    BatchConfirmed { targets: Vec<Target> },
    QuotaUpdated { snapshot: QuotaSnapshot },
    PollFailed { track: Track, reason: String },
}

impl EventKind {
    /// The serialized `type` tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AttributeChanged { .. } => "attribute_changed",
            Self::OptimisticSet { .. } => "optimistic_set",
            Self::CommandFailed { .. } => "command_failed",
            Self::BatchConfirmed { .. } => "batch_confirmed",
            Self::QuotaUpdated { .. } => "quota_updated",
            Self::PollFailed { .. } => "poll_failed",
        }
    }
}
