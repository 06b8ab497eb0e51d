//! State cache: last-known value of every tracked attribute.
//!
//! Written only by the poller and by the worker's confirmation step, both of
//! which run under the shared executor's gate. Readers never wait on the
//! gate: each entry is replaced atomically under a short-lived lock.
//!
//! A separate optimistic layer holds values shown to the user between an
//! intent and its confirmation. It never leaks into the cached entries.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use hvacq_domain::attribute::{CachedAttribute, Source};
use hvacq_domain::id::ZoneId;
use hvacq_domain::target::Target;
use hvacq_domain::time::Timestamp;
use hvacq_domain::value::AttributeValue;

use super::readings::Reading;

/// A fresh write that changed (or first set) an attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub attribute: CachedAttribute,
    pub previous: Option<AttributeValue>,
}

/// The value a host should display for a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedValue {
    pub value: AttributeValue,
    /// `true` while the value comes from an unconfirmed intent.
    pub optimistic: bool,
}

struct Optimistic {
    value: AttributeValue,
    submitted_at: Timestamp,
    expires_at: Instant,
}

pub struct StateCache {
    entries: RwLock<BTreeMap<Target, CachedAttribute>>,
    optimistic: RwLock<HashMap<Target, Optimistic>>,
    grace: Duration,
}

impl StateCache {
    /// Create an empty cache whose optimistic values live for `grace`.
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            optimistic: RwLock::new(HashMap::new()),
            grace,
        }
    }

    #[must_use]
    pub fn get(&self, target: &Target) -> Option<CachedAttribute> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .cloned()
    }

    /// Every cached attribute, ordered by target.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CachedAttribute> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Zones for which at least one attribute has been observed.
    #[must_use]
    pub fn known_zones(&self) -> Vec<ZoneId> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let zones: BTreeSet<_> = entries.keys().filter_map(Target::zone_id).collect();
        zones.into_iter().collect()
    }

    /// Replace the entry for `target`.
    ///
    /// Returns the change when the value is new or differs from the previous
    /// one; a rewrite of an identical value only refreshes `last_updated`.
    pub fn record(
        &self,
        target: Target,
        value: AttributeValue,
        source: Source,
        at: Timestamp,
    ) -> Option<AttributeChange> {
        let attribute = CachedAttribute {
            target,
            value,
            last_updated: at,
            source,
        };
        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target, attribute.clone())
            .map(|old| old.value);
        tracing::trace!(attribute = %target, %source, "attribute cached");
        if previous.as_ref() == Some(&attribute.value) {
            return None;
        }
        Some(AttributeChange {
            attribute,
            previous,
        })
    }

    /// Record every reading, returning the changes that resulted.
    pub fn apply(&self, readings: Vec<Reading>, source: Source, at: Timestamp) -> Vec<AttributeChange> {
        readings
            .into_iter()
            .filter_map(|(target, value)| self.record(target, value, source, at))
            .collect()
    }

    /// Show `value` for `target` until confirmed or the grace period ends.
    ///
    /// `submitted_at` is when the user asked for `value`; only a
    /// confirmation of a command at least that recent clears it.
    pub fn set_optimistic(&self, target: Target, value: AttributeValue, submitted_at: Timestamp) {
        let now = Instant::now();
        let mut optimistic = self.optimistic.write().unwrap_or_else(PoisonError::into_inner);
        optimistic.retain(|_, entry| entry.expires_at > now);
        optimistic.insert(
            target,
            Optimistic {
                value,
                submitted_at,
                expires_at: now + self.grace,
            },
        );
    }

    /// Drop optimistic values for which `confirmed(target, submitted_at)`
    /// holds.
    pub fn clear_optimistic(&self, confirmed: impl Fn(&Target, Timestamp) -> bool) {
        self.optimistic
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|target, entry| !confirmed(target, entry.submitted_at));
    }

    /// A live optimistic value if any, else the cached value.
    #[must_use]
    pub fn resolve(&self, target: &Target) -> Option<ResolvedValue> {
        let optimistic = self
            .optimistic
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| ResolvedValue {
                value: entry.value.clone(),
                optimistic: true,
            });
        optimistic.or_else(|| {
            self.get(target).map(|attribute| ResolvedValue {
                value: attribute.value,
                optimistic: false,
            })
        })
    }
}
