//! Intents, commands, batches and the confirmation read derived from them.
//!
//! An [`Intent`] is what a user asked for. Once the debounce window elapses
//! it becomes a [`Command`], which is immutable and knows how to turn itself
//! into the [`ApiRequest`] that applies it. Commands drained together form a
//! [`Batch`]; every executed batch yields one [`ConfirmationRequest`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ValidationError;
use crate::id::{HomeId, ZoneId};
use crate::remote::{ApiRequest, Endpoint};
use crate::target::{AttributeKind, Scope, Target};
use crate::time::Timestamp;
use crate::value::{AttributeValue, Presence};

pub const MIN_TEMPERATURE: f64 = 5.0;
pub const MAX_TEMPERATURE: f64 = 25.0;
/// Setpoint used when a zone leaves its schedule and no setpoint is known.
pub const DEFAULT_OVERLAY_TEMPERATURE: f64 = 25.0;

/// Idempotency key: identifies the remote resource a command writes.
///
/// `auto_mode`, `power` and `target_temperature` of a zone all write the
/// zone's overlay, so they share a key and supersede each other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandKey(String);

impl CommandKey {
    #[must_use]
    pub fn for_target(target: &Target) -> Self {
        match (target.scope, target.kind) {
            (
                Scope::Zone(zone),
                AttributeKind::AutoMode | AttributeKind::TargetTemperature | AttributeKind::Power,
            ) => {
                Self(format!("zone/{zone}/overlay"))
            }
            _ => Self(target.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What executing a command does upstream, decided once when the intent is
/// validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandAction {
    SetPresence { home: HomeId, presence: Presence },
    /// Drop the zone's overlay so it follows its schedule again.
    ResumeSchedule { zone: ZoneId },
    /// Manual overlay at the zone's cached setpoint.
    HoldSetpoint { zone: ZoneId },
    SetTemperature { zone: ZoneId, celsius: f64 },
    PowerOff { zone: ZoneId },
}

impl CommandAction {
    fn resolve(
        target: Target,
        value: AttributeValue,
    ) -> Result<(AttributeValue, Self), ValidationError> {
        let invalid = |value: &AttributeValue| ValidationError::InvalidValue {
            kind: target.kind,
            value: value.to_string(),
        };
        let action = match (target.scope, target.kind, &value) {
            (Scope::Home(home), AttributeKind::Presence, AttributeValue::Presence(presence)) => {
                Self::SetPresence {
                    home,
                    presence: *presence,
                }
            }
            (Scope::Zone(zone), AttributeKind::AutoMode, AttributeValue::Bool(true)) => {
                Self::ResumeSchedule { zone }
            }
            (Scope::Zone(zone), AttributeKind::AutoMode, AttributeValue::Bool(false))
            | (Scope::Zone(zone), AttributeKind::Power, AttributeValue::Bool(true)) => {
                Self::HoldSetpoint { zone }
            }
            (Scope::Zone(zone), AttributeKind::Power, AttributeValue::Bool(false)) => {
                Self::PowerOff { zone }
            }
            (Scope::Zone(zone), AttributeKind::TargetTemperature, value) => {
                let celsius = value.as_f64().ok_or_else(|| invalid(value))?;
                if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&celsius) {
                    return Err(ValidationError::TemperatureOutOfRange(celsius));
                }
                return Ok((
                    AttributeValue::Float(celsius),
                    Self::SetTemperature { zone, celsius },
                ));
            }
            (_, _, value) => return Err(invalid(value)),
        };
        Ok((value, action))
    }

    /// The remote call that performs this action.
    ///
    /// `current_setpoint` is the zone's cached target temperature, used when
    /// switching a zone from its schedule to a manual overlay.
    #[must_use]
    pub fn request(self, home: HomeId, current_setpoint: Option<f64>) -> ApiRequest {
        match self {
            Self::SetPresence { home, presence } => ApiRequest::put(
                Endpoint::PresenceLock { home },
                json!({ "homePresence": presence }),
            ),
            Self::ResumeSchedule { zone } => {
                ApiRequest::delete(Endpoint::ZoneOverlay { home, zone })
            }
            Self::HoldSetpoint { zone } => ApiRequest::put(
                Endpoint::ZoneOverlay { home, zone },
                manual_overlay(current_setpoint.unwrap_or(DEFAULT_OVERLAY_TEMPERATURE)),
            ),
            Self::SetTemperature { zone, celsius } => {
                ApiRequest::put(Endpoint::ZoneOverlay { home, zone }, manual_overlay(celsius))
            }
            Self::PowerOff { zone } => ApiRequest::put(
                Endpoint::ZoneOverlay { home, zone },
                json!({
                    "setting": { "type": "HEATING", "power": "OFF" },
                    "termination": { "typeSkillBasedApp": "MANUAL" },
                }),
            ),
        }
    }
}

/// A validated user request to change one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    target: Target,
    value: AttributeValue,
    action: CommandAction,
    submitted_at: Timestamp,
}

impl Intent {
    /// Validate and build an intent.
    ///
    /// Integer temperatures are widened to floats.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the kind is read-only, does not
    /// belong to the target's scope, or the value has the wrong type or range.
    pub fn new(
        target: Target,
        value: AttributeValue,
        submitted_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if !target.kind.is_writable() {
            return Err(ValidationError::ReadOnly { kind: target.kind });
        }
        target.validate()?;
        let (value, action) = CommandAction::resolve(target, value)?;
        Ok(Self {
            target,
            value,
            action,
            submitted_at,
        })
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    #[must_use]
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    #[must_use]
    pub fn action(&self) -> CommandAction {
        self.action
    }

    #[must_use]
    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    #[must_use]
    pub fn key(&self) -> CommandKey {
        CommandKey::for_target(&self.target)
    }
}

/// A debounced intent, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    target: Target,
    value: AttributeValue,
    action: CommandAction,
    key: CommandKey,
    submitted_at: Timestamp,
}

impl Command {
    #[must_use]
    pub fn from_intent(intent: Intent) -> Self {
        let key = intent.key();
        Self {
            target: intent.target,
            value: intent.value,
            action: intent.action,
            key,
            submitted_at: intent.submitted_at,
        }
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    #[must_use]
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    #[must_use]
    pub fn action(&self) -> CommandAction {
        self.action
    }

    #[must_use]
    pub fn key(&self) -> &CommandKey {
        &self.key
    }

    /// When the user submitted the intent this command came from.
    #[must_use]
    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    #[must_use]
    pub fn request(&self, home: HomeId, current_setpoint: Option<f64>) -> ApiRequest {
        self.action.request(home, current_setpoint)
    }
}

fn manual_overlay(celsius: f64) -> serde_json::Value {
    json!({
        "setting": {
            "type": "HEATING",
            "power": "ON",
            "temperature": { "celsius": celsius },
        },
        "termination": { "typeSkillBasedApp": "MANUAL" },
    })
}

/// Commands drained together, in enqueue order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch(Vec<Command>);

impl Batch {
    #[must_use]
    pub fn new(commands: Vec<Command>) -> Self {
        Self(commands)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn targets(&self) -> Vec<Target> {
        self.0.iter().map(Command::target).collect()
    }
}

impl IntoIterator for Batch {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The single targeted re-read that follows a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    targets: BTreeSet<Target>,
}

impl ConfirmationRequest {
    /// Returns `None` for an empty target set.
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = Target>) -> Option<Self> {
        let targets: BTreeSet<_> = targets.into_iter().collect();
        (!targets.is_empty()).then_some(Self { targets })
    }

    #[must_use]
    pub fn targets(&self) -> &BTreeSet<Target> {
        &self.targets
    }

    /// Reads that cover every target: at most one home-state read and at
    /// most one zone-states read, whatever the number of targets.
    #[must_use]
    pub fn reads(&self, home: HomeId) -> Vec<ApiRequest> {
        let mut reads = Vec::with_capacity(2);
        if self.targets.iter().any(|t| matches!(t.scope, Scope::Home(_))) {
            reads.push(ApiRequest::get(Endpoint::HomeState { home }));
        }
        if self.targets.iter().any(|t| matches!(t.scope, Scope::Zone(_))) {
            reads.push(ApiRequest::get(Endpoint::ZoneStates { home }));
        }
        reads
    }

    /// Whether a reading for `target` settles part of this confirmation.
    #[must_use]
    pub fn covers(&self, target: &Target) -> bool {
        let key = CommandKey::for_target(target);
        self.targets
            .iter()
            .any(|t| CommandKey::for_target(t) == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Method;
    use crate::time::now;

    const HOME: HomeId = HomeId::new(1);

    fn zone(id: u64, kind: AttributeKind) -> Target {
        Target::zone(ZoneId::new(id), kind)
    }

    fn command(target: Target, value: AttributeValue) -> Command {
        Command::from_intent(Intent::new(target, value, now()).unwrap())
    }

    #[test]
    fn should_share_overlay_key_between_auto_mode_and_temperature() {
        assert_eq!(
            CommandKey::for_target(&zone(3, AttributeKind::AutoMode)),
            CommandKey::for_target(&zone(3, AttributeKind::TargetTemperature))
        );
        assert_eq!(
            CommandKey::for_target(&zone(3, AttributeKind::AutoMode)).as_str(),
            "zone/3/overlay"
        );
    }

    #[test]
    fn should_key_presence_by_its_target_path() {
        let key = CommandKey::for_target(&Target::home(HOME, AttributeKind::Presence));
        assert_eq!(key.as_str(), "home/1/presence");
    }

    #[test]
    fn should_reject_intent_for_read_only_kind() {
        let err = Intent::new(zone(1, AttributeKind::Humidity), AttributeValue::Float(40.0), now())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ReadOnly {
                kind: AttributeKind::Humidity
            }
        );
    }

    #[test]
    fn should_reject_intent_with_wrong_value_type() {
        let err = Intent::new(
            zone(1, AttributeKind::AutoMode),
            AttributeValue::Text("yes".to_string()),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn should_reject_temperature_outside_range() {
        let err = Intent::new(
            zone(1, AttributeKind::TargetTemperature),
            AttributeValue::Float(30.0),
            now(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::TemperatureOutOfRange(30.0));
    }

    #[test]
    fn should_widen_integer_temperature() {
        let intent = Intent::new(
            zone(1, AttributeKind::TargetTemperature),
            AttributeValue::Int(21),
            now(),
        )
        .unwrap();
        assert_eq!(intent.value(), &AttributeValue::Float(21.0));
        assert_eq!(
            intent.action(),
            CommandAction::SetTemperature {
                zone: ZoneId::new(1),
                celsius: 21.0
            }
        );
    }

    #[test]
    fn should_translate_auto_mode_on_into_overlay_delete() {
        let req = command(zone(4, AttributeKind::AutoMode), AttributeValue::Bool(true)).request(HOME, None);
        assert_eq!(req.method, Method::Delete);
        assert_eq!(req.endpoint.path(), "homes/1/zones/4/overlay");
        assert!(req.payload.is_none());
    }

    #[test]
    fn should_use_cached_setpoint_when_leaving_schedule() {
        let req = command(zone(4, AttributeKind::AutoMode), AttributeValue::Bool(false))
            .request(HOME, Some(19.5));
        assert_eq!(req.method, Method::Put);
        let payload = req.payload.unwrap();
        assert_eq!(payload["setting"]["temperature"]["celsius"], 19.5);
        assert_eq!(payload["termination"]["typeSkillBasedApp"], "MANUAL");
    }

    #[test]
    fn should_fall_back_to_default_setpoint_when_unknown() {
        let req = command(zone(4, AttributeKind::AutoMode), AttributeValue::Bool(false)).request(HOME, None);
        assert_eq!(
            req.payload.unwrap()["setting"]["temperature"]["celsius"],
            DEFAULT_OVERLAY_TEMPERATURE
        );
    }

    #[test]
    fn should_switch_zone_off_with_power_off_overlay() {
        let req = command(zone(4, AttributeKind::Power), AttributeValue::Bool(false))
            .request(HOME, Some(19.5));
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.endpoint.path(), "homes/1/zones/4/overlay");
        let payload = req.payload.unwrap();
        assert_eq!(payload["setting"]["power"], "OFF");
        assert!(payload["setting"].get("temperature").is_none());
    }

    #[test]
    fn should_switch_zone_on_at_cached_setpoint() {
        let intent = Intent::new(zone(4, AttributeKind::Power), AttributeValue::Bool(true), now())
            .unwrap();
        assert_eq!(
            intent.action(),
            CommandAction::HoldSetpoint {
                zone: ZoneId::new(4)
            }
        );
        let payload = Command::from_intent(intent)
            .request(HOME, Some(18.0))
            .payload
            .unwrap();
        assert_eq!(payload["setting"]["power"], "ON");
        assert_eq!(payload["setting"]["temperature"]["celsius"], 18.0);
    }

    #[test]
    fn should_reject_every_value_type_that_has_no_action() {
        let mismatched = [
            (Target::home(HOME, AttributeKind::Presence), AttributeValue::Bool(true)),
            (zone(1, AttributeKind::AutoMode), AttributeValue::Float(21.0)),
            (zone(1, AttributeKind::Power), AttributeValue::Presence(Presence::Home)),
            (zone(1, AttributeKind::TargetTemperature), AttributeValue::Bool(true)),
        ];
        for (target, value) in mismatched {
            assert!(
                matches!(
                    Intent::new(target, value, now()),
                    Err(ValidationError::InvalidValue { .. })
                ),
                "{target} accepted a mismatched value"
            );
        }
    }

    #[test]
    fn should_keep_submission_time_on_command() {
        let submitted_at = now();
        let intent = Intent::new(
            zone(2, AttributeKind::AutoMode),
            AttributeValue::Bool(true),
            submitted_at,
        )
        .unwrap();
        assert_eq!(Command::from_intent(intent).submitted_at(), submitted_at);
    }

    #[test]
    fn should_translate_presence_into_presence_lock() {
        let req = command(
            Target::home(HOME, AttributeKind::Presence),
            AttributeValue::Presence(Presence::Away),
        )
        .request(HOME, None);
        assert_eq!(req.endpoint.path(), "homes/1/presenceLock");
        assert_eq!(req.payload.unwrap(), json!({"homePresence": "AWAY"}));
    }

    #[test]
    fn should_issue_one_zone_read_for_many_zone_targets() {
        let confirmation =
            ConfirmationRequest::new((1..=5).map(|id| zone(id, AttributeKind::AutoMode))).unwrap();
        let reads = confirmation.reads(HOME);
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].endpoint, Endpoint::ZoneStates { home: HOME });
        assert_eq!(confirmation.targets().len(), 5);
    }

    #[test]
    fn should_read_home_and_zones_for_mixed_targets() {
        let confirmation = ConfirmationRequest::new([
            Target::home(HOME, AttributeKind::Presence),
            zone(2, AttributeKind::TargetTemperature),
        ])
        .unwrap();
        assert_eq!(confirmation.reads(HOME).len(), 2);
    }

    #[test]
    fn should_not_build_confirmation_for_no_targets() {
        assert!(ConfirmationRequest::new(Vec::new()).is_none());
    }

    #[test]
    fn should_cover_sibling_overlay_attribute_of_confirmed_zone() {
        let confirmation = ConfirmationRequest::new([zone(2, AttributeKind::AutoMode)]).unwrap();
        assert!(confirmation.covers(&zone(2, AttributeKind::AutoMode)));
        assert!(confirmation.covers(&zone(2, AttributeKind::TargetTemperature)));
        assert!(!confirmation.covers(&zone(2, AttributeKind::Humidity)));
        assert!(!confirmation.covers(&zone(3, AttributeKind::AutoMode)));
    }
}
