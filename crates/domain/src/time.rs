//! Timestamps and the duration checks used when validating settings.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ValidationError;

/// UTC timestamp used for submission times, `last_updated`, quota capture times, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Reject zero durations for settings that drive timers.
///
/// # Errors
///
/// Returns [`ValidationError::NonPositiveDuration`] naming the setting when
/// `value` is zero.
pub fn require_positive(name: &'static str, value: Duration) -> Result<Duration, ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::NonPositiveDuration { name });
    }
    Ok(value)
}
