//! Tunables for the bridge, validated up front.
//!
//! Invalid values fail construction; nothing is clamped.

use std::time::Duration;

use hvacq_domain::error::ValidationError;
use hvacq_domain::time::require_positive;

pub const DEFAULT_FAST_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_SLOW_INTERVAL: Duration = Duration::from_secs(24 * 3600);

/// Intervals of the two polling tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    fast: Duration,
    slow: Duration,
}

impl PollSchedule {
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveDuration`] if either interval is zero.
    pub fn new(fast: Duration, slow: Duration) -> Result<Self, ValidationError> {
        Ok(Self {
            fast: require_positive("fast_interval", fast)?,
            slow: require_positive("slow_interval", slow)?,
        })
    }

    #[must_use]
    pub fn fast(&self) -> Duration {
        self.fast
    }

    #[must_use]
    pub fn slow(&self) -> Duration {
        self.slow
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST_INTERVAL,
            slow: DEFAULT_SLOW_INTERVAL,
        }
    }
}

/// Bounded retry with exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Grace window of the debounce gate.
    pub debounce: Duration,
    /// Upper bound for a single remote call.
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    /// How long the worker waits for pending intents before draining.
    pub batch_settle_max: Duration,
    /// Lifetime of an unconfirmed optimistic value.
    pub optimistic_grace: Duration,
    pub schedule: PollSchedule,
    /// Skip scheduled polls while fewer calls remain. `0` disables.
    pub throttle_threshold: u32,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(5),
            call_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            batch_settle_max: Duration::from_secs(5),
            optimistic_grace: Duration::from_secs(30),
            schedule: PollSchedule::default(),
            throttle_threshold: 0,
        }
    }
}

impl BridgeSettings {
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveDuration`] naming the first
    /// timer setting that is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("debounce", self.debounce)?;
        require_positive("call_timeout", self.call_timeout)?;
        PollSchedule::new(self.schedule.fast, self.schedule.slow)?;
        Ok(())
    }
}
