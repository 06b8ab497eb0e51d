//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HvacqError`]
//! via `#[from]`. Remote failures keep their own taxonomy in
//! [`ApiError`](crate::remote::ApiError).

use crate::remote::ApiError;
use crate::target::AttributeKind;

/// Top-level error returned across port and service boundaries.
#[derive(Debug, thiserror::Error)]
pub enum HvacqError {
    /// Input rejected before any remote call was attempted.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A lookup found nothing.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The remote API call failed.
    #[error("remote API error")]
    Remote(#[from] ApiError),

    /// The bridge has been shut down and no longer accepts work.
    #[error("bridge is shut down")]
    Closed,
}

/// Reasons an intent or a setting is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{kind} is read-only")]
    ReadOnly { kind: AttributeKind },

    #[error("{kind} does not apply to a {scope} target")]
    ScopeMismatch {
        kind: AttributeKind,
        scope: &'static str,
    },

    #[error("value {value} is not valid for {kind}")]
    InvalidValue { kind: AttributeKind, value: String },

    #[error("temperature {0} °C is outside 5.0..=25.0 °C")]
    TemperatureOutOfRange(f64),

    #[error("{name} must be a positive duration")]
    NonPositiveDuration { name: &'static str },
}

/// A requested resource does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
