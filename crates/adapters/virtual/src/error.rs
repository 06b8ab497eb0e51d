//! Virtual adapter error types.

use hvacq_domain::remote::{ApiError, ResponseHeaders};

use crate::account::Refusal;

/// Errors raised while answering a simulated call.
#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    /// The simulated account refused the request.
    #[error("refused with status {status}: {reason}")]
    Refused { status: u16, reason: String },

    /// The upstream body could not be normalized.
    #[error("malformed upstream body")]
    Malformed(#[source] serde_json::Error),
}

impl From<Refusal> for VirtualError {
    fn from(refusal: Refusal) -> Self {
        Self::Refused {
            status: refusal.status,
            reason: refusal.reason,
        }
    }
}

impl VirtualError {
    /// Convert into the remote boundary's [`ApiError`], attaching `headers`.
    pub fn into_api_error(self, headers: ResponseHeaders) -> ApiError {
        match self {
            Self::Refused { status, reason } => ApiError::Rejected {
                status,
                reason,
                headers,
            },
            Self::Malformed(err) => ApiError::Transient {
                reason: format!("malformed upstream body: {err}"),
                headers,
            },
        }
    }
}
