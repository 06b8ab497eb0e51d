//! Daily call quota as reported by the remote service.
//!
//! The remote announces its allowance through two structured headers:
//!
//! ```text
//! RateLimit-Policy: "perday";q=20000;w=86400
//! RateLimit: "perday";r=19874;t=3600
//! ```
//!
//! `q` is the daily limit and `r` the number of calls left.

use serde::{Deserialize, Serialize};

use crate::remote::ResponseHeaders;
use crate::time::Timestamp;

pub const POLICY_HEADER: &str = "ratelimit-policy";
pub const REMAINING_HEADER: &str = "ratelimit";

/// Quota observed on one response. Always replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub daily_limit: u32,
    pub remaining: u32,
    pub captured_at: Timestamp,
}

impl QuotaSnapshot {
    /// Parse both quota fields from `headers`.
    ///
    /// Returns `None` unless both the limit and the remaining count parse;
    /// a snapshot is never assembled from one field.
    #[must_use]
    pub fn from_headers(headers: &ResponseHeaders, captured_at: Timestamp) -> Option<Self> {
        let daily_limit = parameter(headers.get(POLICY_HEADER)?, "q")?;
        let remaining = parameter(headers.get(REMAINING_HEADER)?, "r")?;
        Some(Self {
            daily_limit,
            remaining,
            captured_at,
        })
    }
}

/// Find `name=<u32>` among the `;`/`,` separated parameters of a header value.
fn parameter(value: &str, name: &str) -> Option<u32> {
    value
        .split([';', ','])
        .filter_map(|item| item.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .and_then(|(_, raw)| raw.trim().trim_matches('"').parse().ok())
}
