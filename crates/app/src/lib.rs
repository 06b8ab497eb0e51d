//! # hvacq-app
//!
//! Application layer: the command/poll bridge and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `RemoteApi`: perform one call against the rate-limited HVAC API
//!   - `SessionRefresher`: re-establish an expired session
//!   - `EventPublisher`: fan out bridge events to hosts
//! - Provide the bridge services:
//!   - `QuotaTracker`, `StateCache`, `SharedExecutor` (single-flight gate)
//!   - `DebounceGate`, `CommandQueue`, `CommandWorker`
//!   - `DualTrackPoller`
//! - Expose the host boundary as [`bridge::Bridge`]
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `hvacq-domain` only (plus `tokio` for tasks, timers and sync).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod bridge;
pub mod event_bus;
pub mod ports;
pub mod services;
pub mod settings;

#[cfg(test)]
mod testing;
