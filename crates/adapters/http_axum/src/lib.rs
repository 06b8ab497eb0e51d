//! # hvacq-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a JSON API over one [`Bridge`](hvacq_app::bridge::Bridge):
//!   attribute reads, intent submission, quota and operator actions
//! - Stream bridge events to clients as Server-Sent Events
//! - Map [`HvacqError`](hvacq_domain::error::HvacqError) onto HTTP status codes
//!
//! ## Dependency rule
//! Depends on `hvacq-app` (for the bridge and port traits) and `hvacq-domain`
//! (for the types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;
