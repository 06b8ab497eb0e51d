//! # hvacq-domain
//!
//! Pure domain model for the hvacq command/poll bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Targets** (a home or zone plus the attribute kind being observed/controlled)
//! - Define **Intents**, **Commands**, **Batches** and **Confirmation requests**
//! - Define **Quota snapshots** and how they are read off response headers
//! - Define **Cached attributes** and the **Events** fired when they change
//! - Define the **remote wire types** exchanged with the HVAC API boundary
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod attribute;
pub mod command;
pub mod event;
pub mod quota;
pub mod remote;
pub mod target;
pub mod value;
