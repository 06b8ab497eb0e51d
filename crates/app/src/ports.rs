//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the bridge core and the outside world.
//! They are defined here (in `app`) so that both the services and the adapter
//! crates can depend on them without creating circular dependencies.

pub mod event_bus;
pub mod remote_api;

pub use event_bus::EventPublisher;
pub use remote_api::{RemoteApi, SessionRefresher};
