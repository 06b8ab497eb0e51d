//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod actions;
#[allow(clippy::missing_errors_doc)]
pub mod attributes;
pub mod quota;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};

use hvacq_app::ports::{RemoteApi, SessionRefresher};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<A, S>() -> Router<AppState<A, S>>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    Router::new()
        // Attributes
        .route("/attributes", get(attributes::list::<A, S>))
        .route(
            "/homes/{id}/{kind}",
            get(attributes::get_home::<A, S>).put(attributes::set_home::<A, S>),
        )
        .route(
            "/zones/{id}/{kind}",
            get(attributes::get_zone::<A, S>).put(attributes::set_zone::<A, S>),
        )
        // Quota
        .route("/quota", get(quota::get::<A, S>))
        // Operator actions
        .route("/actions/manual_poll", post(actions::manual_poll::<A, S>))
        .route(
            "/actions/refresh_presence",
            post(actions::refresh_presence::<A, S>),
        )
        .route(
            "/actions/refresh_metadata",
            post(actions::refresh_metadata::<A, S>),
        )
        .route(
            "/actions/resume_all_schedules",
            post(actions::resume_all_schedules::<A, S>),
        )
        .route(
            "/actions/turn_off_all_zones",
            post(actions::turn_off_all_zones::<A, S>),
        )
        .route(
            "/actions/boost_all_zones",
            post(actions::boost_all_zones::<A, S>),
        )
        // Events
        .route("/events/stream", get(sse::stream::<A, S>))
}
