//! Operator actions.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hvacq_app::ports::{RemoteApi, SessionRefresher};
use hvacq_domain::target::Track;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubmittedZones {
    pub zones: usize,
}

#[derive(Debug, Serialize)]
pub struct RefreshReport {
    pub track: Track,
    pub changed: usize,
}

pub enum ManualPollResponse {
    NoContent,
}

impl IntoResponse for ManualPollResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

pub enum RefreshResponse {
    Ok(Json<RefreshReport>),
}

impl IntoResponse for RefreshResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => (StatusCode::OK, json).into_response(),
        }
    }
}

/// Answer to a bulk action: intents were submitted, not yet executed.
pub enum BulkResponse {
    Accepted(Json<SubmittedZones>),
}

impl BulkResponse {
    fn zones(zones: usize) -> Self {
        Self::Accepted(Json(SubmittedZones { zones }))
    }
}

impl IntoResponse for BulkResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(json) => (StatusCode::ACCEPTED, json).into_response(),
        }
    }
}

/// `POST /api/actions/manual_poll`
///
/// Answers once both tracks have run.
pub async fn manual_poll<A, S>(
    State(state): State<AppState<A, S>>,
) -> Result<ManualPollResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    state.bridge.manual_poll().await?;
    Ok(ManualPollResponse::NoContent)
}

async fn refresh<A, S>(
    state: &AppState<A, S>,
    track: Track,
) -> Result<RefreshResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    let changed = state.bridge.refresh(track).await?;
    Ok(RefreshResponse::Ok(Json(RefreshReport { track, changed })))
}

/// `POST /api/actions/refresh_presence`
///
/// Runs the fast track: presence and zone operating state.
pub async fn refresh_presence<A, S>(
    State(state): State<AppState<A, S>>,
) -> Result<RefreshResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    refresh(&state, Track::Fast).await
}

/// `POST /api/actions/refresh_metadata`
///
/// Runs the slow track: zone names, types and batteries.
pub async fn refresh_metadata<A, S>(
    State(state): State<AppState<A, S>>,
) -> Result<RefreshResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    refresh(&state, Track::Slow).await
}

/// `POST /api/actions/resume_all_schedules`
pub async fn resume_all_schedules<A, S>(
    State(state): State<AppState<A, S>>,
) -> Result<BulkResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    Ok(BulkResponse::zones(state.bridge.resume_all_schedules().await?))
}

/// `POST /api/actions/turn_off_all_zones`
pub async fn turn_off_all_zones<A, S>(
    State(state): State<AppState<A, S>>,
) -> Result<BulkResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    Ok(BulkResponse::zones(state.bridge.turn_off_all_zones().await?))
}

/// `POST /api/actions/boost_all_zones`
pub async fn boost_all_zones<A, S>(
    State(state): State<AppState<A, S>>,
) -> Result<BulkResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    Ok(BulkResponse::zones(state.bridge.boost_all_zones().await?))
}
