//! JSON REST handlers for attributes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use hvacq_app::ports::{RemoteApi, SessionRefresher};
use hvacq_domain::attribute::CachedAttribute;
use hvacq_domain::error::NotFoundError;
use hvacq_domain::id::{HomeId, ZoneId};
use hvacq_domain::target::{AttributeKind, Target};
use hvacq_domain::value::AttributeValue;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// Request body for submitting an intent.
#[derive(Deserialize)]
pub struct SetValueRequest {
    pub value: AttributeValue,
}

/// One attribute as shown to a host.
#[derive(Debug, Serialize)]
pub struct AttributeView {
    pub target: Target,
    /// Value to display; an unconfirmed intent wins over the cache.
    pub value: AttributeValue,
    pub optimistic: bool,
    /// The last remote observation, absent until one arrives.
    pub cached: Option<CachedAttribute>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<CachedAttribute>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoints.
pub enum GetResponse {
    Ok(Json<AttributeView>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the set endpoints.
pub enum SetResponse {
    Accepted,
}

impl IntoResponse for SetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted => StatusCode::ACCEPTED.into_response(),
        }
    }
}

fn parse_kind(raw: &str) -> Result<AttributeKind, ApiErrorResponse> {
    raw.parse().map_err(|_| {
        ApiErrorResponse::from(NotFoundError {
            entity: "Attribute kind",
            id: raw.to_string(),
        })
    })
}

fn view<A, S>(state: &AppState<A, S>, target: Target) -> Result<GetResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    let resolved = state.bridge.resolve(&target).ok_or_else(|| NotFoundError {
        entity: "Attribute",
        id: target.to_string(),
    })?;
    Ok(GetResponse::Ok(Json(AttributeView {
        target,
        value: resolved.value,
        optimistic: resolved.optimistic,
        cached: state.bridge.attribute(&target),
    })))
}

async fn submit<A, S>(
    state: &AppState<A, S>,
    target: Target,
    value: AttributeValue,
) -> Result<SetResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    state.bridge.submit(target, value).await?;
    Ok(SetResponse::Accepted)
}

/// `GET /api/attributes`
pub async fn list<A, S>(State(state): State<AppState<A, S>>) -> ListResponse
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    ListResponse::Ok(Json(state.bridge.attributes()))
}

/// `GET /api/homes/{id}/{kind}`
pub async fn get_home<A, S>(
    State(state): State<AppState<A, S>>,
    Path((id, kind)): Path<(u64, String)>,
) -> Result<GetResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    let target = Target::home(HomeId::new(id), parse_kind(&kind)?);
    view(&state, target)
}

/// `GET /api/zones/{id}/{kind}`
pub async fn get_zone<A, S>(
    State(state): State<AppState<A, S>>,
    Path((id, kind)): Path<(u64, String)>,
) -> Result<GetResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    let target = Target::zone(ZoneId::new(id), parse_kind(&kind)?);
    view(&state, target)
}

/// `PUT /api/homes/{id}/{kind}`
pub async fn set_home<A, S>(
    State(state): State<AppState<A, S>>,
    Path((id, kind)): Path<(u64, String)>,
    Json(body): Json<SetValueRequest>,
) -> Result<SetResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    let target = Target::home(HomeId::new(id), parse_kind(&kind)?);
    submit(&state, target, body.value).await
}

/// `PUT /api/zones/{id}/{kind}`
pub async fn set_zone<A, S>(
    State(state): State<AppState<A, S>>,
    Path((id, kind)): Path<(u64, String)>,
    Json(body): Json<SetValueRequest>,
) -> Result<SetResponse, ApiErrorResponse>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    let target = Target::zone(ZoneId::new(id), parse_kind(&kind)?);
    submit(&state, target, body.value).await
}
