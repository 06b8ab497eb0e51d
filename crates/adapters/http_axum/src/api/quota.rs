//! `GET /api/quota`

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use hvacq_app::ports::{RemoteApi, SessionRefresher};
use hvacq_domain::time::Timestamp;

use crate::state::AppState;

/// Latest quota observation. Every field is `null` until one arrives.
#[derive(Debug, Default, Serialize)]
pub struct QuotaView {
    pub daily_limit: Option<u32>,
    pub remaining: Option<u32>,
    pub captured_at: Option<Timestamp>,
}

pub async fn get<A, S>(State(state): State<AppState<A, S>>) -> Json<QuotaView>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    let view = state
        .bridge
        .quota()
        .map_or_else(QuotaView::default, |snapshot| QuotaView {
            daily_limit: Some(snapshot.daily_limit),
            remaining: Some(snapshot.remaining),
            captured_at: Some(snapshot.captured_at),
        });
    Json(view)
}
