//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use hvacq_app::ports::{RemoteApi, SessionRefresher};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api` and includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level.
pub fn build<A, S>(state: AppState<A, S>) -> Router
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::{get_text, test_app};

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let (app, _) = test_app();
        let (status, body) = get_text(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_route() {
        let (app, _) = test_app();
        let (status, _) = get_text(app, "/api/nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
