//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hvacq_domain::error::{HvacqError, NotFoundError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`HvacqError`] to an HTTP response with appropriate status code.
pub struct ApiErrorResponse(HvacqError);

impl From<HvacqError> for ApiErrorResponse {
    fn from(err: HvacqError) -> Self {
        Self(err)
    }
}

impl From<NotFoundError> for ApiErrorResponse {
    fn from(err: NotFoundError) -> Self {
        Self(err.into())
    }
}

impl From<ValidationError> for ApiErrorResponse {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            HvacqError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            HvacqError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            HvacqError::Remote(err) => {
                tracing::warn!(error = %err, "remote call failed");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            HvacqError::Closed => (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
