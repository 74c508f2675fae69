//! Mapping of domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use docsort_core::{Error, ErrorKind};

/// A domain error rendered as `{"error": message, "kind": kind}`.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateCategory => StatusCode::CONFLICT,
        ErrorKind::ReservedCategory | ErrorKind::InvalidCategory => StatusCode::BAD_REQUEST,
        ErrorKind::UnreadableDocument => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::IndexUnavailable | ErrorKind::InferenceUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorKind::FilingError | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(json!({ "error": self.0.to_string(), "kind": kind })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
