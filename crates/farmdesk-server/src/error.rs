//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use farmdesk_core::FarmdeskError;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error type returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<FarmdeskError> for ApiError {
    fn from(err: FarmdeskError) -> Self {
        let status = match &err {
            FarmdeskError::NotFound { .. } => StatusCode::NOT_FOUND,
            FarmdeskError::AlreadyExists { .. } => StatusCode::CONFLICT,
            FarmdeskError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            FarmdeskError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
            FarmdeskError::Validation { .. } => StatusCode::BAD_REQUEST,
            FarmdeskError::Database(_) | FarmdeskError::Crypto(_) | FarmdeskError::Internal(_) => {
                error!(error = %err, "Request failed");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
