//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use ltc_store::StoreError;

/// Every way a request can fail. Each variant maps to one status code and a
/// fixed public message; the detail strings are for logs only.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid bearer token, or a webhook that failed signature
    /// verification.
    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// A hosted service (identity, Persona, FCM) failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::BadRequest(msg) | Self::NotFound(msg) | Self::Conflict(msg) => msg,
            Self::Upstream(_) => "Upstream service unavailable",
            Self::Storage(_) | Self::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message() }));
        (self.status_code(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound("User not found"),
            StoreError::Duplicate(_) => ApiError::Conflict("User already registered"),
            other => ApiError::Storage(other.to_string()),
        }
    }
}
