//! HTTP error envelope: handlers return `Result<Json<T>, ApiError>` and
//! every failure serializes to a typed `{error_code, message, details?}`
//! body instead of an ad-hoc `serde_json::Value`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hybridrag_core::error::{ErrorCategory, RagError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error_code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Wraps `RagError` so it can be returned directly from an axum handler via
/// `?` and converted into a stable response: validation failures become
/// 400, everything else 500.
pub struct ApiError(pub RagError);

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            ErrorCategory::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorEnvelope { error_code: self.0.error_code(), message: self.0.to_string(), details: None };
        (status, Json(body)).into_response()
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError(RagError::Validation(message.into()))
}

/// A handful of routes need a 404 that isn't one of `RagError`'s
/// categories (validation/upstream/worker failures) — `GET /v1/ingest/{id}`
/// when the id is unknown, for instance.
pub enum RouteError {
    Api(ApiError),
    NotFound(String),
}

impl From<RagError> for RouteError {
    fn from(e: RagError) -> Self {
        Self::Api(ApiError(e))
    }
}

impl From<ApiError> for RouteError {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        match self {
            Self::Api(e) => e.into_response(),
            Self::NotFound(message) => {
                let body = ErrorEnvelope { error_code: "NOT_FOUND", message, details: None };
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
        }
    }
}

pub fn not_found(message: impl Into<String>) -> RouteError {
    RouteError::NotFound(message.into())
}
