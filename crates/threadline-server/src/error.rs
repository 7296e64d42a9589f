//! Application error types and Axum response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::dto::ErrorResponse;

/// Body text for a request missing `message` or `thread_id`.
pub const VALIDATION_ERROR: &str = "Message and thread_id are required";
/// Body text for a body that is not a JSON object.
pub const INVALID_JSON_ERROR: &str = "Invalid JSON";
/// Body text for every server-side failure. Details stay in the logs.
pub const INTERNAL_ERROR: &str = "Internal Server Error";

/// Request outcomes that end in an error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// A required field is missing or empty.
    Validation,
    /// The body could not be read as a JSON object.
    InvalidJson,
    /// The agent call failed; the cause has already been logged.
    Upstream,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation => (StatusCode::BAD_REQUEST, VALIDATION_ERROR),
            ApiError::InvalidJson => (StatusCode::BAD_REQUEST, INVALID_JSON_ERROR),
            ApiError::Upstream => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
