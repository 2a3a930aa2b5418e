//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use garden_core::GardenError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// API error type.
#[derive(Debug, Error)]
#[error("[{status}] {code}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    // Common error constructors
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

// Convert from garden-core errors
impl From<GardenError> for ApiError {
    fn from(err: GardenError) -> Self {
        let error_code = err.code().as_str();
        let suggestion = err.suggestion().map(str::to_string);

        let api = match err {
            GardenError::Configuration(msg) => ApiError::bad_request(msg),
            GardenError::Validation { message, .. } => ApiError::validation(message),
            GardenError::NotFound { message, .. } => ApiError::not_found(message),
            GardenError::InvalidState { message, .. } => ApiError::conflict(message),
            GardenError::Database { message, .. } => {
                ApiError::internal(format!("Database error: {}", message))
            }
            GardenError::Parse { message, .. } => {
                ApiError::internal(format!("Parse error: {}", message))
            }
            GardenError::Serialization(e) => {
                ApiError::internal(format!("Serialization error: {}", e))
            }
            GardenError::Io(e) => ApiError::internal(format!("IO error: {}", e)),
            GardenError::Internal(msg) => ApiError::internal(msg),
        };

        match suggestion {
            Some(suggestion) => api.with_details(json!({
                "error_code": error_code,
                "suggestion": suggestion,
            })),
            None => api.with_details(json!({ "error_code": error_code })),
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
