//! Error types for the chat relay
//!
//! Errors detected before any response bytes are written map to ordinary
//! JSON error responses with the `{ "error": ..., "detail": ... }` shape.
//! Errors after a streamed response has committed its headers are signaled
//! in-band by the streaming handler instead and never reach this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream API key is not configured")]
    MissingCredential,

    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        detail: Option<Value>,
    },

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build an upstream error from a pre-stream HTTP failure, keeping the
    /// upstream status code and error body for the relayed response.
    pub fn upstream(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body).ok();
        AppError::Upstream {
            status,
            message: "Upstream chat API call failed".to_string(),
            detail,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::MissingCredential => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream API key is not configured".to_string(),
                None,
            ),
            AppError::Upstream {
                status,
                message,
                detail,
            } => (status, message, detail),
            AppError::HttpError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream chat API call failed".to_string(),
                Some(Value::String(e.to_string())),
            ),
            AppError::JsonError(_) => (
                StatusCode::BAD_REQUEST,
                "Invalid JSON in request".to_string(),
                None,
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: message,
            detail,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
