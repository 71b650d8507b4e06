//! Control API error types
//!
//! Every error renders as `{ "error": { "code", "message" } }`. Worker
//! failures are not errors here; they travel inside the returned state.

use std::panic::Location;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use error_location::ErrorLocation;
use serde::Serialize;
use sv_supervisor::SupervisorError;
use thiserror::Error;

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST")
    pub code: String,
    pub message: String,
}

/// API errors with associated HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown worker or tool (404)
    #[error("Resource not found: {message} {location}")]
    NotFound {
        message: String,
        location: ErrorLocation,
    },

    /// Malformed request (400)
    #[error("Bad request: {message} {location}")]
    BadRequest {
        message: String,
        location: ErrorLocation,
    },

    /// Supervisor is shutting down (503)
    #[error("Unavailable: {message} {location}")]
    Unavailable {
        message: String,
        location: ErrorLocation,
    },

    /// Internal server error (500)
    #[error("Internal error: {message} {location}")]
    Internal {
        message: String,
        location: ErrorLocation,
    },
}

impl ApiError {
    #[track_caller]
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::warn!("{}", self);

        let (status, code, message) = match self {
            ApiError::NotFound { message, .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
            ApiError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
            }
            ApiError::Unavailable { message, .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
            }
            ApiError::Internal { message, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                message,
            ),
        };

        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.into(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<SupervisorError> for ApiError {
    #[track_caller]
    fn from(e: SupervisorError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        match e {
            SupervisorError::UnknownPort { port, .. } => ApiError::NotFound {
                message: format!("No worker on port {port}"),
                location,
            },
            SupervisorError::ShuttingDown { .. } => ApiError::Unavailable {
                message: e.recovery_hint().to_string(),
                location,
            },
            _ => ApiError::Internal {
                message: e.to_string(),
                location,
            },
        }
    }
}

/// A supervisor task that panicked or was cancelled
impl From<tokio::task::JoinError> for ApiError {
    #[track_caller]
    fn from(e: tokio::task::JoinError) -> Self {
        log::error!("Supervisor task failed: {}", e);
        ApiError::Internal {
            message: "Worker operation did not complete".to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
