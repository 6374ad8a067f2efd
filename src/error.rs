use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid request parameter.
    #[error("{0}")]
    BadRequest(String),

    /// Request rejected by the auth gateway.
    #[error("{0}")]
    Unauthenticated(String),

    /// Login failure. Never says which half of the credentials was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Token signature, payload or expiry check failed.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Acting user does not own the resource.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found error.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate account or review.
    #[error("{0}")]
    Conflict(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // The public API has always reported duplicates as 400.
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Io(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorBody {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
