//! HTTP application errors with JSON responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use webhook_processor::WebhookError;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Request validation ---
    #[error("missing X-GitHub-Event header")]
    MissingEventHeader,

    #[error("invalid webhook signature")]
    InvalidSignature,

    // --- Dispatch ---
    #[error("webhook queue full")]
    QueueFull,

    #[error("webhook processor not configured")]
    ProcessorUnavailable,

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Routing ---
    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingEventHeader | AppError::InvalidSignature => StatusCode::BAD_REQUEST,
            AppError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ProcessorUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Bind(_) | AppError::Server(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingEventHeader => "MISSING_EVENT_HEADER",
            AppError::InvalidSignature => "INVALID_SIGNATURE",
            AppError::QueueFull => "QUEUE_FULL",
            AppError::ProcessorUnavailable => "PROCESSOR_UNAVAILABLE",
            AppError::NotFound => "NOT_FOUND",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::QueueFull => AppError::QueueFull,
            WebhookError::Stopped => AppError::ProcessorUnavailable,
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;
