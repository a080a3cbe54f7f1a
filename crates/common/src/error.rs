//! Error types for HiveCache.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Inbound content that can never be applied locally (wrong object type,
    /// no extractable link). Logged and dropped, never retried.
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Federation error: {0}")]
    Federation(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Whether a failed unit of work may be retried.
///
/// Queue workers match on this instead of inspecting error variants: permanent
/// failures are logged and dropped, transient ones are re-queued with backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Retrying cannot succeed; drop after logging.
    Permanent,
    /// Infrastructure hiccup; eligible for bounded retry.
    Transient,
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) | Self::AccountNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 5xx Server Errors
            Self::Database(_)
            | Self::Federation(_)
            | Self::Queue(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::Unprocessable(_) => "UNPROCESSABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Federation(_) => "FEDERATION_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Classify this error for the queue-consumer loop.
    ///
    /// Malformed input and unresolvable references are [`FailureKind::Permanent`];
    /// infrastructure errors are [`FailureKind::Transient`].
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_)
            | Self::AccountNotFound(_)
            | Self::Unauthorized
            | Self::Forbidden(_)
            | Self::BadRequest(_)
            | Self::Conflict(_)
            | Self::Unprocessable(_)
            | Self::Config(_) => FailureKind::Permanent,

            Self::Database(_) | Self::Federation(_) | Self::Queue(_) | Self::Internal(_) => {
                FailureKind::Transient
            }
        }
    }

    /// Returns whether this error is eligible for retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.failure_kind(), FailureKind::Transient)
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log server errors
        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
