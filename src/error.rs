//! Application error type and its HTTP mapping.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::auth::{extractors::GuardError, repo::StoreError};

/// Reasons a request is refused by the session layer. Messages are safe to
/// show to the caller as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ForbiddenReason {
    #[error("This email already exists")]
    EmailExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User unauthorized. Refresh token missing")]
    MissingRefreshToken,
    #[error("User not found")]
    UserNotFound,
    #[error("User unauthorized")]
    Unauthorized,
    #[error("Incorrect password")]
    IncorrectPassword,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Forbidden(ForbiddenReason),

    #[error("{0}")]
    Unauthorized(#[from] GuardError),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Forbidden(ForbiddenReason::EmailExists) => "AUTH_EMAIL_EXISTS",
            AppError::Forbidden(ForbiddenReason::InvalidCredentials) => "AUTH_INVALID_CREDENTIALS",
            AppError::Forbidden(ForbiddenReason::MissingRefreshToken) => "AUTH_REFRESH_MISSING",
            AppError::Forbidden(ForbiddenReason::UserNotFound) => "AUTH_USER_NOT_FOUND",
            AppError::Forbidden(ForbiddenReason::Unauthorized) => "AUTH_FORBIDDEN",
            AppError::Forbidden(ForbiddenReason::IncorrectPassword) => "AUTH_INCORRECT_PASSWORD",
            AppError::Unauthorized(_) => "AUTH_UNAUTHORIZED",
            AppError::BadRequest(_) => "VALIDATION",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Message sent to the client. Internal details never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ForbiddenReason> for AppError {
    fn from(reason: ForbiddenReason) -> Self {
        AppError::Forbidden(reason)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AppError::Forbidden(ForbiddenReason::EmailExists),
            StoreError::Backend(e) => AppError::Internal(e.context("user store")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::Internal(e) = &self {
            error!(error = %format!("{e:#}"), "request failed");
        }
        let body = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
            }
        });
        (status, Json(body)).into_response()
    }
}
