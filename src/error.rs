use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::password::PolicyError;

/// AppError
///
/// The single error taxonomy every handler returns. Each variant maps onto one
/// HTTP status and is rendered as `{"error": "<message>"}`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
    /// Malformed or missing input (400).
    #[error("{0}")]
    Validation(String),
    /// A path identifier that is not a number (400).
    #[error("Invalid ID")]
    InvalidId,
    /// Missing/invalid credentials or token (401).
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    /// Duplicate name or entity still referenced (409).
    #[error("{0}")]
    Conflict(String),
    #[error("Too Many Requests")]
    TooManyRequests,
    /// Storage failure (500). The message is already sanitized.
    #[error("{0}")]
    Internal(String),
}

/// ErrorBody
///
/// Wire format of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidId => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";

/// Storage errors. Constraint violations mean another request won the race
/// past an application-level pre-check, so they surface as conflicts. Values
/// the column rejects outright are bad input.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                tracing::warn!(constraint = ?db_err.constraint(), "unique constraint violated");
                return AppError::conflict("Resource already exists");
            }
            if db_err.is_foreign_key_violation() {
                tracing::warn!(constraint = ?db_err.constraint(), "foreign key constraint violated");
                return AppError::conflict("Resource is still referenced");
            }
            // 22001: value too long for its column.
            if db_err.is_check_violation() || db_err.code().as_deref() == Some(STRING_DATA_RIGHT_TRUNCATION) {
                tracing::warn!(code = ?db_err.code(), "row rejected by column constraint");
                return AppError::validation("Invalid data");
            }
        }
        tracing::error!("database error: {:?}", err);
        AppError::Internal("Internal server error".to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {}", rejection.body_text());
        AppError::validation("Invalid data")
    }
}

impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        AppError::Validation(err.to_string())
    }
}
