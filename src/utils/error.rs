use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;
use crate::workflow::WorkflowError;

/// A single invalid field, surfaced in the `details` array of validation
/// error responses.
#[derive(Debug, Clone, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        violations: Vec<FieldViolation>,
    },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Resource not found")]
    NotFound,

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        AppError::Validation {
            message: message.clone(),
            violations: vec![FieldViolation {
                field: field.into(),
                message,
            }],
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Precondition(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Precondition(_) => "PRECONDITION_FAILED",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound => "NOT_FOUND",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalServerError(msg) => {
                error!(message = %msg, "Internal server error");
            }
            other => {
                warn!(error = ?other, code = other.code(), "Request rejected");
            }
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation { field, message } => AppError::invalid_field(field, message),
            WorkflowError::Precondition(msg) => AppError::Precondition(msg),
            WorkflowError::InvalidState(msg) => AppError::InvalidState(msg),
            WorkflowError::Conflict(msg) => AppError::Conflict(msg),
            WorkflowError::Unauthorized => AppError::Forbidden,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level messages to the client
        let public_message = match &self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::AuthError(msg)
            | AppError::Precondition(msg)
            | AppError::InvalidState(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Forbidden => "You are not allowed to perform this action".to_string(),
            AppError::NotFound => "The requested resource was not found".to_string(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalServerError(_) => "Something went wrong".to_string(),
        };

        let details = match &self {
            AppError::Validation { violations, .. } if !violations.is_empty() => {
                serde_json::to_value(violations).ok()
            }
            _ => None,
        };

        error_response(code, public_message, details, status)
    }
}
