use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::StoreError;

/// AppError
///
/// The flat error taxonomy shared by every route. Each variant maps to exactly one status
/// code and one machine-readable `error` code, so clients can tell an expired session apart
/// from a missing document or a bad payload.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Server is not configured: {0}")]
    ServerMisconfigured(&'static str),

    #[error("Document store failure")]
    Store(#[from] StoreError),

    #[error("Object storage failure: {0}")]
    Storage(String),
}

/// ErrorBody
///
/// JSON shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ServerMisconfigured(_) | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthorized => "unauthorized",
            AppError::NotFound => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::ServerMisconfigured(_) => "server_misconfigured",
            AppError::Store(_) => "server_error",
            AppError::Storage(_) => "storage_error",
        }
    }

    /// Shorthand for a missing or blank required field.
    pub fn missing_field(field: &str) -> Self {
        AppError::Validation(format!("Missing required field: {field}"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store details stay in the logs; clients only see a generic message.
        let message = match &self {
            AppError::Store(e) => {
                tracing::error!("document store error: {e}");
                "Internal server error".to_string()
            }
            AppError::ServerMisconfigured(what) => {
                tracing::error!("server misconfigured: {what}");
                self.to_string()
            }
            AppError::Storage(e) => {
                tracing::error!("object storage error: {e}");
                "Failed to store the uploaded file".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: self.code().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
