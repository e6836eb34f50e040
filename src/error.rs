use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

use crate::models::DocumentStatus;
use crate::render::RenderError;
use crate::store::StoreError;
use crate::workflow::Transition;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AccessDenied(String),
    #[error("cannot {requested} a document in status {current}")]
    InvalidTransition {
        current: DocumentStatus,
        requested: Transition,
    },
    #[error("{0}")]
    DeleteIntegrity(String),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        AppError::AccessDenied(message.into())
    }

    pub fn invalid_transition(current: DocumentStatus, requested: Transition) -> Self {
        AppError::InvalidTransition { current, requested }
    }

    pub fn delete_integrity(message: impl Into<String>) -> Self {
        AppError::DeleteIntegrity(message.into())
    }

    pub fn internal<E: Display>(error: E) -> Self {
        AppError::Internal(error.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::DeleteIntegrity(_) => StatusCode::CONFLICT,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(entity) => AppError::not_found(format!("{entity} not found")),
            StoreError::Duplicate(message) => AppError::Validation(message),
            StoreError::Integrity(message) => AppError::DeleteIntegrity(message),
            StoreError::StatusConflict { current, .. } => AppError::Internal(format!(
                "document status changed concurrently (now {current})"
            )),
            StoreError::Io(err) => AppError::internal(err),
            StoreError::Encoding(err) => AppError::internal(err),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}
