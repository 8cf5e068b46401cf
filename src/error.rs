//! API error type shared by every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// JSON error body: `{"message": "..."}` plus optional field errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed")]
    Validation(Vec<String>),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest(message) | Self::NotFound(message) | Self::Conflict(message) => {
                ErrorResponse {
                    message,
                    errors: Vec::new(),
                }
            }
            Self::Validation(errors) => ErrorResponse {
                message: "Invalid request body".to_string(),
                errors,
            },
            Self::Unauthorized => ErrorResponse {
                message: "Unauthorized".to_string(),
                errors: Vec::new(),
            },
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                ErrorResponse {
                    message: "Internal server error".to_string(),
                    errors: Vec::new(),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            StorageError::Conflict(what) => Self::Conflict(format!("{what} already exists")),
            StorageError::InvalidReference(what) => {
                Self::BadRequest(format!("Referenced {what} does not exist"))
            }
            StorageError::Database(e) => {
                tracing::error!(error = %e, "database error");
                Self::Internal(e.into())
            }
            StorageError::Serialization(e) => Self::Internal(e.into()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: {}", e.code),
                })
            })
            .collect();
        messages.sort();
        Self::Validation(messages)
    }
}
