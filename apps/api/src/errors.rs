use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::interview::evaluator::EvaluationError;
use crate::interview::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Interview link has expired")]
    Expired,

    #[error("Interview has already been conducted")]
    AlreadyConducted,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Evaluation failure: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Expired => "EXPIRED",
            AppError::AlreadyConducted => "ALREADY_CONDUCTED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Evaluation(_) => "EVALUATION_FAILURE",
            AppError::Persistence(StoreError::VersionConflict { .. }) => "CONFLICT",
            AppError::Persistence(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Expired => (StatusCode::GONE, self.to_string()),
            AppError::AlreadyConducted => (StatusCode::CONFLICT, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Evaluation(e) => {
                tracing::error!("Evaluation error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The interview assistant could not process this step, please retry".to_string(),
                )
            }
            AppError::Persistence(e @ StoreError::VersionConflict { .. }) => {
                tracing::warn!("Concurrent session update rejected: {e}");
                (
                    StatusCode::CONFLICT,
                    "The session was modified concurrently, please retry".to_string(),
                )
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
