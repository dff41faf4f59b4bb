#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Not implemented")]
    NotImplemented,

    #[error("Input missing: {0}")]
    InputMissing(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Permanent provider failure: {0}")]
    Permanent(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Store conflict: {0}")]
    StoreConflict(String),

    #[error("Broker failure: {0}")]
    BrokerFailure(String),

    #[error("Cancel requested")]
    CancelRequested,

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::NotImplemented => (
                StatusCode::NOT_IMPLEMENTED,
                "NOT_IMPLEMENTED",
                "This endpoint is not yet implemented".to_string(),
            ),
            AppError::InputMissing(msg) => (StatusCode::BAD_REQUEST, "INPUT_MISSING", msg.clone()),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", msg.clone()),
            AppError::Transient(msg) => {
                tracing::warn!("transient failure: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, "TRANSIENT", msg.clone())
            }
            AppError::Permanent(msg) => {
                tracing::error!("permanent provider failure: {msg}");
                (StatusCode::BAD_GATEWAY, "PERMANENT", msg.clone())
            }
            AppError::SchemaViolation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_VIOLATION", msg.clone())
            }
            AppError::StoreConflict(msg) => (StatusCode::CONFLICT, "STORE_CONFLICT", msg.clone()),
            AppError::BrokerFailure(msg) => {
                tracing::error!("broker failure: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, "BROKER_FAILURE", msg.clone())
            }
            AppError::CancelRequested => (
                StatusCode::OK,
                "CANCELLED",
                "Job was cancelled".to_string(),
            ),
            AppError::DeadlineExceeded(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED", msg.clone())
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

impl From<crate::model_client::ModelError> for AppError {
    fn from(e: crate::model_client::ModelError) -> Self {
        use crate::model_client::ModelError;
        match e {
            ModelError::RateLimited { attempts } => {
                AppError::RateLimited(format!("exhausted after {attempts} attempts"))
            }
            ModelError::Transient(msg) => AppError::Transient(msg),
            ModelError::Permanent(msg) => AppError::Permanent(msg),
            ModelError::SchemaViolation(msg) => AppError::SchemaViolation(msg),
            ModelError::CircuitOpen => AppError::Transient("circuit breaker open".into()),
        }
    }
}
