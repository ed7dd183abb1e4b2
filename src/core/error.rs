use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A contract rule was violated. Rendered as the structured 400 body
    /// with the operation name and the stable rule description.
    #[error("Validation error: {description}")]
    Validation { origin: String, description: String },

    /// Malformed request (unreadable JSON, bad path parameter).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No batch with the requested id. Empty 404 body by contract.
    #[error("Batch not found")]
    NotFound,

    /// The batch exists but its expiry has passed. Empty 410 body.
    #[error("Batch expired")]
    Gone,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(origin: impl Into<String>, description: impl Into<String>) -> Self {
        AppError::Validation {
            origin: origin.into(),
            description: description.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation {
                origin,
                description,
            } => validation_response(origin, description),
            AppError::BadRequest(msg) => validation_response("request".to_string(), msg),
            AppError::NotFound => StatusCode::NOT_FOUND.into_response(),
            AppError::Gone => StatusCode::GONE.into_response(),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
            AppError::Storage(ref msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}

/// Builds the structured 400 body. The correlation id is created here, at
/// the moment the warning is logged, so every rejected request can be
/// matched to exactly one log entry.
fn validation_response(origin: String, description: String) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    tracing::warn!(
        correlation_id = %correlation_id,
        source = %origin,
        "request rejected: {}",
        description
    );
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::single(correlation_id, origin, description)),
    )
        .into_response()
}

pub type Result<T> = std::result::Result<T, AppError>;
