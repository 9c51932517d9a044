/**
 * Backend Error Types
 *
 * This module defines the error type returned by every HTTP handler. Each
 * layer below the handlers has its own error enum; `BackendError` wraps them
 * and decides the status code.
 *
 * # Status Code Mapping
 *
 * | Source | Status |
 * |---|---|
 * | `HandlerError` | carried status |
 * | `TaskError::Conflict` | 409 |
 * | `TaskError::NotFound`, `StoreError::NotFound` | 404 |
 * | `TaskError::Forbidden` | 403 |
 * | `StoreError::UniqueViolation` | 409 |
 * | `StoreError::Database` | 500 |
 * | `SharedError::ValidationError` | 400 |
 * | serialization | 500 |
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::store::StoreError;
use crate::backend::tasks::TaskError;
use crate::shared::{SharedError, SpaceTask};

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use axum::http::StatusCode;
/// use clawswarm::backend::error::BackendError;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "invalid taskId");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request-level failure (missing token, not a member, bad parameter)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Rejection from the task state machine
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Persistence failure outside the task state machine
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid request payload
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::BAD_REQUEST, message)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Task(err) => match err {
                TaskError::Conflict { .. } => StatusCode::CONFLICT,
                TaskError::NotFound(_) => StatusCode::NOT_FOUND,
                TaskError::Forbidden(_) => StatusCode::FORBIDDEN,
                TaskError::Persistence(store) => store_status(store),
            },
            Self::Store(err) => store_status(err),
            Self::SharedError(SharedError::ValidationError { .. }) => StatusCode::BAD_REQUEST,
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    ///
    /// Database failures are reported generically; the detail only goes to
    /// the log.
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Task(TaskError::Persistence(StoreError::Database(_)))
            | Self::Store(StoreError::Database(_)) => "internal server error".to_string(),
            Self::Task(err) => err.to_string(),
            Self::Store(err) => err.to_string(),
            Self::SharedError(SharedError::ValidationError { message, .. }) => message.clone(),
            Self::SerializationError(err) => err.to_string(),
        }
    }

    /// The bot's active task that caused a conflict, if any
    pub fn current_task(&self) -> Option<&SpaceTask> {
        match self {
            Self::Task(TaskError::Conflict { current_task, .. }) => current_task.as_deref(),
            _ => None,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::UniqueViolation(_) => StatusCode::CONFLICT,
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
