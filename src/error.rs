/// Error types for the capture service
///
/// This module defines all error types that can occur while orchestrating
/// capture sessions. Batch tasks catch and log these per item; single-entity
/// operations propagate them to the caller.
use thiserror::Error;

/// Result type for capture-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation invalid for the resource's current status
    #[error("Resource in wrong state: {0}")]
    WrongState(String),

    /// Attempt to mutate a soft-deleted resource
    #[error("Resource in deleted state: {0}")]
    DeletedState(String),

    /// Cascade delete blocked by a descendant recording that is still live
    #[error("Cannot delete: {0} has undeleted recordings")]
    CaptureSessionNotDeleted(String),

    /// Caller is not permitted to perform the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Duplicate resource
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Media or storage gateway call failed
    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound(err.to_string()),
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Gateway(err.to_string())
    }
}
