// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Missing argument {index} for job type {job_type}")]
    MissingArgument { job_type: String, index: usize },

    #[error("Argument {index} for job type {job_type} cannot be bound: {reason}")]
    InvalidArgument {
        job_type: String,
        index: usize,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// From implementation for infra crates (to avoid circular dependency)
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Store(err)
    }
}

// Note: redis::RedisError conversion is handled in the infra-redis crate
// by converting to AppError::Store(String).
