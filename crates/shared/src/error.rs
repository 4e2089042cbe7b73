//! Error types for the storage layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// A write would break a domain invariant; nothing was persisted
    #[error("{message}")]
    Invalid { field: &'static str, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        TrackerError::Invalid {
            field,
            message: message.into(),
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
