//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billtrack_billing::BillingError;
use billtrack_shared::TrackerError;
use serde_json::json;

use crate::validation::ValidationError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Unauthorized")]
    Unauthorized,

    // Validation errors
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    // Resource errors
    #[error("{0} not found")]
    NotFound(&'static str),

    // Billing errors
    #[error("{0}")]
    PaymentRequired(String),

    // Internal errors
    #[error("Failed to generate report")]
    ReportGeneration,
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::PaymentRequired(_) => (StatusCode::PAYMENT_REQUIRED, "PAYMENT_REQUIRED"),
            ApiError::ReportGeneration => {
                (StatusCode::INTERNAL_SERVER_ERROR, "REPORT_GENERATION_FAILED")
            }
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        // Database details stay in the logs
        let message = match &self {
            ApiError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let mut body = json!({
            "message": message,
            "code": code,
        });
        if let ApiError::Validation {
            field: Some(field), ..
        } = &self
        {
            body["field"] = json!(field);
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        ApiError::Database(err.to_string())
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Invalid { field, message } => ApiError::validation(field, message),
            TrackerError::Database(e) => e.into(),
            other => {
                tracing::error!(error = %other, "Storage error");
                ApiError::Internal
            }
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::NotFound(what) => ApiError::NotFound(resource_name(&what)),
            BillingError::InsufficientCredits { .. } => ApiError::PaymentRequired(
                "Insufficient credits. Please purchase more to generate reports.".to_string(),
            ),
            BillingError::InvalidAmount(message) => ApiError::validation("amount", message),
            BillingError::Config(message) => {
                tracing::error!(error = %message, "Report generator not configured");
                ApiError::ReportGeneration
            }
            BillingError::Provider(_) | BillingError::InvalidModelOutput(_) => {
                // Already logged with user context by the report service
                ApiError::ReportGeneration
            }
            BillingError::Store(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation {
            field: err.field.map(str::to_string),
            message: err.message,
        }
    }
}

/// Map `"invoice 1234…"` style service messages to a display name
fn resource_name(what: &str) -> &'static str {
    match what.split_whitespace().next() {
        Some("invoice") => "Invoice",
        Some("report") => "Report",
        Some("notification") => "Notification",
        Some("user") => "User",
        _ => "Resource",
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
