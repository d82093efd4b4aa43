//! Error types for ScrapeDeck services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for local validation, tenancy, conflicts and upstream failures
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    InvalidBaseUrl,
    InvalidUsername,
    DuplicateAccount,

    // Tenancy errors (3xxx)
    MissingTenant,
    TenantMismatch,

    // Resource errors (4xxx)
    NotFound,
    JobNotFound,
    SessionNotFound,

    // Conflict errors (5xxx)
    DuplicateBase,
    InvalidTransition,
    ProvisioningInFlight,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    ScrapeFailed,
    IngestFailed,
    ApiUnreachable,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::InvalidBaseUrl => 1004,
            ErrorCode::InvalidUsername => 1005,
            ErrorCode::DuplicateAccount => 1006,

            // Tenancy (3xxx)
            ErrorCode::MissingTenant => 3001,
            ErrorCode::TenantMismatch => 3002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::JobNotFound => 4002,
            ErrorCode::SessionNotFound => 4003,

            // Conflicts (5xxx)
            ErrorCode::DuplicateBase => 5001,
            ErrorCode::InvalidTransition => 5002,
            ErrorCode::ProvisioningInFlight => 5003,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::ScrapeFailed => 8002,
            ErrorCode::IngestFailed => 8003,
            ErrorCode::ApiUnreachable => 8004,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Job already linked to an external base, as reported by the table API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influencer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("{message}")]
    InvalidBaseUrl { message: String },

    #[error("Please enter a valid {platform} username or URL")]
    InvalidUsername { platform: String },

    #[error("This {platform} account is already in your list: @{username}")]
    DuplicateAccount { platform: String, username: String },

    // Tenancy errors
    #[error("base_id is required for this request")]
    MissingTenant,

    #[error("Tenant mismatch")]
    TenantMismatch,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    // Conflict errors
    #[error("{}", duplicate_base_message(.existing_job.as_ref()))]
    DuplicateBase { existing_job: Option<ExistingJob> },

    #[error("Invalid transition: {message}")]
    InvalidTransition { message: String },

    #[error("A provisioning attempt is already in flight")]
    ProvisioningInFlight,

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("Scraping failed: {message}")]
    ScrapeFailed { message: String },

    #[error("Ingestion failed: {message}")]
    IngestFailed { message: String },

    #[error("Failed to connect to API at {base_url}. Make sure the server is running.")]
    Connection { base_url: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// User-facing message for a duplicate base conflict
pub fn duplicate_base_message(existing_job: Option<&ExistingJob>) -> String {
    let named = existing_job.and_then(|job| {
        Some((job.influencer_name.as_deref()?, job.platform.as_deref()?))
    });
    match named {
        Some((influencer, platform)) => format!(
            "This Airtable base is already linked to {}'s {} job. Please create a new base.",
            influencer, platform
        ),
        None => "This Airtable base is already linked to another job. Please create a new base."
            .to_string(),
    }
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::InvalidBaseUrl { .. } => ErrorCode::InvalidBaseUrl,
            AppError::InvalidUsername { .. } => ErrorCode::InvalidUsername,
            AppError::DuplicateAccount { .. } => ErrorCode::DuplicateAccount,
            AppError::MissingTenant => ErrorCode::MissingTenant,
            AppError::TenantMismatch => ErrorCode::TenantMismatch,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::JobNotFound { .. } => ErrorCode::JobNotFound,
            AppError::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            AppError::DuplicateBase { .. } => ErrorCode::DuplicateBase,
            AppError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            AppError::ProvisioningInFlight => ErrorCode::ProvisioningInFlight,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::ScrapeFailed { .. } => ErrorCode::ScrapeFailed,
            AppError::IngestFailed { .. } => ErrorCode::IngestFailed,
            AppError::Connection { .. } => ErrorCode::ApiUnreachable,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::MissingField { .. } |
            AppError::InvalidFormat { .. } |
            AppError::InvalidBaseUrl { .. } |
            AppError::InvalidUsername { .. } |
            AppError::MissingTenant => StatusCode::BAD_REQUEST,

            // 403 Forbidden
            AppError::TenantMismatch => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::JobNotFound { .. } |
            AppError::SessionNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::DuplicateAccount { .. } |
            AppError::DuplicateBase { .. } |
            AppError::InvalidTransition { .. } |
            AppError::ProvisioningInFlight => StatusCode::CONFLICT,

            // 500 Internal Server Error
            AppError::Database(_) |
            AppError::DatabaseConnection { .. } |
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Upstream { .. } |
            AppError::ScrapeFailed { .. } |
            AppError::IngestFailed { .. } |
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Local validation errors are caught before any network call
    pub fn is_local_validation(&self) -> bool {
        matches!(
            self.code().as_code(),
            1000..=1999
        )
    }

    /// Optional structured details attached to the response body
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::DuplicateBase { existing_job: Some(job) } => {
                serde_json::to_value(job).ok().map(|job| serde_json::json!({ "existing_job": job }))
            }
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();
        let details = self.details();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
                request_id: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::JobNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::JobNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Influencer name is required".into(),
            field: Some("influencer".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
        assert!(err.is_local_validation());
    }

    #[test]
    fn test_duplicate_base_is_distinct_conflict() {
        let err = AppError::DuplicateBase {
            existing_job: Some(ExistingJob {
                influencer_name: Some("FitMomGhana".into()),
                platform: Some("instagram".into()),
                job_id: None,
            }),
        };
        assert_eq!(err.code(), ErrorCode::DuplicateBase);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("FitMomGhana's instagram job"));
        assert!(!err.is_local_validation());

        let generic = AppError::DuplicateBase { existing_job: None };
        assert!(generic.to_string().contains("another job"));

        let partial = AppError::DuplicateBase {
            existing_job: Some(ExistingJob {
                influencer_name: Some("Ama".into()),
                platform: None,
                job_id: Some("abc".into()),
            }),
        };
        assert!(partial.to_string().contains("another job"));
        assert_eq!(partial.code(), ErrorCode::DuplicateBase);
    }

    #[test]
    fn test_upstream_errors() {
        let err = AppError::Connection { base_url: "http://localhost:5001".into() };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.to_string().contains("http://localhost:5001"));

        let err = AppError::ScrapeFailed { message: "quota".into() };
        assert_eq!(err.code(), ErrorCode::ScrapeFailed);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into()
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
