//! Error types for Omnyla services
//!
//! Only failures the caller must see live here: invalid input, the overall
//! deadline, and unexpected faults. Annotator, registry, and agent failures
//! degrade to fallback data inside the pipeline and never become an `AppError`.

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
    // Validation errors
    ValidationError,
    MissingFile,
    InvalidFileType,
    InvalidForm,
    PayloadTooLarge,

    // Deadline errors
    Timeout,

    // Rate limiting
    RateLimited,

    // Internal errors
    InternalError,
    ConfigurationError,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("No VCF file provided")]
    MissingFile,

    #[error("Invalid file type. Please upload a VCF file.")]
    InvalidFileType { file_name: String },

    #[error("Invalid form submission: {message}")]
    InvalidForm { message: String },

    #[error("File too large. Maximum size is {}.", display_size(.limit))]
    PayloadTooLarge { size: u64, limit: u64 },

    // Deadline
    #[error("Analysis timed out. Please try with a smaller file.")]
    Timeout { timeout_secs: u64 },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Internal errors
    #[error("Analysis failed. Please try again with a valid VCF file.")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingFile => ErrorCode::MissingFile,
            AppError::InvalidFileType { .. } => ErrorCode::InvalidFileType,
            AppError::InvalidForm { .. } => ErrorCode::InvalidForm,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::Timeout { .. } => ErrorCode::Timeout,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::MissingFile |
            AppError::InvalidFileType { .. } |
            AppError::InvalidForm { .. } => StatusCode::BAD_REQUEST,

            // 408 Request Timeout
            AppError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Internal { .. } |
            AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
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
}

/// Error body returned to the dashboard
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = ?self,
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
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Human-readable byte count: whole or one-decimal MB/KB, bytes below 1 KiB
fn display_size(bytes: &u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    let (value, unit) = if *bytes >= MIB {
        (*bytes as f64 / MIB as f64, "MB")
    } else if *bytes >= KIB {
        (*bytes as f64 / KIB as f64, "KB")
    } else {
        return format!("{} bytes", bytes);
    };

    if value.fract() == 0.0 {
        format!("{}{}", value as u64, unit)
    } else {
        format!("{:.1}{}", value, unit)
    }
}
