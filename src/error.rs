//! Application error types

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Transient gateway failure: {0}")]
    TransientGateway(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry at the gateway call site may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::TransientGateway(_) => true,
            AppError::Http(e) => e.is_timeout() || e.is_connect() || e.is_status() || e.is_request(),
            _ => false,
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidParameter(_) => "INVALID_PARAMETER",
            AppError::TransientGateway(_) => "TRANSIENT_GATEWAY",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Gateway(_) => "GATEWAY_ERROR",
            AppError::MalformedRecord(_) => "MALFORMED_RECORD",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Serializable error response for reports and CLI output
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        ErrorResponse::from(&err)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
