//! Error types for schema-mock

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::ValidationFailure;

/// Result type alias for mock server operations
pub type MockResult<T> = Result<T, MockError>;

/// Main error type for schema-mock
#[derive(Error, Debug, Clone)]
pub enum MockError {
    // Construction / registration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        param: Option<String>,
    },

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    // Schema compilation
    #[error("Unresolvable $ref: {pointer}")]
    RefResolution { pointer: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    // Strict mode
    #[error("Validation failed at '{}': expected {}", .0.path, .0.expected)]
    Validation(ValidationFailure),

    // Lifecycle
    #[error("Port {port} is already in use")]
    PortInUse { port: u16 },

    #[error("Server is not running")]
    NotRunning,

    // Per-request errors
    #[error("Handler error: {0}")]
    Handler(String),

    #[error("{message}")]
    Injected { status_code: u16, message: String },

    #[error("Route not found: {method} {path}")]
    NotFound { method: String, path: String },

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MockError {
    /// Shorthand for a configuration error naming the offending field
    pub fn config(message: impl Into<String>, param: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            param: Some(param.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config { .. } | Self::UnsupportedMethod(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RefResolution { .. } | Self::InvalidSchema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::PortInUse { .. } | Self::NotRunning => StatusCode::SERVICE_UNAVAILABLE,
            Self::Handler(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Injected { status_code, .. } => {
                StatusCode::from_u16(*status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Error kind reported in the `error` field of the envelope
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigurationError",
            Self::UnsupportedMethod(_) => "ConfigurationError",
            Self::RefResolution { .. } => "RefResolutionError",
            Self::InvalidSchema(_) => "SchemaError",
            Self::Validation(_) => "ValidationError",
            Self::PortInUse { .. } => "PortInUseError",
            Self::NotRunning => "NotRunningError",
            Self::Handler(_) => "HandlerError",
            Self::Injected { .. } => "ScenarioError",
            Self::NotFound { .. } => "NotFound",
            Self::InvalidBody(_) => "InvalidBodyError",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        let response = ErrorResponse::new(self.kind(), &self.to_string());

        match self {
            Self::Validation(failure) => response.with_details(serde_json::json!({
                "field": failure.path,
                "expected": failure.expected,
                "actual": failure.actual,
            })),
            Self::Injected { status_code, .. } => {
                response.with_details(serde_json::json!({ "status": status_code }))
            }
            _ => response,
        }
    }
}

/// Standard error envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(kind: &str, message: &str) -> Self {
        Self {
            success: false,
            error: kind.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_error_response())).into_response()
    }
}

impl From<std::io::Error> for MockError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for MockError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidBody(err.to_string())
    }
}
