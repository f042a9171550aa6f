//! Error types for the sitescore pipeline.
//!
//! This module provides structured error handling with:
//! - `AppError`: Domain-specific errors, each carrying a stable numeric code
//! - `ApiError`: Serializable wrapper returned across the HTTP boundary
//! - `Result<T>`: Type alias for Results using AppError

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// DOMAIN ERROR TYPE
// ============================================================================

/// Domain-specific errors for analysis operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Page identifier (or other caller input) is out of range
    #[error("{0}")]
    InvalidArgument(String),

    /// No absolute URL could be built for a page/language pair
    #[error("{0}")]
    UrlResolution(String),

    /// The page itself could not be fetched
    #[error("{0}")]
    Fetch(String),

    /// Backend credentials missing or backend selection invalid
    #[error("{0}")]
    Configuration(String),

    /// Scoring backend answered with a non-success status or was unreachable
    #[error("{0}")]
    BackendUnavailable(String),

    /// Scoring backend answered, but not with the expected score/suggestion shape
    #[error("{0}")]
    MalformedResponse(String),

    /// Persistence failure
    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    pub const CODE_INVALID_ARGUMENT: u32 = 1766489924;
    pub const CODE_URL_RESOLUTION: u32 = 1766737582;
    pub const CODE_FETCH: u32 = 1735042810;
    pub const CODE_CONFIGURATION: u32 = 1735042800;
    pub const CODE_BACKEND_UNAVAILABLE: u32 = 1735042801;
    pub const CODE_MALFORMED_RESPONSE: u32 = 1766737581;
    pub const CODE_DATABASE: u32 = 1735042820;

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn url_resolution(msg: impl Into<String>) -> Self {
        Self::UrlResolution(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Stable numeric code reported to API callers alongside the message.
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidArgument(_) => Self::CODE_INVALID_ARGUMENT,
            Self::UrlResolution(_) => Self::CODE_URL_RESOLUTION,
            Self::Fetch(_) => Self::CODE_FETCH,
            Self::Configuration(_) => Self::CODE_CONFIGURATION,
            Self::BackendUnavailable(_) => Self::CODE_BACKEND_UNAVAILABLE,
            Self::MalformedResponse(_) => Self::CODE_MALFORMED_RESPONSE,
            Self::Database(_) => Self::CODE_DATABASE,
        }
    }

    /// Short machine-readable kind, used in logs and batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UrlResolution(_) => "url_resolution",
            Self::Fetch(_) => "fetch",
            Self::Configuration(_) => "configuration",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Database(_) => "database",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database(error.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::Database(error.to_string())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

// ============================================================================
// API ERROR (FOR THE HTTP SURFACE)
// ============================================================================

/// Wrapper for errors returned from API handlers.
/// Serializes to `{success: false, error: "<message> (<code>)", code}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<u32>,
}

#[derive(Serialize)]
struct ApiErrorBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u32>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            code: None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let code = error.code();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{} ({})", error, code),
            code: Some(code),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            success: false,
            error: &self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}
