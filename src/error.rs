//! Error handling module
//!
//! Provides unified error types for the analyser engine and the HTTP surface.

use crate::analyser::model::{ObjectIdentity, SchemaSnapshot};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Catalog query execution failed (network, auth, incompatible SQL, timeout).
    #[error("Connection error: {0}")]
    Connection(String),

    /// A query was requested that the active dialect does not provide.
    #[error("Query '{0}' is not supported by dialect '{1}'")]
    UnsupportedQuery(String, String),

    #[error("Refresh aborted with {} object(s) not re-analysed: {}", .0.pending.len(), .0.reason)]
    PartialRefresh(Box<PartialRefresh>),

    #[error("Invalid object identity: {0}")]
    InvalidIdentity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Payload of an aborted refresh.
///
/// `snapshot` holds every change merged before the abort; `pending` lists the
/// identities that still need a targeted re-analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRefresh {
    pub snapshot: SchemaSnapshot,
    pub pending: Vec<ObjectIdentity>,
    pub reason: String,
}

impl From<tokio_postgres::Error> for AppError {
    fn from(e: tokio_postgres::Error) -> Self {
        AppError::Connection(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        AppError::Connection(format!("Pool error: {}", e))
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialRefresh>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match &self {
            AppError::Connection(msg) => {
                error!("Connection error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "CONNECTION_ERROR",
                    "Catalog query failed".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::UnsupportedQuery(_, _) => {
                error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UNSUPPORTED_QUERY",
                    self.to_string(),
                    None,
                )
            }
            AppError::PartialRefresh(partial) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PARTIAL_REFRESH",
                self.to_string(),
                Some(partial.reason.clone()),
            ),
            AppError::InvalidIdentity(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_IDENTITY",
                msg.clone(),
                None,
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                None,
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                None,
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Config(msg) => {
                error!("Configuration error: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    "CONFIG_ERROR",
                    "A configuration error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let partial = match self {
            AppError::PartialRefresh(partial) => Some(*partial),
            _ => None,
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(error_code.to_string()),
            partial,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}
