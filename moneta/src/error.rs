//! Error types and HTTP response conversion
//!
//! Domain code raises typed conditions ([`ValidationError`], [`RepositoryError`],
//! [`Error::ImproperlyConfigured`]). Conversion into an HTTP response happens in
//! exactly one place, [`ErrorTranslator::translate`], which is invoked from the
//! `IntoResponse` impl and again from the [`error_translation`] middleware when
//! debug diagnostics are enabled.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::{RepositoryError, RepositoryErrorKind};
use crate::store::{StoreError, StoreErrorKind};

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed filter, ordering or pagination input
///
/// Raised before any query executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Offending input key, when one can be named
    pub key: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl ValidationError {
    /// Validation failure not tied to a single key
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            key: None,
            message: message.into(),
        }
    }

    /// Validation failure for a specific key
    pub fn for_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            message: message.into(),
        }
    }

    /// A value that could not be coerced to its field type
    pub fn invalid_value(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        let key = key.into();
        let message = format!("Invalid value for {}: {}", key, reason);
        Self::for_key(key, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed client input (422)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A manager or repository bound to a field or entity that does not exist
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// Structured repository failure
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Store failure outside any repository operation (pool setup)
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

/// Externally visible error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed filter or pagination input
    Validation,
    /// Request contradicts itself (identity mismatch)
    BadRequest,
    /// One-row resolution matched nothing
    NotFound,
    /// Store deadline or lock wait exceeded
    Timeout,
    /// Any other store failure, including integrity violations
    InternalStoreError,
    /// Defects outside the store (configuration, I/O)
    Internal,
}

impl ErrorKind {
    /// HTTP status for this kind
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::InternalStoreError | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::InternalStoreError => "INTERNAL_STORE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Error {
    /// Classify into the external taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Repository(e) => match e.kind {
                RepositoryErrorKind::NotFound => ErrorKind::NotFound,
                RepositoryErrorKind::Timeout => ErrorKind::Timeout,
                RepositoryErrorKind::IdentityMismatch => ErrorKind::BadRequest,
                RepositoryErrorKind::MultipleResults | RepositoryErrorKind::StoreFailure => {
                    ErrorKind::InternalStoreError
                }
            },
            Error::Store(e) => match e.kind {
                StoreErrorKind::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::InternalStoreError,
            },
            Error::ImproperlyConfigured(_) | Error::Config(_) | Error::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Client-facing message
    pub detail: String,

    /// Error code
    pub code: String,

    /// HTTP status code
    pub status: u16,

    /// Raw diagnostic, only in debug configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_message: Option<String>,
}

impl ErrorResponse {
    /// Create a response body for a kind
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: kind.code().to_string(),
            status: kind.status().as_u16(),
            debug_message: None,
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Maps crate errors to HTTP error responses
///
/// # Example
///
/// ```rust
/// use moneta::error::{Error, ErrorTranslator};
/// use moneta::repository::RepositoryError;
///
/// let err = Error::from(RepositoryError::not_found("Tag", "7"));
/// let body = ErrorTranslator::new(false).translate(&err);
/// assert_eq!(body.status, 404);
/// assert_eq!(body.detail, "Not Found");
/// assert!(body.debug_message.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator {
    debug: bool,
}

impl ErrorTranslator {
    /// Detail for zero-row resolutions
    pub const NOT_FOUND: &'static str = "Not Found";
    /// Detail for deadline failures
    pub const TIMEOUT: &'static str = "Process timed out";
    /// Detail for other store failures
    pub const STORE_FAILURE: &'static str =
        "Could not connect or perform the operation to the database";
    /// Detail for non-store internal failures
    pub const INTERNAL: &'static str = "Internal server error";

    /// Create a translator
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Whether raw diagnostics are attached
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Translate an error into its response body
    pub fn translate(&self, err: &Error) -> ErrorResponse {
        let kind = err.kind();
        let detail = match (kind, err) {
            (ErrorKind::Validation, Error::Validation(e)) => e.message.clone(),
            (ErrorKind::BadRequest, Error::Repository(e)) => e.message.clone(),
            (ErrorKind::NotFound, _) => Self::NOT_FOUND.to_string(),
            (ErrorKind::Timeout, _) => Self::TIMEOUT.to_string(),
            (ErrorKind::InternalStoreError, _) => Self::STORE_FAILURE.to_string(),
            _ => Self::INTERNAL.to_string(),
        };

        let mut body = ErrorResponse::new(kind, detail);
        if self.debug {
            body.debug_message = Some(err.to_string());
        }
        body
    }
}

/// The original error, carried on a response for the debug middleware
#[derive(Debug, Clone)]
pub struct RawError(pub Arc<Error>);

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match kind {
            ErrorKind::Validation | ErrorKind::BadRequest | ErrorKind::NotFound => {
                tracing::debug!(kind = %kind, "Request failed: {}", self);
            }
            ErrorKind::Timeout => {
                tracing::warn!(kind = %kind, "Request timed out: {}", self);
            }
            ErrorKind::InternalStoreError | ErrorKind::Internal => {
                tracing::error!(kind = %kind, "Request failed: {}", self);
            }
        }

        let mut response = ErrorTranslator::default().translate(&self).into_response();
        response.extensions_mut().insert(RawError(Arc::new(self)));
        response
    }
}

/// Middleware re-rendering error responses with diagnostics in debug mode
///
/// Install with `axum::middleware::from_fn_with_state(translator, error_translation)`.
pub async fn error_translation(
    State(translator): State<ErrorTranslator>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let raw = response.extensions_mut().remove::<RawError>();
    match raw {
        Some(RawError(err)) if translator.is_debug() => translator.translate(&err).into_response(),
        _ => response,
    }
}
