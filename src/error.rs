//! Error types for cache operations.

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the cache layer can report.
///
/// A cache miss is not an error: `recover` returns `Ok(None)` for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Input could not be turned into a canonical string or a cache payload.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A stored payload does not match the requested type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The store refused the connection. Treated as unrecoverable.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Transient connection failure (I/O, dropped socket, timeout).
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// Operation attempted before `connect` or after `disconnect`/`quit`.
    #[error("cache store is not connected")]
    NotConnected,

    /// Any other failure reported by the backing store.
    #[error("backend error: {0}")]
    BackendError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Source-of-truth read failed in the read-through layer.
    #[error("repository error: {0}")]
    RepositoryError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

impl Error {
    /// True for errors that come from the store connection itself.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::ConnectionRefused(_) | Error::ConnectionError(_))
    }

    /// True when the connection cannot be recovered without a restart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ConnectionRefused(_))
    }

    /// Stable machine-readable code, used in structured log payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Error::SerializationError(_) => "SERIALIZATION",
            Error::DeserializationError(_) => "DESERIALIZATION",
            Error::ConnectionRefused(_) => "ECONNREFUSED",
            Error::ConnectionError(_) => "CONNECTION",
            Error::NotConnected => "NOT_CONNECTED",
            Error::BackendError(_) => "BACKEND",
            Error::ConfigError(_) => "CONFIG",
            Error::RepositoryError(_) => "REPOSITORY",
            Error::ValidationError(_) => "VALIDATION",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

/// Application-level error handed to the HTTP layer.
///
/// Carries a human-readable message, an HTTP-style status code and optional
/// diagnostic details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppError {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Serialize)]
struct CauseDetails<'a> {
    code: &'a str,
    message: String,
}

impl AppError {
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        AppError {
            message: message.into(),
            status,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Error reported when the cache connection fails.
    ///
    /// Status is always 500 and `details` is the JSON string of the cause.
    pub fn cache_connection(cause: &Error) -> Self {
        let details = serde_json::to_string(&CauseDetails {
            code: cause.code(),
            message: cause.to_string(),
        })
        .unwrap_or_else(|_| format!("{{\"code\":\"{}\"}}", cause.code()));

        AppError::new("Cache connection failure", 500).with_details(details)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "[{}] {} ({})", self.status, self.message, details),
            None => write!(f, "[{}] {}", self.status, self.message),
        }
    }
}

impl std::error::Error for AppError {}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        match &e {
            Error::ValidationError(msg) => AppError::new(msg.clone(), 400),
            _ if e.is_connection_error() => AppError::cache_connection(&e),
            _ => AppError::new(e.to_string(), 500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_classification() {
        assert!(Error::ConnectionRefused("x".into()).is_connection_error());
        assert!(Error::ConnectionRefused("x".into()).is_fatal());
        assert!(Error::ConnectionError("x".into()).is_connection_error());
        assert!(!Error::ConnectionError("x".into()).is_fatal());
        assert!(!Error::BackendError("x".into()).is_connection_error());
        assert!(!Error::NotConnected.is_fatal());
    }

    #[test]
    fn test_cache_connection_app_error() {
        let err = AppError::cache_connection(&Error::ConnectionRefused(
            "127.0.0.1:6379".to_string(),
        ));
        assert_eq!(err.status, 500);

        let details: serde_json::Value =
            serde_json::from_str(err.details.as_deref().expect("details missing"))
                .expect("details are not JSON");
        assert_eq!(details["code"], "ECONNREFUSED");
        assert_eq!(details["message"], "connection refused: 127.0.0.1:6379");
    }

    #[test]
    fn test_app_error_from_error() {
        let app: AppError = Error::ValidationError("page must be >= 0".into()).into();
        assert_eq!(app.status, 400);
        assert!(app.details.is_none());

        let app: AppError = Error::BackendError("boom".into()).into();
        assert_eq!(app.status, 500);
        assert_eq!(app.message, "backend error: boom");
    }

    #[test]
    fn test_app_error_display() {
        let app = AppError::new("not found", 404);
        assert_eq!(app.to_string(), "[404] not found");
    }
}
