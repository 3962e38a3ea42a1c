//! Error types module
//!
//! This module provides the error taxonomy shared by the registry and its
//! collaborators. Storage-level failures are converted into `AppError` by the
//! storage crate; document store failures surface as `Repository`.

use std::io;

/// Severity an error should be logged at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes and missing objects
    Debug,
    /// Misconfiguration a caller cannot fix
    Warn,
    /// Storage or metadata failures
    Error,
}

/// How a transport in front of the registry should present an error.
pub trait ErrorMetadata {
    /// Status code an HTTP transport would answer with
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether resubmitting the whole operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Message safe to show the caller; internal detail is withheld
    fn client_message(&self) -> String;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage adapter '{0}' is not registered")]
    AdapterNotRegistered(String),

    #[error("I/O failure: {0}")]
    IoFailure(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error: {message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::IoFailure(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Repository(format!("JSON document error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidArgument(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::InvalidArgument(_) => (400, "INVALID_ARGUMENT", false, LogLevel::Debug),
        AppError::AdapterNotRegistered(_) => {
            (400, "ADAPTER_NOT_REGISTERED", false, LogLevel::Warn)
        }
        AppError::IoFailure(_) => (500, "IO_FAILURE", true, LogLevel::Error),
        AppError::Cancelled(_) => (499, "CANCELLED", true, LogLevel::Debug),
        AppError::Repository(_) => (500, "REPOSITORY_ERROR", true, LogLevel::Error),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", true, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Display text followed by up to five levels of `source()` causes.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::InvalidArgument(ref msg) => msg.clone(),
            AppError::AdapterNotRegistered(ref name) => {
                format!("Storage backend '{}' is not available", name)
            }
            AppError::IoFailure(_) => "Failed to access storage".to_string(),
            AppError::Cancelled(_) => "Operation was cancelled".to_string(),
            AppError::Repository(_) => "Failed to access file metadata".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("File not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "File not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_adapter_not_registered() {
        let err = AppError::AdapterNotRegistered("CLOUD".to_string());
        assert_eq!(err.error_code(), "ADAPTER_NOT_REGISTERED");
        assert!(err.client_message().contains("CLOUD"));
    }

    #[test]
    fn test_io_failure_hides_details() {
        let err = AppError::from(io::Error::new(io::ErrorKind::Other, "disk full at /data"));
        assert_eq!(err.error_code(), "IO_FAILURE");
        assert!(err.is_recoverable());
        assert!(!err.client_message().contains("/data"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_detailed_message_includes_source() {
        let err = AppError::from(anyhow::anyhow!("outer").context("wrapped"));
        let details = err.detailed_message();
        assert!(details.contains("wrapped"));
    }
}
