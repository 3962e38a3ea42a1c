//! Error presentation
//!
//! Converts an `AppError` into the response body a transport layer shows to
//! its caller, using the variant's `ErrorMetadata`.

use filevault_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;

/// Standard error body for transports (CLI JSON output, a future HTTP layer).
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub recoverable: bool,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        // Internal failures keep their detail out of the client message but
        // still surface it in `details` for operators.
        let details = match err.log_level() {
            LogLevel::Error => Some(err.detailed_message()),
            _ => None,
        };
        ErrorResponse {
            error: err.client_message(),
            code: err.error_code(),
            status: err.http_status_code(),
            details,
            recoverable: err.is_recoverable(),
        }
    }
}

/// Log an error at the level its metadata asks for.
pub fn log_error(err: &AppError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code = err.error_code(), error = %err, "Request failed"),
        LogLevel::Warn => tracing::warn!(code = err.error_code(), error = %err, "Request failed"),
        LogLevel::Error => {
            tracing::error!(code = err.error_code(), error = %err.detailed_message(), "Request failed")
        }
    }
}
