//! Filevault Infrastructure Library
//!
//! Shared infrastructure used by filevault binaries:
//! - Telemetry initialization (tracing subscriber, text or JSON output)
//! - Error presentation for transports

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, DEFAULT_LOG_FILTER};

pub use error::{log_error, ErrorResponse};
