//! Telemetry initialization
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` driven by
//! `RUST_LOG` plus a text or JSON formatter selected by `LOG_FORMAT`.

mod init_basic;

pub use init_basic::{init_telemetry, DEFAULT_LOG_FILTER};
