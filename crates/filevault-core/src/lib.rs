//! Filevault Core Library
//!
//! This crate provides the domain model (files and their versions), error
//! types, and configuration shared across all filevault components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, LogFormat, NamedBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{CurrentVersion, File, NewVersion, PhysicalMetadata, Version};
pub use storage_types::StorageType;
