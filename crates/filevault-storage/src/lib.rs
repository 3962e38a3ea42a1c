//! Filevault Storage Library
//!
//! This crate provides the storage capability contract, the local filesystem
//! adapter, and the manager that routes operations to named adapters and
//! moves objects between them.
//!
//! # Relative paths
//!
//! Adapters address objects by a path relative to their own root. The pair
//! (backend, relative path) identifies exactly one object. Paths must not be
//! empty, absolute, or contain `..`; validation is centralized in the `keys`
//! module so every backend applies the same rules.

pub mod factory;
pub mod keys;
pub mod local;
pub mod manager;
pub mod stream;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage_manager;
pub use filevault_core::{PhysicalMetadata, StorageType};
pub use local::LocalAdapter;
pub use manager::{normalize_backend_name, StorageManager};
pub use traits::{
    ByteStream, NativeMove, StorageAdapter, StorageContent, StorageError, StorageResult,
};
pub use tokio_util::sync::CancellationToken;
