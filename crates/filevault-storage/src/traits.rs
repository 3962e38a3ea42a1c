//! Storage abstraction traits
//!
//! This module defines the capability contract every storage backend must
//! satisfy. Adapters only move raw bytes addressed by a relative path; they
//! know nothing about files or versions.

use async_trait::async_trait;
use bytes::Bytes;
use filevault_core::{AppError, PhysicalMetadata, StorageType};
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Move failed: {0}")]
    MoveFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage adapter '{0}' is not registered")]
    AdapterNotRegistered(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A stream of byte chunks read from a backend. Dropping it releases the
/// underlying handle.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Content handed to [`StorageAdapter::save`].
pub enum StorageContent {
    /// A buffer already held in memory.
    Bytes(Bytes),
    /// A stream consumed chunk by chunk; nothing is buffered beyond one chunk.
    Stream(ByteStream),
}

impl From<Bytes> for StorageContent {
    fn from(data: Bytes) -> Self {
        StorageContent::Bytes(data)
    }
}

impl From<Vec<u8>> for StorageContent {
    fn from(data: Vec<u8>) -> Self {
        StorageContent::Bytes(Bytes::from(data))
    }
}

impl From<&'static [u8]> for StorageContent {
    fn from(data: &'static [u8]) -> Self {
        StorageContent::Bytes(Bytes::from_static(data))
    }
}

impl From<String> for StorageContent {
    fn from(text: String) -> Self {
        StorageContent::Bytes(Bytes::from(text))
    }
}

impl From<ByteStream> for StorageContent {
    fn from(stream: ByteStream) -> Self {
        StorageContent::Stream(stream)
    }
}

/// Storage capability contract
///
/// Every backend (local directory today; network shares and object stores
/// later) implements this trait, which lets the manager and the registry work
/// with any backend without knowing its internals.
///
/// **Paths:** all operations take a path relative to the adapter's root. Paths
/// that are empty, absolute, or contain `..` are rejected with `InvalidKey`.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Kind of medium this adapter writes to.
    fn storage_type(&self) -> StorageType;

    /// Backend root reference recorded on every version.
    fn base_path(&self) -> &str;

    /// Persist `content` at `relative_path`, creating any missing parent
    /// structure. An existing object is overwritten without warning.
    ///
    /// The returned size is measured after the write, not taken from the caller.
    async fn save(
        &self,
        relative_path: &str,
        content: StorageContent,
        cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata>;

    /// Open a read stream. Fails with `NotFound` when the object is missing.
    ///
    /// The stream yields `Cancelled` once `cancel` fires.
    async fn read_stream(
        &self,
        relative_path: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<ByteStream>;

    /// Remove an object. Succeeds when the object is already absent.
    async fn delete(&self, relative_path: &str) -> StorageResult<()>;

    /// Whether an object exists. Absence is `Ok(false)`, never an error.
    async fn exists(&self, relative_path: &str) -> StorageResult<bool>;

    /// Where `relative_path` physically lives, when the backend can name it.
    ///
    /// Two adapters returning the same location address the same object, even
    /// when they are registered under different names.
    fn physical_location(&self, _relative_path: &str) -> Option<PathBuf> {
        None
    }

    /// Backend-local relocation, when the backend has one.
    ///
    /// `None` tells the manager to fall back to read, write, then delete.
    fn native_move(&self) -> Option<&dyn NativeMove> {
        None
    }
}

/// Backend-local rename. Implementations create the target's parent
/// structure before moving.
#[async_trait]
pub trait NativeMove: Send + Sync {
    async fn move_object(
        &self,
        source: &str,
        target: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata>;
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object not found: {}", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidArgument(msg),
            StorageError::AdapterNotRegistered(name) => AppError::AdapterNotRegistered(name),
            StorageError::Cancelled(msg) => AppError::Cancelled(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::IoFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_onto_app_taxonomy() {
        assert!(matches!(
            AppError::from(StorageError::NotFound("a.txt".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(StorageError::AdapterNotRegistered("CLOUD".into())),
            AppError::AdapterNotRegistered(name) if name == "CLOUD"
        ));
        assert!(matches!(
            AppError::from(StorageError::InvalidKey("..".into())),
            AppError::InvalidArgument(_)
        ));
        assert!(matches!(
            AppError::from(StorageError::UploadFailed("disk full".into())),
            AppError::IoFailure(_)
        ));
        assert!(matches!(
            AppError::from(StorageError::Cancelled("save".into())),
            AppError::Cancelled(_)
        ));
    }
}
