//! Storage manager: a name-keyed registry of adapters plus the transfer
//! protocol between them.
//!
//! # Transfer failure policy
//!
//! Moves between two different adapters run as read-stream, save, then delete
//! source. There is no rollback:
//!
//! - if the source cannot be opened, nothing is written;
//! - if the target save fails partway, the source is untouched and the target
//!   may hold an orphaned partial object that is left for out-of-band cleanup;
//! - if the save succeeds but deleting the source fails, the object exists in
//!   both places and the error is returned.
//!
//! Whatever happens, the bytes are never gone from both backends.

use std::collections::HashMap;
use std::sync::Arc;

use filevault_core::constants::DEFAULT_BACKEND;
use filevault_core::PhysicalMetadata;
use tokio_util::sync::CancellationToken;

use crate::local::LocalAdapter;
use crate::traits::{StorageAdapter, StorageContent, StorageError, StorageResult};

/// Normalize a backend name for lookup. Names are case-insensitive.
pub fn normalize_backend_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Registry of named adapters. Built once at startup and shared by reference;
/// it holds no file state.
#[derive(Clone)]
pub struct StorageManager {
    adapters: HashMap<String, Arc<dyn StorageAdapter>>,
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("adapters", &self.adapter_names())
            .finish()
    }
}

impl StorageManager {
    /// Create a manager whose `LOCAL` adapter is rooted at `default_root`.
    pub async fn new(default_root: impl Into<std::path::PathBuf>) -> StorageResult<Self> {
        let local = LocalAdapter::new(default_root).await?;
        Ok(Self::with_default_adapter(Arc::new(local)))
    }

    /// Create a manager around an already-built default adapter.
    pub fn with_default_adapter(adapter: Arc<dyn StorageAdapter>) -> Self {
        let mut adapters: HashMap<String, Arc<dyn StorageAdapter>> = HashMap::new();
        adapters.insert(DEFAULT_BACKEND.to_string(), adapter);
        StorageManager { adapters }
    }

    /// Register (or replace) the adapter for `name`.
    pub fn register_adapter(&mut self, name: &str, adapter: Arc<dyn StorageAdapter>) {
        let name = normalize_backend_name(name);
        tracing::info!(
            backend = %name,
            storage_type = %adapter.storage_type(),
            base_path = %adapter.base_path(),
            "Registering storage adapter"
        );
        if self.adapters.insert(name.clone(), adapter).is_some() {
            tracing::warn!(backend = %name, "Replaced previously registered storage adapter");
        }
    }

    /// Resolve an adapter by name. Unknown names are a hard error.
    pub fn get_adapter(&self, name: &str) -> StorageResult<Arc<dyn StorageAdapter>> {
        let key = normalize_backend_name(name);
        self.adapters
            .get(&key)
            .cloned()
            .ok_or(StorageError::AdapterNotRegistered(key))
    }

    /// Registered backend names, sorted.
    pub fn adapter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Move an object between (possibly different) backends.
    ///
    /// When both names resolve to the same adapter instance and it supports a
    /// native move, that is used. Otherwise the object is streamed from source
    /// to target and the source is deleted only after the save succeeded. See
    /// the module docs for the failure states this can leave behind.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn move_file(
        &self,
        source_backend: &str,
        source_path: &str,
        target_backend: &str,
        target_path: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata> {
        let source = self.get_adapter(source_backend)?;
        let target = self.get_adapter(target_backend)?;
        ensure_distinct(&source, source_path, &target, target_path)?;
        let same_adapter = Arc::ptr_eq(&source, &target);

        if same_adapter {
            if let Some(mover) = source.native_move() {
                return mover.move_object(source_path, target_path, cancel).await;
            }
        }

        let metadata = self
            .transfer(&source, source_path, &target, target_path, cancel)
            .await?;

        if let Err(e) = source.delete(source_path).await {
            tracing::warn!(
                source_backend = %source_backend,
                source_path = %source_path,
                target_backend = %target_backend,
                target_path = %target_path,
                error = %e,
                "Source delete failed after successful transfer; object now exists in both backends"
            );
            return Err(e);
        }

        tracing::info!(
            source_backend = %source_backend,
            target_backend = %target_backend,
            size_bytes = metadata.size,
            "Cross-backend move complete"
        );

        Ok(metadata)
    }

    /// Stream an object to another location without touching the source.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn copy_file(
        &self,
        source_backend: &str,
        source_path: &str,
        target_backend: &str,
        target_path: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata> {
        let source = self.get_adapter(source_backend)?;
        let target = self.get_adapter(target_backend)?;
        ensure_distinct(&source, source_path, &target, target_path)?;

        self.transfer(&source, source_path, &target, target_path, cancel)
            .await
    }

    /// Pipe the source stream straight into the target's save. The read
    /// stream is owned by the save call and dropped when it returns, on
    /// success and failure alike.
    async fn transfer(
        &self,
        source: &Arc<dyn StorageAdapter>,
        source_path: &str,
        target: &Arc<dyn StorageAdapter>,
        target_path: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata> {
        let stream = source.read_stream(source_path, cancel).await?;

        target
            .save(target_path, StorageContent::Stream(stream), cancel)
            .await
            .map_err(|e| {
                tracing::warn!(
                    source_path = %source_path,
                    target_path = %target_path,
                    target_base = %target.base_path(),
                    error = %e,
                    "Transfer to target failed; source left intact, target may hold a partial object"
                );
                e
            })
    }
}

/// Refuse transfers whose source and target are one object. Streaming a file
/// onto itself truncates it before it is read, and the source delete would
/// then remove the only copy.
fn ensure_distinct(
    source: &Arc<dyn StorageAdapter>,
    source_path: &str,
    target: &Arc<dyn StorageAdapter>,
    target_path: &str,
) -> StorageResult<()> {
    let same_object = (Arc::ptr_eq(source, target) && source_path == target_path)
        || matches!(
            (source.physical_location(source_path), target.physical_location(target_path)),
            (Some(a), Some(b)) if a == b
        );

    if same_object {
        return Err(StorageError::InvalidKey(format!(
            "Source and target are the same object: {}",
            source_path
        )));
    }
    Ok(())
}
