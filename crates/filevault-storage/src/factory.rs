use crate::{LocalAdapter, StorageError, StorageManager, StorageResult};
use filevault_core::Config;
use std::sync::Arc;

/// Build the storage manager described by configuration: the `LOCAL` adapter
/// at `STORAGE_PATH` plus one local adapter per `STORAGE_BACKENDS` entry.
pub async fn create_storage_manager(config: &Config) -> StorageResult<StorageManager> {
    config
        .validate()
        .map_err(|e| StorageError::ConfigError(e.to_string()))?;

    let mut manager = StorageManager::new(&config.storage_path).await?;

    for backend in &config.extra_backends {
        let adapter = LocalAdapter::new(&backend.root).await?;
        manager.register_adapter(&backend.name, Arc::new(adapter));
    }

    tracing::info!(
        backends = ?manager.adapter_names(),
        default_root = %config.storage_path,
        "Storage manager initialized"
    );

    Ok(manager)
}
