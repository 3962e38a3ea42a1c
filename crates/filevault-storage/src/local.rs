use crate::keys::validate_relative_path;
use crate::stream::cancellable;
use crate::traits::{
    ByteStream, NativeMove, StorageAdapter, StorageContent, StorageError, StorageResult,
};
use async_trait::async_trait;
use filevault_core::{PhysicalMetadata, StorageType};
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Local filesystem adapter
///
/// Every relative path is resolved under a root directory fixed at
/// construction. Writes go straight to the final path, so a crash mid-write
/// can leave a truncated file behind; a failed or cancelled write removes what
/// it wrote.
#[derive(Clone, Debug)]
pub struct LocalAdapter {
    root: PathBuf,
    /// Root with symlinks resolved; two adapters over one directory agree on it.
    canonical_root: PathBuf,
    base_path: String,
}

impl LocalAdapter {
    /// Create a new LocalAdapter, creating the root directory if needed.
    ///
    /// # Arguments
    /// * `root` - Root directory for object storage (e.g., "/var/lib/filevault/uploads")
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let canonical_root = fs::canonicalize(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to resolve storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let base_path = root.display().to_string();
        Ok(LocalAdapter {
            root,
            canonical_root,
            base_path,
        })
    }

    /// Resolve a relative path under the root after validating it.
    fn resolve(&self, relative_path: &str) -> StorageResult<PathBuf> {
        validate_relative_path(relative_path)?;
        Ok(self.root.join(relative_path))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn metadata_for(
        &self,
        relative_path: &str,
        path: &Path,
    ) -> StorageResult<PhysicalMetadata> {
        let stats = fs::metadata(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to stat file {}: {}", path.display(), e))
        })?;

        Ok(PhysicalMetadata {
            storage_type: StorageType::Local,
            base_path: self.base_path.clone(),
            relative_path: relative_path.to_string(),
            full_path: Some(path.display().to_string()),
            size: stats.len(),
        })
    }

    /// Write `content` into an already created `file`. The handle is closed
    /// before returning on every path.
    async fn write_content(
        mut file: fs::File,
        path: &Path,
        content: StorageContent,
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        match content {
            StorageContent::Bytes(data) => {
                file.write_all(&data).await.map_err(|e| {
                    StorageError::UploadFailed(format!(
                        "Failed to write file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            }
            StorageContent::Stream(mut stream) => loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(StorageError::Cancelled(format!(
                            "save of {} cancelled",
                            path.display()
                        )));
                    }
                    next = stream.next() => next,
                };
                match next {
                    Some(Ok(chunk)) => file.write_all(&chunk).await.map_err(|e| {
                        StorageError::UploadFailed(format!(
                            "Failed to write stream to file {}: {}",
                            path.display(),
                            e
                        ))
                    })?,
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            },
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for LocalAdapter {
    fn storage_type(&self) -> StorageType {
        StorageType::Local
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn save(
        &self,
        relative_path: &str,
        content: StorageContent,
        cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata> {
        let path = self.resolve(relative_path)?;
        let start = std::time::Instant::now();

        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled(format!(
                "save of {} cancelled",
                relative_path
            )));
        }

        self.ensure_parent_dir(&path).await?;

        // Until the create succeeds nothing at `path` has been touched, so an
        // existing object must survive a failure here.
        let file = fs::File::create(&path).await.map_err(|e| {
            tracing::error!(
                path = %path.display(),
                key = %relative_path,
                error = %e,
                "Local storage save failed"
            );
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        if let Err(e) = Self::write_content(file, &path, content, cancel).await {
            if let Err(cleanup) = fs::remove_file(&path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        path = %path.display(),
                        key = %relative_path,
                        error = %cleanup,
                        "Failed to remove partial file after aborted save"
                    );
                }
            }
            tracing::error!(
                path = %path.display(),
                key = %relative_path,
                error = %e,
                "Local storage save failed"
            );
            return Err(e);
        }

        let metadata = self.metadata_for(relative_path, &path).await?;

        tracing::info!(
            path = %path.display(),
            key = %relative_path,
            size_bytes = metadata.size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage save successful"
        );

        Ok(metadata)
    }

    async fn read_stream(
        &self,
        relative_path: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<ByteStream> {
        let path = self.resolve(relative_path)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(relative_path.to_string()));
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let path_display = path.display().to_string();
        let reader = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    path = %path_display,
                    error = %e,
                    "Local storage stream read error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        tracing::debug!(
            path = %path.display(),
            key = %relative_path,
            "Local storage read stream opened"
        );

        Ok(cancellable(reader, cancel.clone(), relative_path.to_string()))
    }

    async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        let path = self.resolve(relative_path)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    key = %relative_path,
                    "Local storage delete successful"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, relative_path: &str) -> StorageResult<bool> {
        let path = self.resolve(relative_path)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn physical_location(&self, relative_path: &str) -> Option<PathBuf> {
        validate_relative_path(relative_path).ok()?;
        let mut location = self.canonical_root.clone();
        for component in Path::new(relative_path).components() {
            if let Component::Normal(part) = component {
                location.push(part);
            }
        }
        Some(location)
    }

    fn native_move(&self) -> Option<&dyn NativeMove> {
        Some(self)
    }
}

#[async_trait]
impl NativeMove for LocalAdapter {
    /// Rename within the root. Atomic when source and target share a volume.
    async fn move_object(
        &self,
        source: &str,
        target: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata> {
        let source_path = self.resolve(source)?;
        let target_path = self.resolve(target)?;

        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled(format!(
                "move of {} cancelled",
                source
            )));
        }

        self.ensure_parent_dir(&target_path).await?;

        fs::rename(&source_path, &target_path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StorageError::NotFound(source.to_string()),
                _ => StorageError::MoveFailed(format!(
                    "Failed to rename {} to {}: {}",
                    source_path.display(),
                    target_path.display(),
                    e
                )),
            })?;

        tracing::info!(
            from_key = %source,
            to_key = %target,
            from_path = %source_path.display(),
            to_path = %target_path.display(),
            "Local storage move successful"
        );

        self.metadata_for(target, &target_path).await
    }
}
