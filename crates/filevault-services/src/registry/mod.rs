//! Versioned file registry
//!
//! Stitches adapter results into `File` documents: uploads create a file or
//! append a version to the non-deleted file with the same display name,
//! moves relocate the current version in place, and copies start a new,
//! independent file at version 1.
//!
//! Create-or-append, moves and soft deletes are serialized per display name
//! inside this process.
//! Two processes sharing one document store can still both observe "no such
//! file" for a new name and each create one.

mod locks;
mod types;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use filevault_core::constants::{COPY_NAME_PREFIX, DEFAULT_BACKEND, TEXT_MIME_TYPE};
use filevault_core::{AppError, Config, File, NewVersion, Version};
use filevault_db::{create_file_repository, FileRepository};
use filevault_storage::keys::{file_name, stored_filename};
use filevault_storage::{
    create_storage_manager, normalize_backend_name, CancellationToken, StorageContent,
    StorageManager,
};
use uuid::Uuid;

use locks::NameLocks;
pub use types::{CopyOutcome, Download, MoveOutcome, UploadOutcome};

/// Entry point for every file operation.
pub struct FileRegistry {
    storage: Arc<StorageManager>,
    files: Arc<dyn FileRepository>,
    name_locks: NameLocks,
}

impl FileRegistry {
    pub fn new(storage: Arc<StorageManager>, files: Arc<dyn FileRepository>) -> Self {
        Self {
            storage,
            files,
            name_locks: NameLocks::default(),
        }
    }

    /// Build the storage manager and document store described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let storage = create_storage_manager(config).await?;
        let files = create_file_repository(config).await?;
        Ok(Self::new(Arc::new(storage), files))
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    /// Store `content` under `display_name`. Creates the file on first upload;
    /// afterwards appends a version to the non-deleted file of that name.
    #[tracing::instrument(skip(self, content, cancel))]
    pub async fn upload(
        &self,
        display_name: &str,
        content: StorageContent,
        mime_type: Option<String>,
        backend: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, AppError> {
        if display_name.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "Display name must not be empty".to_string(),
            ));
        }
        let backend = normalize_backend_name(backend.unwrap_or(DEFAULT_BACKEND));
        let adapter = self.storage.get_adapter(&backend)?;
        let stored_name = stored_filename(display_name, Utc::now().timestamp_millis());

        let _guard = self.name_locks.lock(display_name).await;

        let start = Instant::now();
        let location = adapter.save(&stored_name, content, cancel).await?;
        let new_version = NewVersion {
            backend: backend.clone(),
            filename: stored_name,
            mime_type,
            location,
        };

        let outcome = match self.files.find_active_by_name(display_name).await? {
            Some(mut file) => {
                let number = file.append_version(new_version);
                self.persist(&file, false).await?;
                UploadOutcome {
                    file_id: file.id,
                    version_number: number,
                    created: false,
                }
            }
            None => {
                let file = File::new(display_name, new_version);
                self.persist(&file, true).await?;
                UploadOutcome {
                    file_id: file.id,
                    version_number: file.current_version,
                    created: true,
                }
            }
        };

        tracing::info!(
            file_id = %outcome.file_id,
            version = outcome.version_number,
            created = outcome.created,
            duration_ms = start.elapsed().as_millis() as u64,
            "Upload recorded"
        );

        Ok(outcome)
    }

    /// Append a version to an exact file, bypassing display-name lookup.
    #[tracing::instrument(skip(self, content, cancel))]
    pub async fn upload_version(
        &self,
        file_id: Uuid,
        filename: &str,
        content: StorageContent,
        mime_type: Option<String>,
        backend: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, AppError> {
        let backend = normalize_backend_name(backend.unwrap_or(DEFAULT_BACKEND));
        let adapter = self.storage.get_adapter(&backend)?;

        let name = self.load_active(file_id).await?.original_name;
        let _guard = self.name_locks.lock(&name).await;
        let mut file = self.load_active(file_id).await?;

        let stored_name = stored_filename(filename, Utc::now().timestamp_millis());
        let location = adapter.save(&stored_name, content, cancel).await?;
        let number = file.append_version(NewVersion {
            backend,
            filename: stored_name,
            mime_type,
            location,
        });
        self.persist(&file, false).await?;

        tracing::info!(file_id = %file.id, version = number, "Version appended");

        Ok(UploadOutcome {
            file_id: file.id,
            version_number: number,
            created: false,
        })
    }

    /// Store edited text under `display_name` through the regular upload path.
    pub async fn save_content(
        &self,
        display_name: &str,
        text: String,
        backend: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, AppError> {
        self.upload(
            display_name,
            StorageContent::Bytes(Bytes::from(text)),
            Some(TEXT_MIME_TYPE.to_string()),
            backend,
            cancel,
        )
        .await
    }

    /// Open the current version of a non-deleted file.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn download(
        &self,
        file_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Download, AppError> {
        let file = self.load_active(file_id).await?;
        let current = file.resolve_current().ok_or_else(|| no_versions(file_id))?;
        if current.is_fallback() {
            tracing::warn!(
                file_id = %file_id,
                current_version = file.current_version,
                served_version = current.version().version,
                "Current version pointer matches no version; serving the last one"
            );
        }
        self.open(&file, current.version(), cancel).await
    }

    /// Open a specific version of a non-deleted file.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn download_version(
        &self,
        file_id: Uuid,
        version: u32,
        cancel: &CancellationToken,
    ) -> Result<Download, AppError> {
        let file = self.load_active(file_id).await?;
        let found = file.version(version).ok_or_else(|| {
            AppError::NotFound(format!("Version {} of file {} not found", version, file_id))
        })?;
        self.open(&file, found, cancel).await
    }

    /// Non-deleted files, oldest first.
    pub async fn list_files(&self) -> Result<Vec<File>, AppError> {
        self.files.list_active().await
    }

    /// A file by id, including soft-deleted ones.
    pub async fn get_file(&self, file_id: Uuid) -> Result<File, AppError> {
        self.files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| file_not_found(file_id))
    }

    /// Version history of a file. Soft-deleted files still answer.
    pub async fn list_versions(&self, file_id: Uuid) -> Result<Vec<Version>, AppError> {
        Ok(self.get_file(file_id).await?.versions)
    }

    /// Relocate the current version's bytes and rewrite its location in place.
    ///
    /// If the storage move fails the document is left untouched, which keeps
    /// it pointing at the source: either the source is intact, or (failed
    /// source delete) both copies exist.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn move_file(
        &self,
        file_id: Uuid,
        target_backend: &str,
        target_path: &str,
        cancel: &CancellationToken,
    ) -> Result<MoveOutcome, AppError> {
        require_target(target_backend, target_path)?;
        let target_backend = normalize_backend_name(target_backend);

        let name = self.load_active(file_id).await?.original_name;
        let _guard = self.name_locks.lock(&name).await;
        let mut file = self.load_active(file_id).await?;
        let current = file
            .resolve_current()
            .ok_or_else(|| no_versions(file_id))?
            .version()
            .clone();

        let location = self
            .storage
            .move_file(
                &current.backend,
                &current.relative_path,
                &target_backend,
                target_path,
                cancel,
            )
            .await?;

        if let Some(version) = file
            .versions
            .iter_mut()
            .find(|v| v.version == current.version)
        {
            version.relocate(&target_backend, &location);
        }
        file.touch();

        if let Err(e) = self.files.update(&file).await {
            tracing::error!(
                file_id = %file_id,
                version = current.version,
                old_backend = %current.backend,
                old_path = %current.relative_path,
                new_backend = %target_backend,
                new_path = %location.relative_path,
                error = %e,
                "Bytes moved but the document still records the old location"
            );
            return Err(e);
        }

        tracing::info!(
            file_id = %file_id,
            version = current.version,
            backend = %target_backend,
            path = %location.relative_path,
            "Current version moved"
        );

        Ok(MoveOutcome {
            file_id,
            version_number: current.version,
            backend: target_backend,
            location,
        })
    }

    /// Copy the current version to a new location as a brand-new file.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn copy_file(
        &self,
        file_id: Uuid,
        target_backend: &str,
        target_path: &str,
        new_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<CopyOutcome, AppError> {
        require_target(target_backend, target_path)?;
        let target_backend = normalize_backend_name(target_backend);

        let source = self.load_active(file_id).await?;
        let current = source
            .resolve_current()
            .ok_or_else(|| no_versions(file_id))?
            .version();

        let location = self
            .storage
            .copy_file(
                &current.backend,
                &current.relative_path,
                &target_backend,
                target_path,
                cancel,
            )
            .await?;

        let display_name = match new_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("{}{}", COPY_NAME_PREFIX, source.original_name),
        };
        let copy = File::new(
            display_name.clone(),
            NewVersion {
                backend: target_backend,
                filename: file_name(&location.relative_path).to_string(),
                mime_type: current.mime_type.clone(),
                location: location.clone(),
            },
        );
        self.persist(&copy, true).await?;

        tracing::info!(
            source_id = %file_id,
            file_id = %copy.id,
            display_name = %display_name,
            size_bytes = location.size,
            "File copied"
        );

        Ok(CopyOutcome {
            file_id: copy.id,
            display_name,
            location,
        })
    }

    /// Hide a file from listings. Versions and stored bytes are kept.
    ///
    /// Takes the display-name lock so an append or move that loaded the
    /// document earlier cannot write it back with `deleted` cleared.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, file_id: Uuid) -> Result<(), AppError> {
        let name = self.get_file(file_id).await?.original_name;
        let _guard = self.name_locks.lock(&name).await;
        if !self.files.set_deleted(file_id, true).await? {
            return Err(file_not_found(file_id));
        }
        tracing::info!(file_id = %file_id, "File soft-deleted");
        Ok(())
    }

    async fn load_active(&self, file_id: Uuid) -> Result<File, AppError> {
        match self.files.find_by_id(file_id).await? {
            Some(file) if !file.deleted => Ok(file),
            _ => Err(file_not_found(file_id)),
        }
    }

    async fn open(
        &self,
        file: &File,
        version: &Version,
        cancel: &CancellationToken,
    ) -> Result<Download, AppError> {
        let adapter = self.storage.get_adapter(&version.backend)?;
        let stream = adapter.read_stream(&version.relative_path, cancel).await?;
        Ok(Download {
            stream,
            mime_type: version.mime_type_or_default().to_string(),
            display_name: file.original_name.clone(),
            version_number: version.version,
            size: version.size,
        })
    }

    /// Write the document. A failure here leaves the just-saved bytes
    /// unreferenced, which is logged for reconciliation.
    async fn persist(&self, file: &File, is_new: bool) -> Result<(), AppError> {
        let result = if is_new {
            self.files.insert(file).await
        } else {
            self.files.update(file).await
        };
        if let Err(e) = &result {
            tracing::error!(
                file_id = %file.id,
                current_version = file.current_version,
                error = %e,
                "Failed to persist file document; stored bytes are unreferenced"
            );
        }
        result
    }
}

fn require_target(target_backend: &str, target_path: &str) -> Result<(), AppError> {
    if target_backend.trim().is_empty() || target_path.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "Target backend and target path are required".to_string(),
        ));
    }
    Ok(())
}

fn file_not_found(file_id: Uuid) -> AppError {
    AppError::NotFound(format!("File {} not found", file_id))
}

fn no_versions(file_id: Uuid) -> AppError {
    AppError::NotFound(format!("File {} has no versions", file_id))
}
