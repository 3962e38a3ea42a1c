//! JSON document store: one `{id}.json` document per file under a directory.
//!
//! Writes go to a uniquely named temporary file that is then renamed over the
//! document, so readers never observe a half-written document.

use async_trait::async_trait;
use filevault_core::{AppError, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::file::{oldest, FileRepository};

const DOCUMENT_EXTENSION: &str = "json";

#[derive(Clone, Debug)]
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    /// Open (creating if needed) a document directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Repository(format!(
                "Failed to create metadata directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    fn document_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, DOCUMENT_EXTENSION))
    }

    async fn read_document(path: &Path) -> Result<Option<File>, AppError> {
        match fs::read(path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Repository(format!(
                "Failed to read document {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_document(&self, file: &File) -> Result<(), AppError> {
        let path = self.document_path(file.id);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", file.id, Uuid::new_v4().simple()));
        let raw = serde_json::to_vec_pretty(file)?;

        if let Err(e) = fs::write(&tmp, &raw).await {
            return Err(AppError::Repository(format!(
                "Failed to write document {}: {}",
                tmp.display(),
                e
            )));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(AppError::Repository(format!(
                "Failed to commit document {}: {}",
                path.display(),
                e
            )));
        }
        Ok(())
    }

    /// Every stored document. Unreadable documents are skipped with a warning.
    async fn load_all(&self) -> Result<Vec<File>, AppError> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| {
            AppError::Repository(format!(
                "Failed to list metadata directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_document = path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION)
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if !is_document {
                continue;
            }
            match Self::read_document(&path).await {
                Ok(Some(file)) => files.push(file),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                }
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl FileRepository for JsonFileRepository {
    #[tracing::instrument(skip(self), fields(db.collection = "files", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<File>, AppError> {
        Self::read_document(&self.document_path(id)).await
    }

    #[tracing::instrument(skip(self), fields(db.collection = "files"))]
    async fn find_active_by_name(&self, original_name: &str) -> Result<Option<File>, AppError> {
        let files = self.load_all().await?;
        Ok(oldest(
            files
                .into_iter()
                .filter(|f| !f.deleted && f.original_name == original_name),
        ))
    }

    #[tracing::instrument(skip(self), fields(db.collection = "files"))]
    async fn list_active(&self) -> Result<Vec<File>, AppError> {
        let mut files: Vec<File> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|f| !f.deleted)
            .collect();
        files.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(files)
    }

    #[tracing::instrument(skip(self, file), fields(db.collection = "files", db.record_id = %file.id))]
    async fn insert(&self, file: &File) -> Result<(), AppError> {
        if fs::try_exists(self.document_path(file.id)).await? {
            return Err(AppError::Repository(format!(
                "File {} already exists",
                file.id
            )));
        }
        self.write_document(file).await
    }

    #[tracing::instrument(skip(self, file), fields(db.collection = "files", db.record_id = %file.id))]
    async fn update(&self, file: &File) -> Result<(), AppError> {
        if !fs::try_exists(self.document_path(file.id)).await? {
            return Err(AppError::NotFound(format!("File {} not found", file.id)));
        }
        self.write_document(file).await
    }

    #[tracing::instrument(skip(self), fields(db.collection = "files", db.record_id = %id))]
    async fn set_deleted(&self, id: Uuid, deleted: bool) -> Result<bool, AppError> {
        match Self::read_document(&self.document_path(id)).await? {
            Some(mut file) => {
                file.deleted = deleted;
                file.touch();
                self.write_document(&file).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
