//! File document repository: the seam between the registry and whatever
//! document store persists `File` aggregates.

use async_trait::async_trait;
use filevault_core::{AppError, Config, File};
use std::sync::Arc;
use uuid::Uuid;

use super::json::JsonFileRepository;

/// Trait for file document operations
///
/// Stores whole `File` documents (versions embedded) keyed by id. Lookups by
/// display name only consider documents that are not soft-deleted.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Fetch a document by id, deleted or not.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<File>, AppError>;

    /// Fetch the non-deleted document with this exact display name. When
    /// several exist, the oldest one wins.
    async fn find_active_by_name(&self, original_name: &str) -> Result<Option<File>, AppError>;

    /// All non-deleted documents, oldest first.
    async fn list_active(&self) -> Result<Vec<File>, AppError>;

    /// Store a new document. Fails if the id is already taken.
    async fn insert(&self, file: &File) -> Result<(), AppError>;

    /// Replace an existing document. Fails with `NotFound` if it is missing.
    async fn update(&self, file: &File) -> Result<(), AppError>;

    /// Set the soft-delete flag by id. Returns `false` when no document matched.
    async fn set_deleted(&self, id: Uuid, deleted: bool) -> Result<bool, AppError>;
}

/// Pick the oldest of several same-named documents.
pub(crate) fn oldest(files: impl IntoIterator<Item = File>) -> Option<File> {
    files
        .into_iter()
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
}

/// Create the repository described by configuration (a JSON document store
/// under `METADATA_PATH`).
pub async fn create_file_repository(config: &Config) -> Result<Arc<dyn FileRepository>, AppError> {
    tracing::info!(
        metadata_path = %config.metadata_path,
        "Initializing JSON file repository"
    );
    let repo = JsonFileRepository::open(&config.metadata_path).await?;
    Ok(Arc::new(repo))
}
