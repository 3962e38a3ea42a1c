//! In-memory file repository, for tests and embedding.

use async_trait::async_trait;
use filevault_core::{AppError, File};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::file::{oldest, FileRepository};

#[derive(Default)]
pub struct InMemoryFileRepository {
    files: RwLock<HashMap<Uuid, File>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<File>, AppError> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn find_active_by_name(&self, original_name: &str) -> Result<Option<File>, AppError> {
        let files = self.files.read().await;
        Ok(oldest(
            files
                .values()
                .filter(|f| !f.deleted && f.original_name == original_name)
                .cloned(),
        ))
    }

    async fn list_active(&self) -> Result<Vec<File>, AppError> {
        let files = self.files.read().await;
        let mut active: Vec<File> = files.values().filter(|f| !f.deleted).cloned().collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn insert(&self, file: &File) -> Result<(), AppError> {
        let mut files = self.files.write().await;
        if files.contains_key(&file.id) {
            return Err(AppError::Repository(format!(
                "File {} already exists",
                file.id
            )));
        }
        files.insert(file.id, file.clone());
        Ok(())
    }

    async fn update(&self, file: &File) -> Result<(), AppError> {
        let mut files = self.files.write().await;
        match files.get_mut(&file.id) {
            Some(existing) => {
                *existing = file.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("File {} not found", file.id))),
        }
    }

    async fn set_deleted(&self, id: Uuid, deleted: bool) -> Result<bool, AppError> {
        let mut files = self.files.write().await;
        match files.get_mut(&id) {
            Some(file) => {
                file.deleted = deleted;
                file.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
