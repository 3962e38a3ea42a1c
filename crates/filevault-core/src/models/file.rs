use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage::PhysicalMetadata;
use crate::constants::DEFAULT_BACKEND;
use crate::storage_types::StorageType;

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

/// One persisted copy of a file's content plus where it lives.
///
/// `backend` is the adapter name the version is routed through; `storage_type`
/// is the kind of medium that adapter reported when the bytes were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version: u32,
    pub storage_type: StorageType,
    #[serde(default = "default_backend")]
    pub backend: String,
    pub base_path: String,
    pub relative_path: String,
    pub full_path: Option<String>,
    pub filename: String,
    pub mime_type: Option<String>,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl Version {
    fn from_new(version: u32, new: NewVersion) -> Self {
        Version {
            version,
            storage_type: new.location.storage_type,
            backend: new.backend,
            base_path: new.location.base_path,
            relative_path: new.location.relative_path,
            full_path: new.location.full_path,
            filename: new.filename,
            mime_type: new.mime_type,
            size: new.location.size,
            uploaded_at: Utc::now(),
        }
    }

    /// Point this version at a new physical location. Number, filename, MIME
    /// type and size describe the content and stay as they are.
    pub fn relocate(&mut self, backend: &str, location: &PhysicalMetadata) {
        self.backend = backend.to_string();
        self.storage_type = location.storage_type;
        self.base_path = location.base_path.clone();
        self.relative_path = location.relative_path.clone();
        self.full_path = location.full_path.clone();
    }

    pub fn mime_type_or_default(&self) -> &str {
        self.mime_type
            .as_deref()
            .unwrap_or(crate::constants::DEFAULT_MIME_TYPE)
    }
}

/// Everything needed to record a version except its number, which the owning
/// [`File`] assigns.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub backend: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub location: PhysicalMetadata,
}

/// Result of resolving the version a download should serve.
#[derive(Debug, Clone, Copy)]
pub enum CurrentVersion<'a> {
    /// The version whose number equals the current-version pointer.
    Exact(&'a Version),
    /// No version matched the pointer; this is the last recorded one.
    Fallback(&'a Version),
}

impl<'a> CurrentVersion<'a> {
    pub fn version(&self) -> &'a Version {
        match self {
            CurrentVersion::Exact(v) | CurrentVersion::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CurrentVersion::Fallback(_))
    }
}

/// The versioning unit. A file exclusively owns its ordered versions; the
/// first version is numbered 1 and each append advances `current_version` by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: Uuid,
    pub original_name: String,
    pub current_version: u32,
    pub versions: Vec<Version>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Create a file whose only version is number 1.
    pub fn new(original_name: impl Into<String>, first: NewVersion) -> Self {
        let now = Utc::now();
        File {
            id: Uuid::new_v4(),
            original_name: original_name.into(),
            current_version: 1,
            versions: vec![Version::from_new(1, first)],
            tags: Vec::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn next_version_number(&self) -> u32 {
        self.current_version + 1
    }

    /// Append a version and move the pointer to it in one step.
    pub fn append_version(&mut self, new: NewVersion) -> u32 {
        let number = self.next_version_number();
        self.versions.push(Version::from_new(number, new));
        self.current_version = number;
        self.updated_at = Utc::now();
        number
    }

    pub fn version(&self, number: u32) -> Option<&Version> {
        self.versions.iter().find(|v| v.version == number)
    }

    /// The version downloads resolve to, falling back to the last element
    /// when the pointer matches nothing.
    pub fn resolve_current(&self) -> Option<CurrentVersion<'_>> {
        match self.version(self.current_version) {
            Some(v) => Some(CurrentVersion::Exact(v)),
            None => self.versions.last().map(CurrentVersion::Fallback),
        }
    }

    pub fn current_version_mut(&mut self) -> Option<&mut Version> {
        let current = self.current_version;
        self.versions.iter_mut().find(|v| v.version == current)
    }

    pub fn soft_delete(&mut self) {
        self.deleted = true;
        self.updated_at = Utc::now();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
