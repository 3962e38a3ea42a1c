//! Physical location model: what an adapter reports after persisting bytes.

use serde::{Deserialize, Serialize};

use crate::storage_types::StorageType;

/// Where an adapter put an object, measured after the write completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalMetadata {
    pub storage_type: StorageType,
    /// Backend root (a directory for local adapters).
    pub base_path: String,
    pub relative_path: String,
    /// Fully resolved address, when the backend has one.
    pub full_path: Option<String>,
    pub size: u64,
}
