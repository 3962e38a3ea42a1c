use filevault_core::PhysicalMetadata;
use filevault_storage::ByteStream;
use serde::Serialize;
use uuid::Uuid;

/// Result of an upload: which file received the bytes and under which number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub file_id: Uuid,
    pub version_number: u32,
    /// True when this upload created the file rather than appending to it.
    pub created: bool,
}

/// Where a move left the current version.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub file_id: Uuid,
    pub version_number: u32,
    pub backend: String,
    pub location: PhysicalMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOutcome {
    pub file_id: Uuid,
    pub display_name: String,
    pub location: PhysicalMetadata,
}

/// An open download. Dropping it closes the underlying handle.
pub struct Download {
    pub stream: ByteStream,
    pub mime_type: String,
    pub display_name: String,
    pub version_number: u32,
    pub size: u64,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("mime_type", &self.mime_type)
            .field("display_name", &self.display_name)
            .field("version_number", &self.version_number)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
