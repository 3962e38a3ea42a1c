//! Filevault Services Layer
//!
//! This crate is the **business service layer**: the versioned file registry
//! that coordinates the storage manager and the document store. Transport
//! layers (the CLI today) should depend on this facade only.

pub mod registry;

pub use filevault_db::{FileRepository, InMemoryFileRepository, JsonFileRepository};
pub use filevault_storage::{
    ByteStream, CancellationToken, LocalAdapter, StorageAdapter, StorageContent, StorageError,
    StorageManager, StorageResult,
};
pub use registry::{CopyOutcome, Download, FileRegistry, MoveOutcome, UploadOutcome};
