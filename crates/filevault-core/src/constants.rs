//! Constants shared across filevault crates.

/// Name of the adapter that is always registered with the storage manager.
pub const DEFAULT_BACKEND: &str = "LOCAL";

/// Root directory of the default adapter when `STORAGE_PATH` is unset.
pub const DEFAULT_STORAGE_PATH: &str = "uploads";

/// Directory of the JSON document store when `METADATA_PATH` is unset.
pub const DEFAULT_METADATA_PATH: &str = "data/files";

/// MIME type reported for versions uploaded without one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// MIME type recorded for text saved through `save_content`.
pub const TEXT_MIME_TYPE: &str = "text/plain; charset=utf-8";

/// Display-name prefix used when a copy is made without an explicit name.
pub const COPY_NAME_PREFIX: &str = "Copy of ";
