use std::path::Path;

use filevault_core::{AppError, Config, LogFormat};
use filevault_services::{ByteStream, StorageError};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout stays
/// usable for downloads and JSON output.
pub fn init_tracing(format: LogFormat) {
    if let Err(e) = filevault_infra::init_telemetry(format, None) {
        eprintln!("tracing already initialized: {}", e);
    }
}

/// Configuration rooted at `root` when given, otherwise from the environment.
pub fn load_config(root: Option<&Path>) -> Result<Config, AppError> {
    let config = match root {
        Some(root) => {
            let mut config = Config::from_env().unwrap_or_else(|_| Config::with_root("."));
            let rooted = Config::with_root(&root.display().to_string());
            config.storage_path = rooted.storage_path;
            config.metadata_path = rooted.metadata_path;
            config
        }
        None => Config::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

pub fn parse_file_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidArgument(format!("Invalid file id: {}", raw)))
}

/// Display name for an uploaded path: its final component.
pub fn display_name_for(path: &Path) -> Result<String, AppError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            AppError::InvalidArgument(format!("Not a file path: {}", path.display()))
        })
}

/// MIME type guessed from the file extension.
pub fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
}

/// Open a local file as a byte stream for upload.
pub async fn file_stream(path: &Path) -> Result<ByteStream, AppError> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        AppError::InvalidArgument(format!("Cannot open {}: {}", path.display(), e))
    })?;
    Ok(Box::pin(
        ReaderStream::new(file).map(|chunk| chunk.map_err(StorageError::from)),
    ))
}
