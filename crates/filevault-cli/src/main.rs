//! Filevault CLI: drive the versioned file registry from the shell.
//!
//! Storage roots and the metadata directory come from STORAGE_PATH,
//! STORAGE_BACKENDS and METADATA_PATH, or from `--root`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use filevault_cli::{
    display_name_for, file_stream, guess_mime, init_tracing, load_config, parse_file_id,
};
use filevault_core::AppError;
use filevault_infra::{log_error, ErrorResponse};
use filevault_services::{CancellationToken, Download, FileRegistry, StorageContent};
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "filevault", about = "Versioned file registry over pluggable storage backends")]
struct Cli {
    /// Base directory holding `uploads/` and `data/files/` (overrides STORAGE_PATH and METADATA_PATH)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file; re-uploading the same name adds a version
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Backend to store the bytes in
        #[arg(long)]
        backend: Option<String>,
        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Add a version to an exact file id
    AddVersion {
        /// File UUID
        id: String,
        /// Path to the new content
        file: PathBuf,
        #[arg(long)]
        backend: Option<String>,
        #[arg(long)]
        mime: Option<String>,
    },
    /// Save text as a new version of a file (reads stdin when --text is omitted)
    Save {
        /// Display name
        name: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        backend: Option<String>,
    },
    /// Download the current (or a specific) version
    Download {
        /// File UUID
        id: String,
        /// Version number
        #[arg(long)]
        version: Option<u32>,
        /// Output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List files that are not deleted
    List,
    /// Show one file, deleted or not
    Get {
        /// File UUID
        id: String,
    },
    /// List the versions of a file
    Versions {
        /// File UUID
        id: String,
    },
    /// Move the current version to another backend/path
    Move {
        /// File UUID
        id: String,
        /// Target backend name
        backend: String,
        /// Target path relative to the backend root
        path: String,
    },
    /// Copy the current version into a new file
    Copy {
        /// File UUID
        id: String,
        /// Target backend name
        backend: String,
        /// Target path relative to the backend root
        path: String,
        /// Display name of the copy
        #[arg(long)]
        name: Option<String>,
    },
    /// Soft-delete a file (stored bytes are kept)
    Delete {
        /// File UUID
        id: String,
    },
    /// List registered storage backends
    Backends,
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.root.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    let result = match FileRegistry::from_config(&config).await {
        Ok(registry) => run(&registry, cli.command, &cancel).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error(&e);
            let body = ErrorResponse::from(&e);
            match serde_json::to_string_pretty(&body) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(
    registry: &FileRegistry,
    command: Commands,
    cancel: &CancellationToken,
) -> Result<(), AppError> {
    match command {
        Commands::Upload {
            file,
            name,
            backend,
            mime,
        } => {
            let display_name = match name {
                Some(name) => name,
                None => display_name_for(&file)?,
            };
            let mime = mime.or_else(|| guess_mime(&file));
            let stream = file_stream(&file).await?;
            let outcome = registry
                .upload(
                    &display_name,
                    StorageContent::Stream(stream),
                    mime,
                    backend.as_deref(),
                    cancel,
                )
                .await?;
            print_json(&outcome)?;
        }
        Commands::AddVersion {
            id,
            file,
            backend,
            mime,
        } => {
            let file_id = parse_file_id(&id)?;
            let filename = display_name_for(&file)?;
            let mime = mime.or_else(|| guess_mime(&file));
            let stream = file_stream(&file).await?;
            let outcome = registry
                .upload_version(
                    file_id,
                    &filename,
                    StorageContent::Stream(stream),
                    mime,
                    backend.as_deref(),
                    cancel,
                )
                .await?;
            print_json(&outcome)?;
        }
        Commands::Save {
            name,
            text,
            backend,
        } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    tokio::io::AsyncReadExt::read_to_string(&mut tokio::io::stdin(), &mut buf)
                        .await?;
                    buf
                }
            };
            let outcome = registry
                .save_content(&name, text, backend.as_deref(), cancel)
                .await?;
            print_json(&outcome)?;
        }
        Commands::Download {
            id,
            version,
            output,
        } => {
            let file_id = parse_file_id(&id)?;
            let download = match version {
                Some(v) => registry.download_version(file_id, v, cancel).await?,
                None => registry.download(file_id, cancel).await?,
            };
            tracing::info!(
                display_name = %download.display_name,
                mime_type = %download.mime_type,
                version = download.version_number,
                size_bytes = download.size,
                "Downloading"
            );
            match output {
                Some(path) => write_to_file(download, &path).await?,
                None => write_to_stdout(download).await?,
            }
        }
        Commands::List => {
            print_json(&registry.list_files().await?)?;
        }
        Commands::Get { id } => {
            print_json(&registry.get_file(parse_file_id(&id)?).await?)?;
        }
        Commands::Versions { id } => {
            print_json(&registry.list_versions(parse_file_id(&id)?).await?)?;
        }
        Commands::Move { id, backend, path } => {
            let outcome = registry
                .move_file(parse_file_id(&id)?, &backend, &path, cancel)
                .await?;
            print_json(&outcome)?;
        }
        Commands::Copy {
            id,
            backend,
            path,
            name,
        } => {
            let outcome = registry
                .copy_file(parse_file_id(&id)?, &backend, &path, name.as_deref(), cancel)
                .await?;
            print_json(&outcome)?;
        }
        Commands::Delete { id } => {
            let file_id = parse_file_id(&id)?;
            registry.soft_delete(file_id).await?;
            print_json(&serde_json::json!({ "success": true, "id": file_id }))?;
        }
        Commands::Backends => {
            print_json(&registry.storage().adapter_names())?;
        }
    }

    Ok(())
}

async fn write_to_file(download: Download, path: &Path) -> Result<(), AppError> {
    let mut out = tokio::fs::File::create(path).await?;
    let result = copy_stream(download, &mut out).await;
    if result.is_err() {
        drop(out);
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial download");
        }
    }
    result
}

async fn write_to_stdout(download: Download) -> Result<(), AppError> {
    let mut out = tokio::io::stdout();
    copy_stream(download, &mut out).await
}

async fn copy_stream<W>(download: Download, out: &mut W) -> Result<(), AppError>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut stream = download.stream;
    while let Some(chunk) = stream.next().await {
        out.write_all(&chunk?).await?;
    }
    out.flush().await?;
    Ok(())
}
