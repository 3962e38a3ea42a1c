//! Configuration module
//!
//! Storage roots, the metadata store location, and logging settings, loaded
//! from the environment (and a `.env` file when present).

use std::env;
use std::path::{Component, Path, PathBuf};

use crate::constants::{DEFAULT_BACKEND, DEFAULT_METADATA_PATH, DEFAULT_STORAGE_PATH};

/// Output format for log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// An additional named local root registered next to the default adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedBackend {
    pub name: String,
    pub root: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory of the always-present `LOCAL` adapter.
    pub storage_path: String,
    /// Extra local roots from `STORAGE_BACKENDS`.
    pub extra_backends: Vec<NamedBackend>,
    /// Directory of the JSON document store.
    pub metadata_path: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let extra_backends = match env::var("STORAGE_BACKENDS") {
            Ok(raw) => parse_backends(&raw)?,
            Err(_) => Vec::new(),
        };

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(anyhow::anyhow!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                ))
            }
        };

        let config = Config {
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| DEFAULT_STORAGE_PATH.to_string()),
            extra_backends,
            metadata_path: env::var("METADATA_PATH")
                .unwrap_or_else(|_| DEFAULT_METADATA_PATH.to_string()),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    /// Configuration rooted at a single directory, used by tests and the CLI's
    /// `--root` flag.
    pub fn with_root(root: &str) -> Self {
        Config {
            storage_path: format!("{}/{}", root.trim_end_matches('/'), DEFAULT_STORAGE_PATH),
            extra_backends: Vec::new(),
            metadata_path: format!("{}/{}", root.trim_end_matches('/'), DEFAULT_METADATA_PATH),
            log_format: LogFormat::Text,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_path.trim().is_empty() {
            return Err(anyhow::anyhow!("STORAGE_PATH must not be empty"));
        }

        if self.metadata_path.trim().is_empty() {
            return Err(anyhow::anyhow!("METADATA_PATH must not be empty"));
        }

        let mut seen = std::collections::HashSet::new();
        for backend in &self.extra_backends {
            if backend.name == DEFAULT_BACKEND {
                return Err(anyhow::anyhow!(
                    "STORAGE_BACKENDS may not redefine the {} backend; use STORAGE_PATH",
                    DEFAULT_BACKEND
                ));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(anyhow::anyhow!(
                    "STORAGE_BACKENDS defines '{}' more than once",
                    backend.name
                ));
            }
        }

        // Overlapping roots would let one object answer to two backends, and a
        // cross-backend move between them would delete it.
        let roots: Vec<(&str, PathBuf)> =
            std::iter::once((DEFAULT_BACKEND, self.storage_path.as_str()))
                .chain(
                    self.extra_backends
                        .iter()
                        .map(|b| (b.name.as_str(), b.root.as_str())),
                )
                .map(|(name, root)| (name, root_key(root)))
                .collect();
        for (i, (name, root)) in roots.iter().enumerate() {
            for (other_name, other_root) in &roots[i + 1..] {
                if root.starts_with(other_root) || other_root.starts_with(root) {
                    return Err(anyhow::anyhow!(
                        "Storage roots of {} ({}) and {} ({}) overlap",
                        name,
                        root.display(),
                        other_name,
                        other_root.display()
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Absolute, normalized form of a storage root used to detect overlaps.
/// Existing directories are canonicalized so symlinked aliases compare equal.
fn root_key(root: &str) -> PathBuf {
    let path = Path::new(root.trim());
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Parse `NAME=path,NAME=path` into named backends. Names are upper-cased.
pub fn parse_backends(raw: &str) -> Result<Vec<NamedBackend>, anyhow::Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, root) = entry.split_once('=').ok_or_else(|| {
                anyhow::anyhow!("STORAGE_BACKENDS entry '{}' must look like NAME=path", entry)
            })?;
            let name = name.trim().to_uppercase();
            let root = root.trim().to_string();
            if name.is_empty() || root.is_empty() {
                return Err(anyhow::anyhow!(
                    "STORAGE_BACKENDS entry '{}' has an empty name or path",
                    entry
                ));
            }
            Ok(NamedBackend { name, root })
        })
        .collect()
}
