//! Relative path validation and stored-name generation shared by all adapters.

use std::path::{Component, Path};

use crate::traits::{StorageError, StorageResult};

const MAX_FILENAME_LENGTH: usize = 255;

/// Reject relative paths that could escape an adapter's root.
///
/// Empty paths, absolute paths, and any `..` component are refused.
pub fn validate_relative_path(relative_path: &str) -> StorageResult<()> {
    if relative_path.trim().is_empty() {
        return Err(StorageError::InvalidKey(
            "Storage key must not be empty".to_string(),
        ));
    }

    if relative_path.starts_with('/') || relative_path.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key must be relative: {}",
            relative_path
        )));
    }

    for component in Path::new(relative_path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(StorageError::InvalidKey(format!(
                    "Storage key contains path traversal: {}",
                    relative_path
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidKey(format!(
                    "Storage key must be relative: {}",
                    relative_path
                )))
            }
        }
    }

    Ok(())
}

/// Derive a collision-resistant stored filename from an uploaded name.
///
/// Produces `{millis}-{uuid8}-{safe}` where `safe` is the base name with every
/// character outside `[A-Za-z0-9._-]` replaced by `_`. The whole name stays
/// within 255 bytes; long names lose the end of their stem
/// but keep the extension.
pub fn stored_filename(original_name: &str, timestamp_millis: i64) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or("file");

    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let unique = uuid::Uuid::new_v4().simple().to_string();
    let prefix = format!("{}-{}-", timestamp_millis, &unique[..8]);
    let budget = MAX_FILENAME_LENGTH.saturating_sub(prefix.len());
    format!("{}{}", prefix, truncate_keeping_extension(&safe, budget))
}

/// Cut an ASCII name to `max` bytes, keeping a short extension intact.
fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= max / 2 => {
            let extension = &name[dot..];
            format!("{}{}", &name[..max - extension.len()], extension)
        }
        _ => name[..max].to_string(),
    }
}

/// Last path segment of a relative path.
pub fn file_name(relative_path: &str) -> &str {
    relative_path
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(relative_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_relative_paths() {
        assert!(validate_relative_path("2024/a.txt").is_ok());
        assert!(validate_relative_path("./a.txt").is_ok());
        assert!(validate_relative_path("deep/er/still/file.bin").is_ok());
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(validate_relative_path("").is_err());
        assert!(validate_relative_path("/etc/passwd").is_err());
        assert!(validate_relative_path("../outside").is_err());
        assert!(validate_relative_path("a/../../b").is_err());
    }

    #[test]
    fn stored_filename_is_prefixed_and_sanitized() {
        let name = stored_filename("my report (final).pdf", 1_700_000_000_000);
        assert!(name.starts_with("1700000000000-"));
        assert!(name.ends_with("-my_report__final_.pdf"));
        assert!(validate_relative_path(&name).is_ok());
    }

    #[test]
    fn stored_filename_strips_directories() {
        let name = stored_filename("../../etc/passwd", 1);
        assert!(name.ends_with("-passwd"));
        let fallback = stored_filename("", 1);
        assert!(fallback.ends_with("-file"));
    }

    #[test]
    fn long_names_are_cut_to_fit_with_their_extension() {
        let long = format!("{}.pdf", "a".repeat(246));
        let name = stored_filename(&long, 1_700_000_000_000);
        assert_eq!(name.len(), MAX_FILENAME_LENGTH);
        assert!(name.ends_with("aaa.pdf"));

        let no_extension = stored_filename(&"b".repeat(400), 1_700_000_000_000);
        assert_eq!(no_extension.len(), MAX_FILENAME_LENGTH);

        let multibyte = stored_filename(&"é".repeat(300), 1);
        assert!(multibyte.len() <= MAX_FILENAME_LENGTH);
    }

    #[test]
    fn stored_filenames_do_not_collide_within_one_millisecond() {
        assert_ne!(stored_filename("a.txt", 5), stored_filename("a.txt", 5));
    }

    #[test]
    fn file_name_takes_last_segment() {
        assert_eq!(file_name("backups/2024/doc.txt"), "doc.txt");
        assert_eq!(file_name("doc.txt"), "doc.txt");
        assert_eq!(file_name("dir/"), "dir");
    }
}
