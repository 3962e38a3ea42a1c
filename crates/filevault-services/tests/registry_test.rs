//! End-to-end registry tests over real local adapters in a temp directory.

use std::sync::Arc;

use async_trait::async_trait;
use filevault_core::{AppError, Config, File, NewVersion, PhysicalMetadata, StorageType};
use filevault_services::{
    ByteStream, CancellationToken, FileRegistry, FileRepository, InMemoryFileRepository,
    LocalAdapter, StorageAdapter, StorageContent, StorageError, StorageManager, StorageResult,
};
use filevault_storage::stream::collect;
use tempfile::{tempdir, TempDir};

struct Fixture {
    registry: Arc<FileRegistry>,
    repo: Arc<InMemoryFileRepository>,
    local: Arc<dyn StorageAdapter>,
    remote: Arc<dyn StorageAdapter>,
    _dir: TempDir,
}

async fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let remote: Arc<dyn StorageAdapter> =
        Arc::new(LocalAdapter::new(dir.path().join("remote")).await.unwrap());
    fixture_with(dir, remote).await
}

async fn fixture_with(dir: TempDir, remote: Arc<dyn StorageAdapter>) -> Fixture {
    let mut manager = StorageManager::new(dir.path().join("uploads")).await.unwrap();
    manager.register_adapter("REMOTE", remote.clone());
    let local = manager.get_adapter("LOCAL").unwrap();
    let repo = Arc::new(InMemoryFileRepository::new());
    let registry = FileRegistry::new(Arc::new(manager), repo.clone());

    Fixture {
        registry: Arc::new(registry),
        repo,
        local,
        remote,
        _dir: dir,
    }
}

fn bytes(data: &[u8]) -> StorageContent {
    data.to_vec().into()
}

async fn read_all(stream: ByteStream) -> Vec<u8> {
    collect(stream).await.unwrap()
}

#[tokio::test]
async fn test_repeated_uploads_number_versions_without_gaps() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();

    let mut file_id = None;
    for n in 1..=5u32 {
        let outcome = fx
            .registry
            .upload(
                "notes.txt",
                bytes(format!("draft {}", n).as_bytes()),
                Some("text/plain".to_string()),
                None,
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(outcome.version_number, n);
        assert_eq!(outcome.created, n == 1);
        assert_eq!(*file_id.get_or_insert(outcome.file_id), outcome.file_id);

        let file = fx.registry.get_file(outcome.file_id).await.unwrap();
        assert_eq!(file.current_version, n);
    }

    let versions = fx.registry.list_versions(file_id.unwrap()).await.unwrap();
    let numbers: Vec<u32> = versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_report_uploaded_twice_serves_latest() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();

    let first = fx
        .registry
        .upload("report.pdf", bytes(b"first draft"), Some("application/pdf".into()), None, &cancel)
        .await
        .unwrap();
    let second = fx
        .registry
        .upload("report.pdf", bytes(b"final"), Some("application/pdf".into()), None, &cancel)
        .await
        .unwrap();

    assert_eq!(first.version_number, 1);
    assert_eq!(second.version_number, 2);
    assert_eq!(first.file_id, second.file_id);

    let versions = fx.registry.list_versions(first.file_id).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version, 1);
    assert_eq!(versions[0].size, 11);
    assert_eq!(versions[1].version, 2);
    assert_eq!(versions[1].size, 5);
    assert_ne!(versions[0].relative_path, versions[1].relative_path);

    let download = fx.registry.download(first.file_id, &cancel).await.unwrap();
    assert_eq!(download.display_name, "report.pdf");
    assert_eq!(download.mime_type, "application/pdf");
    assert_eq!(download.version_number, 2);
    assert_eq!(read_all(download.stream).await, b"final");

    let old = fx
        .registry
        .download_version(first.file_id, 1, &cancel)
        .await
        .unwrap();
    assert_eq!(read_all(old.stream).await, b"first draft");

    assert!(matches!(
        fx.registry.download_version(first.file_id, 3, &cancel).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_upload_to_unknown_backend_records_nothing() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();

    let result = fx
        .registry
        .upload("a.txt", bytes(b"abc"), None, Some("CLOUD"), &cancel)
        .await;

    assert!(matches!(result, Err(AppError::AdapterNotRegistered(name)) if name == "CLOUD"));
    assert!(fx.registry.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_with_empty_name_is_rejected() {
    let fx = fixture().await;
    let result = fx
        .registry
        .upload("  ", bytes(b"abc"), None, None, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_backend_names_are_case_insensitive_and_recorded_canonically() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();

    let outcome = fx
        .registry
        .upload("remote.txt", bytes(b"far away"), None, Some("remote"), &cancel)
        .await
        .unwrap();

    let file = fx.registry.get_file(outcome.file_id).await.unwrap();
    assert_eq!(file.versions[0].backend, "REMOTE");
    assert!(fx
        .remote
        .exists(&file.versions[0].relative_path)
        .await
        .unwrap());

    let download = fx.registry.download(outcome.file_id, &cancel).await.unwrap();
    assert_eq!(download.mime_type, "application/octet-stream");
    assert_eq!(read_all(download.stream).await, b"far away");
}

#[tokio::test]
async fn test_soft_delete_hides_file_but_keeps_history_and_bytes() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();

    let kept = fx
        .registry
        .upload("kept.txt", bytes(b"k"), None, None, &cancel)
        .await
        .unwrap();
    let gone = fx
        .registry
        .upload("gone.txt", bytes(b"g"), None, None, &cancel)
        .await
        .unwrap();

    fx.registry.soft_delete(gone.file_id).await.unwrap();
    // Deleting twice is fine.
    fx.registry.soft_delete(gone.file_id).await.unwrap();

    let listed: Vec<_> = fx
        .registry
        .list_files()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(listed, vec![kept.file_id]);

    let versions = fx.registry.list_versions(gone.file_id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert!(fx.local.exists(&versions[0].relative_path).await.unwrap());

    assert!(matches!(
        fx.registry.download(gone.file_id, &cancel).await,
        Err(AppError::NotFound(_))
    ));

    // A new upload under the deleted name starts a fresh file.
    let again = fx
        .registry
        .upload("gone.txt", bytes(b"back"), None, None, &cancel)
        .await
        .unwrap();
    assert_ne!(again.file_id, gone.file_id);
    assert_eq!(again.version_number, 1);
}

#[tokio::test]
async fn test_soft_delete_of_unknown_file_is_not_found() {
    let fx = fixture().await;
    assert!(matches!(
        fx.registry.soft_delete(uuid::Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_move_across_backends_rewrites_location_in_place() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let uploaded = fx
        .registry
        .upload("big.bin", bytes(&[7u8; 4096]), None, None, &cancel)
        .await
        .unwrap();
    let before = fx.registry.get_file(uploaded.file_id).await.unwrap();
    let old_path = before.versions[0].relative_path.clone();

    let moved = fx
        .registry
        .move_file(uploaded.file_id, "REMOTE", "archive/big.bin", &cancel)
        .await
        .unwrap();

    assert_eq!(moved.version_number, 1);
    assert_eq!(moved.backend, "REMOTE");
    assert_eq!(moved.location.relative_path, "archive/big.bin");
    assert!(!fx.local.exists(&old_path).await.unwrap());

    let after = fx.registry.get_file(uploaded.file_id).await.unwrap();
    let version = &after.versions[0];
    assert_eq!(version.version, 1);
    assert_eq!(version.backend, "REMOTE");
    assert_eq!(version.relative_path, "archive/big.bin");
    assert_eq!(version.filename, before.versions[0].filename);
    assert_eq!(version.size, 4096);

    let download = fx.registry.download(uploaded.file_id, &cancel).await.unwrap();
    assert_eq!(read_all(download.stream).await, vec![7u8; 4096]);
}

#[tokio::test]
async fn test_move_within_local_backend() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let uploaded = fx
        .registry
        .upload("doc.txt", bytes(b"original content"), None, None, &cancel)
        .await
        .unwrap();

    fx.registry
        .move_file(uploaded.file_id, "local", "new/doc.txt", &cancel)
        .await
        .unwrap();

    let stream = fx.local.read_stream("new/doc.txt", &cancel).await.unwrap();
    assert_eq!(read_all(stream).await, b"original content");
    let file = fx.registry.get_file(uploaded.file_id).await.unwrap();
    assert_eq!(file.versions[0].backend, "LOCAL");
    assert_eq!(file.versions[0].relative_path, "new/doc.txt");
}

#[tokio::test]
async fn test_move_only_relocates_current_version() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let id = fx
        .registry
        .upload("v.txt", bytes(b"one"), None, None, &cancel)
        .await
        .unwrap()
        .file_id;
    fx.registry
        .upload("v.txt", bytes(b"two"), None, None, &cancel)
        .await
        .unwrap();

    fx.registry
        .move_file(id, "REMOTE", "v2.txt", &cancel)
        .await
        .unwrap();

    let versions = fx.registry.list_versions(id).await.unwrap();
    assert_eq!(versions[0].backend, "LOCAL");
    assert_eq!(versions[1].backend, "REMOTE");
    assert_eq!(versions[1].relative_path, "v2.txt");
}

#[tokio::test]
async fn test_move_and_copy_require_targets() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let id = fx
        .registry
        .upload("a.txt", bytes(b"a"), None, None, &cancel)
        .await
        .unwrap()
        .file_id;

    assert!(matches!(
        fx.registry.move_file(id, "", "x.txt", &cancel).await,
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        fx.registry.move_file(id, "REMOTE", " ", &cancel).await,
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        fx.registry.copy_file(id, "", "x.txt", None, &cancel).await,
        Err(AppError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_move_and_copy_reject_deleted_sources() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let id = fx
        .registry
        .upload("a.txt", bytes(b"a"), None, None, &cancel)
        .await
        .unwrap()
        .file_id;
    fx.registry.soft_delete(id).await.unwrap();

    assert!(matches!(
        fx.registry.move_file(id, "REMOTE", "a.txt", &cancel).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        fx.registry.copy_file(id, "REMOTE", "a.txt", None, &cancel).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_copy_creates_independent_file() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let source = fx
        .registry
        .upload("plan.md", bytes(b"v1"), Some("text/markdown".into()), None, &cancel)
        .await
        .unwrap();
    fx.registry
        .upload("plan.md", bytes(b"v2"), Some("text/markdown".into()), None, &cancel)
        .await
        .unwrap();

    let copy = fx
        .registry
        .copy_file(source.file_id, "REMOTE", "copies/plan.md", None, &cancel)
        .await
        .unwrap();

    assert_ne!(copy.file_id, source.file_id);
    assert_eq!(copy.display_name, "Copy of plan.md");

    let copied = fx.registry.get_file(copy.file_id).await.unwrap();
    assert_eq!(copied.current_version, 1);
    assert_eq!(copied.versions.len(), 1);
    assert_eq!(copied.versions[0].backend, "REMOTE");
    assert_eq!(copied.versions[0].filename, "plan.md");
    assert_eq!(copied.versions[0].mime_type.as_deref(), Some("text/markdown"));

    let download = fx.registry.download(copy.file_id, &cancel).await.unwrap();
    assert_eq!(read_all(download.stream).await, b"v2");

    // The source keeps its own history and bytes.
    assert_eq!(fx.registry.list_versions(source.file_id).await.unwrap().len(), 2);
    let original = fx.registry.download(source.file_id, &cancel).await.unwrap();
    assert_eq!(read_all(original.stream).await, b"v2");
}

#[tokio::test]
async fn test_copy_with_explicit_name() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let source = fx
        .registry
        .upload("plan.md", bytes(b"v1"), None, None, &cancel)
        .await
        .unwrap();

    let copy = fx
        .registry
        .copy_file(source.file_id, "LOCAL", "plan-2025.md", Some("plan 2025.md"), &cancel)
        .await
        .unwrap();
    assert_eq!(copy.display_name, "plan 2025.md");

    // Uploading under the copy's name appends to the copy.
    let next = fx
        .registry
        .upload("plan 2025.md", bytes(b"v2"), None, None, &cancel)
        .await
        .unwrap();
    assert_eq!(next.file_id, copy.file_id);
    assert_eq!(next.version_number, 2);
}

#[tokio::test]
async fn test_save_content_records_text_mime() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();

    let outcome = fx
        .registry
        .save_content("readme.txt", "hello".to_string(), None, &cancel)
        .await
        .unwrap();

    let download = fx.registry.download(outcome.file_id, &cancel).await.unwrap();
    assert_eq!(download.mime_type, "text/plain; charset=utf-8");
    assert_eq!(download.size, 5);
    assert_eq!(read_all(download.stream).await, b"hello");
}

#[tokio::test]
async fn test_upload_version_targets_exact_file() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let original = fx
        .registry
        .upload("a.txt", bytes(b"1"), None, None, &cancel)
        .await
        .unwrap();

    let outcome = fx
        .registry
        .upload_version(original.file_id, "a-edited.txt", bytes(b"22"), None, Some("REMOTE"), &cancel)
        .await
        .unwrap();
    assert_eq!(outcome.file_id, original.file_id);
    assert_eq!(outcome.version_number, 2);

    let file = fx.registry.get_file(original.file_id).await.unwrap();
    assert_eq!(file.original_name, "a.txt");
    assert_eq!(file.versions[1].backend, "REMOTE");
    assert!(file.versions[1].filename.ends_with("-a-edited.txt"));

    assert!(matches!(
        fx.registry
            .upload_version(uuid::Uuid::new_v4(), "x", bytes(b"x"), None, None, &cancel)
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_concurrent_uploads_of_one_name_share_one_file() {
    let fx = fixture().await;
    let mut tasks = Vec::new();
    for n in 0..8u8 {
        let registry = fx.registry.clone();
        tasks.push(tokio::spawn(async move {
            registry
                .upload("race.txt", vec![n; 16].into(), None, None, &CancellationToken::new())
                .await
                .unwrap()
        }));
    }

    let mut numbers = Vec::new();
    for task in tasks {
        numbers.push(task.await.unwrap().version_number);
    }
    numbers.sort();
    assert_eq!(numbers, (1..=8).collect::<Vec<u32>>());

    let files = fx.registry.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].versions.len(), 8);
    assert_eq!(files[0].current_version, 8);
}

#[tokio::test]
async fn test_download_falls_back_to_last_version_when_pointer_is_stale() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let location = fx
        .local
        .save("legacy.txt", bytes(b"legacy"), &cancel)
        .await
        .unwrap();

    let mut file = File::new(
        "legacy.txt",
        NewVersion {
            backend: "LOCAL".to_string(),
            filename: "legacy.txt".to_string(),
            mime_type: None,
            location,
        },
    );
    file.current_version = 9;
    fx.repo.insert(&file).await.unwrap();

    let download = fx.registry.download(file.id, &cancel).await.unwrap();
    assert_eq!(download.version_number, 1);
    assert_eq!(read_all(download.stream).await, b"legacy");
}

/// A remote whose writes always fail.
struct BrokenRemote {
    inner: LocalAdapter,
}

#[async_trait]
impl StorageAdapter for BrokenRemote {
    fn storage_type(&self) -> StorageType {
        StorageType::Network
    }

    fn base_path(&self) -> &str {
        self.inner.base_path()
    }

    async fn save(
        &self,
        _relative_path: &str,
        _content: StorageContent,
        _cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata> {
        Err(StorageError::UploadFailed("share unavailable".to_string()))
    }

    async fn read_stream(
        &self,
        relative_path: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<ByteStream> {
        self.inner.read_stream(relative_path, cancel).await
    }

    async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        self.inner.delete(relative_path).await
    }

    async fn exists(&self, relative_path: &str) -> StorageResult<bool> {
        self.inner.exists(relative_path).await
    }
}

#[tokio::test]
async fn test_failed_move_keeps_document_pointing_at_source() {
    let dir = tempdir().unwrap();
    let inner = LocalAdapter::new(dir.path().join("remote")).await.unwrap();
    let fx = fixture_with(dir, Arc::new(BrokenRemote { inner })).await;
    let cancel = CancellationToken::new();

    let id = fx
        .registry
        .upload("x.bin", bytes(b"precious"), None, None, &cancel)
        .await
        .unwrap()
        .file_id;
    let before = fx.registry.get_file(id).await.unwrap();

    let result = fx.registry.move_file(id, "REMOTE", "y.bin", &cancel).await;
    assert!(matches!(result, Err(AppError::IoFailure(_))));

    let after = fx.registry.get_file(id).await.unwrap();
    assert_eq!(after.versions, before.versions);
    assert!(fx
        .local
        .exists(&after.versions[0].relative_path)
        .await
        .unwrap());
    let download = fx.registry.download(id, &cancel).await.unwrap();
    assert_eq!(read_all(download.stream).await, b"precious");
}

#[tokio::test]
async fn test_registry_from_config_persists_across_instances() {
    let dir = tempdir().unwrap();
    let config = Config::with_root(&dir.path().display().to_string());
    let cancel = CancellationToken::new();

    let id = {
        let registry = FileRegistry::from_config(&config).await.unwrap();
        registry
            .upload("kept.txt", bytes(b"on disk"), None, None, &cancel)
            .await
            .unwrap()
            .file_id
    };

    let reopened = FileRegistry::from_config(&config).await.unwrap();
    let outcome = reopened
        .upload("kept.txt", bytes(b"again"), None, None, &cancel)
        .await
        .unwrap();
    assert_eq!(outcome.file_id, id);
    assert_eq!(outcome.version_number, 2);

    let download = reopened.download_version(id, 1, &cancel).await.unwrap();
    assert_eq!(read_all(download.stream).await, b"on disk");
}

/// A remote that takes a while to accept each write.
struct SlowRemote {
    inner: LocalAdapter,
}

#[async_trait]
impl StorageAdapter for SlowRemote {
    fn storage_type(&self) -> StorageType {
        StorageType::Network
    }

    fn base_path(&self) -> &str {
        self.inner.base_path()
    }

    async fn save(
        &self,
        relative_path: &str,
        content: StorageContent,
        cancel: &CancellationToken,
    ) -> StorageResult<PhysicalMetadata> {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        self.inner.save(relative_path, content, cancel).await
    }

    async fn read_stream(
        &self,
        relative_path: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<ByteStream> {
        self.inner.read_stream(relative_path, cancel).await
    }

    async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        self.inner.delete(relative_path).await
    }

    async fn exists(&self, relative_path: &str) -> StorageResult<bool> {
        self.inner.exists(relative_path).await
    }
}

#[tokio::test]
async fn test_soft_delete_survives_concurrent_append() {
    let dir = tempdir().unwrap();
    let inner = LocalAdapter::new(dir.path().join("remote")).await.unwrap();
    let fx = fixture_with(dir, Arc::new(SlowRemote { inner })).await;
    let cancel = CancellationToken::new();

    let id = fx
        .registry
        .upload("slow.txt", bytes(b"v1"), None, None, &cancel)
        .await
        .unwrap()
        .file_id;

    let append = {
        let registry = fx.registry.clone();
        tokio::spawn(async move {
            registry
                .upload_version(
                    id,
                    "slow.txt",
                    bytes(b"v2"),
                    None,
                    Some("REMOTE"),
                    &CancellationToken::new(),
                )
                .await
        })
    };

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    fx.registry.soft_delete(id).await.unwrap();
    append.await.unwrap().unwrap();

    let file = fx.registry.get_file(id).await.unwrap();
    assert!(file.deleted);
    assert_eq!(file.versions.len(), 2);
    assert!(fx.registry.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_with_long_display_name() {
    let fx = fixture().await;
    let cancel = CancellationToken::new();
    let long_name = format!("{}.pdf", "a".repeat(246));

    let outcome = fx
        .registry
        .upload(&long_name, bytes(b"long"), None, None, &cancel)
        .await
        .unwrap();

    let file = fx.registry.get_file(outcome.file_id).await.unwrap();
    assert_eq!(file.original_name, long_name);
    assert!(file.versions[0].relative_path.len() <= 255);
    assert!(file.versions[0].relative_path.ends_with(".pdf"));

    let download = fx.registry.download(outcome.file_id, &cancel).await.unwrap();
    assert_eq!(read_all(download.stream).await, b"long");
}
