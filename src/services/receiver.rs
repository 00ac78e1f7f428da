use crate::models::UploadedFile;
use crate::utils::validation::{DEFAULT_UPLOAD_NAME, sanitize_filename};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{info, warn};

/// Persists multipart file parts under `<timestamp>_<sanitized-name>`.
///
/// Timestamps are Unix milliseconds, bumped forward whenever two parts arrive
/// within the same millisecond, so every stored name issued by one receiver is
/// distinct.
pub struct FileReceiver {
    upload_dir: PathBuf,
    compressed_dir: PathBuf,
    last_timestamp: AtomicI64,
}

impl FileReceiver {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        let upload_dir = upload_dir.into();
        let compressed_dir = upload_dir.join("compressed");
        Self {
            upload_dir,
            compressed_dir,
            last_timestamp: AtomicI64::new(0),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn compressed_dir(&self) -> &Path {
        &self.compressed_dir
    }

    /// Creates the upload and `compressed` directories. Idempotent.
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.compressed_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create upload directory {}",
                    self.compressed_dir.display()
                )
            })
    }

    /// Next strictly increasing millisecond timestamp.
    pub fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last_timestamp.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_timestamp.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    /// Writes the whole stream to the upload directory.
    ///
    /// A failed write removes whatever was written so far.
    pub async fn store<R>(&self, original_name: Option<&str>, mut reader: R) -> Result<UploadedFile>
    where
        R: AsyncRead + Unpin,
    {
        let original_name = original_name
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_NAME)
            .to_string();
        let sanitized_name = sanitize_filename(&original_name);
        let stored_name = format!("{}_{}", self.next_timestamp(), sanitized_name);
        let path = self.upload_dir.join(&stored_name);

        let size = match write_stream(&path, &mut reader).await {
            Ok(size) => size,
            Err(e) => {
                if tokio::fs::remove_file(&path).await.is_ok() {
                    warn!("🧹 Removed partially written upload {}", path.display());
                }
                return Err(e);
            }
        };

        let stored_path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
        info!("💾 Saved: {} ({} bytes)", stored_path.display(), size);

        Ok(UploadedFile {
            original_name,
            sanitized_name,
            stored_name,
            stored_path,
            size,
        })
    }

    /// Per-upload output path for the normalized PDF.
    pub fn compressed_path_for(&self, file: &UploadedFile) -> PathBuf {
        self.compressed_dir.join(&file.stored_name)
    }
}

async fn write_stream<R>(path: &Path, reader: &mut R) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let size = tokio::io::copy(reader, &mut file)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.flush().await?;
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio_util::io::StreamReader;

    #[tokio::test]
    async fn test_store_writes_all_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = FileReceiver::new(dir.path());
        receiver.ensure_dirs().await.unwrap();

        let data = b"Hello, this is a test file content!".to_vec();
        let file = receiver
            .store(Some("my notes.txt"), Cursor::new(data.clone()))
            .await
            .unwrap();

        assert_eq!(file.original_name, "my notes.txt");
        assert_eq!(file.sanitized_name, "my_notes.txt");
        assert!(file.stored_name.ends_with("_my_notes.txt"));
        assert_eq!(file.size, data.len() as u64);
        assert!(file.stored_path.is_absolute());
        assert_eq!(std::fs::read(&file.stored_path).unwrap(), data);
    }

    #[tokio::test]
    async fn test_same_name_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = FileReceiver::new(dir.path());
        receiver.ensure_dirs().await.unwrap();

        let a = receiver
            .store(Some("screenshot.png"), Cursor::new(vec![1u8]))
            .await
            .unwrap();
        let b = receiver
            .store(Some("screenshot.png"), Cursor::new(vec![2u8]))
            .await
            .unwrap();

        assert_ne!(a.stored_path, b.stored_path);
        assert_eq!(std::fs::read(&a.stored_path).unwrap(), vec![1u8]);
        assert_eq!(std::fs::read(&b.stored_path).unwrap(), vec![2u8]);
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let receiver = FileReceiver::new("/unused");
        let mut previous = receiver.next_timestamp();
        for _ in 0..1000 {
            let next = receiver.next_timestamp();
            assert!(next > previous);
            previous = next;
        }
    }

    #[tokio::test]
    async fn test_missing_name_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = FileReceiver::new(dir.path());
        receiver.ensure_dirs().await.unwrap();

        let file = receiver.store(None, Cursor::new(vec![0u8; 4])).await.unwrap();
        assert_eq!(file.sanitized_name, DEFAULT_UPLOAD_NAME);
    }

    #[tokio::test]
    async fn test_ensure_dirs_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = FileReceiver::new(dir.path().join("uploads"));
        receiver.ensure_dirs().await.unwrap();
        receiver.ensure_dirs().await.unwrap();
        assert!(receiver.compressed_dir().is_dir());
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = FileReceiver::new(dir.path());
        receiver.ensure_dirs().await.unwrap();

        let chunks: Vec<std::io::Result<Cursor<Vec<u8>>>> = vec![
            Ok(Cursor::new(b"partial".to_vec())),
            Err(std::io::Error::other("connection reset")),
        ];
        let reader = StreamReader::new(futures::stream::iter(chunks));

        assert!(receiver.store(Some("broken.pdf"), reader).await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .collect();
        assert!(leftovers.is_empty());
    }
}
