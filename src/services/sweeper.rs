use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::sleep;

/// Deletes stored uploads and compressed outputs older than the retention period.
pub struct UploadSweeper {
    dirs: Vec<PathBuf>,
    retention: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl UploadSweeper {
    pub fn new(
        upload_dir: PathBuf,
        compressed_dir: PathBuf,
        retention: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            dirs: vec![upload_dir, compressed_dir],
            retention,
            interval: Duration::from_secs(3600),
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Upload sweeper started (retention: {}h)",
            self.retention.as_secs() / 3600
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Upload sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep().await;
                }
            }
        }
    }

    /// Returns the number of files removed.
    pub async fn sweep(&self) -> usize {
        let Some(cutoff) = SystemTime::now().checked_sub(self.retention) else {
            return 0;
        };

        tracing::info!("🧹 Sweeping uploads...");
        let mut removed = 0;

        for dir in &self.dirs {
            let mut entries = match tokio::fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", dir.display(), e);
                    continue;
                }
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                let Ok(meta) = entry.metadata().await else {
                    continue;
                };
                if !meta.is_file() {
                    continue;
                }
                let expired = meta.modified().map(|m| m <= cutoff).unwrap_or(false);
                if !expired {
                    continue;
                }

                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::error!("Failed to remove {}: {}", entry.path().display(), e)
                    }
                }
            }
        }

        tracing::info!("✅ Upload sweep completed, {} file(s) removed", removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("compressed")).unwrap();
        std::fs::write(dir.path().join("1_a.png"), b"a").unwrap();
        std::fs::write(dir.path().join("compressed").join("1_b.pdf"), b"b").unwrap();

        let (_tx, rx) = watch::channel(false);
        let sweeper = UploadSweeper::new(
            dir.path().to_path_buf(),
            dir.path().join("compressed"),
            Duration::ZERO,
            rx,
        );

        assert_eq!(sweeper.sweep().await, 2);
        assert!(!dir.path().join("1_a.png").exists());
        assert!(dir.path().join("compressed").is_dir());
    }

    #[tokio::test]
    async fn test_sweep_keeps_recent_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1_a.png"), b"a").unwrap();

        let (_tx, rx) = watch::channel(false);
        let sweeper = UploadSweeper::new(
            dir.path().to_path_buf(),
            dir.path().join("compressed"),
            Duration::from_secs(3600),
            rx,
        );

        assert_eq!(sweeper.sweep().await, 0);
        assert!(dir.path().join("1_a.png").exists());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = watch::channel(false);
        let sweeper = UploadSweeper::new(
            dir.path().to_path_buf(),
            dir.path().join("compressed"),
            Duration::from_secs(60),
            rx,
        );

        let handle = tokio::spawn(sweeper.run());
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
