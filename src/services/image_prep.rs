use anyhow::{Context, Result};
use image::ImageFormat;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Downscales oversized PNG screenshots before they are sent to the AI service.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreparer {
    max_dimension: u32,
}

impl ImagePreparer {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    pub fn is_png(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"))
    }

    /// Path to send downstream: the resized copy when one was written, else `path`.
    pub async fn prepare(&self, path: PathBuf) -> PathBuf {
        if !Self::is_png(&path) {
            return path;
        }

        let this = *self;
        let input = path.clone();
        match tokio::task::spawn_blocking(move || this.prepare_blocking(&input)).await {
            Ok(Ok(Some(resized))) => resized,
            Ok(Ok(None)) => path,
            Ok(Err(e)) => {
                warn!("Error compressing PNG {}: {:#}, using original", path.display(), e);
                path
            }
            Err(e) => {
                warn!("PNG preparation task failed: {}, using original", e);
                path
            }
        }
    }

    /// Writes `<stem>_compressed.png` next to the input when it exceeds the limit.
    pub fn prepare_blocking(&self, path: &Path) -> Result<Option<PathBuf>> {
        let img = image::open(path)
            .with_context(|| format!("Failed to load image {}", path.display()))?;
        let (width, height) = (img.width(), img.height());

        if width <= self.max_dimension && height <= self.max_dimension {
            return Ok(None);
        }

        let resized = img.resize(self.max_dimension, self.max_dimension, FilterType::Triangle);
        info!(
            "Resizing PNG: {}x{} -> {}x{}",
            width,
            height,
            resized.width(),
            resized.height()
        );

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let output = path.with_file_name(format!("{}_compressed.png", stem));
        resized
            .save_with_format(&output, ImageFormat::Png)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        Ok(Some(output))
    }
}
