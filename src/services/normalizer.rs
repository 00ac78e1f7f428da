//! Best-effort lossless PDF compression.
//!
//! Every fallible step degrades to copying the original bytes, so a usable
//! output exists whenever the input existed and was non-empty. Only I/O
//! failures of that copy are reported as errors.

use crate::models::{CompressionOutcome, CompressionQuality, CompressionStatus, FallbackReason};
use crate::utils::validation::{PDF_MAGIC, has_pdf_magic};
use anyhow::{Context, Result};
use lopdf::Document;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub struct PdfNormalizer;

impl PdfNormalizer {
    /// Runs [`PdfNormalizer::normalize_blocking`] on the blocking thread pool.
    pub async fn normalize(
        input: PathBuf,
        output: PathBuf,
        quality: CompressionQuality,
    ) -> Result<CompressionOutcome> {
        tokio::task::spawn_blocking(move || Self::normalize_blocking(&input, &output, quality))
            .await
            .context("PDF normalization task failed")?
    }

    pub fn normalize_blocking(
        input: &Path,
        output: &Path,
        quality: CompressionQuality,
    ) -> Result<CompressionOutcome> {
        let original_size = match fs::metadata(input) {
            Ok(meta) => meta.len(),
            Err(_) => {
                warn!("Input {} does not exist, nothing to compress", input.display());
                return Ok(outcome(input, output, 0, 0, CompressionStatus::Skipped));
            }
        };

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        if original_size == 0 {
            warn!("Input {} is empty, copying as-is", input.display());
            copy_original(input, output)?;
            return Ok(outcome(input, output, 0, 0, CompressionStatus::Skipped));
        }

        let header = read_header(input)?;
        if !has_pdf_magic(&header) {
            warn!(
                "{} doesn't start with a PDF header, skipping compression",
                input.display()
            );
            return fallback(input, output, original_size, FallbackReason::NotPdf);
        }

        info!(
            "🗜️  Compressing {} ({} bytes, quality {:.2})",
            input.display(),
            original_size,
            quality.value()
        );

        if let Err(reason) = compress_document(input, output) {
            match &reason {
                FallbackReason::Corrupt(msg) => warn!(
                    "PDF appears to be corrupted and cannot be compressed ({}), using original file",
                    msg
                ),
                FallbackReason::Encrypted => {
                    warn!("PDF is encrypted, using original file without compression")
                }
                other => error!("Error compressing PDF: {}", other),
            }
            return fallback(input, output, original_size, reason);
        }

        let compressed_size = fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if compressed_size == 0 {
            warn!("Compressed file is empty or was not created, using original file");
            return fallback(input, output, original_size, FallbackReason::EmptyOutput);
        }
        if compressed_size > original_size {
            info!(
                "Rewrite grew {} from {} to {} bytes, keeping original",
                input.display(),
                original_size,
                compressed_size
            );
            return fallback(input, output, original_size, FallbackReason::NoReduction);
        }

        info!(
            "✅ PDF compressed: {} -> {} bytes",
            original_size, compressed_size
        );
        Ok(outcome(
            input,
            output,
            original_size,
            compressed_size,
            CompressionStatus::Compressed,
        ))
    }
}

/// Parse, prune, Flate-compress and re-save.
fn compress_document(input: &Path, output: &Path) -> std::result::Result<(), FallbackReason> {
    let mut doc = Document::load(input).map_err(|e| classify_error(&e.to_string()))?;

    if doc.is_encrypted() {
        return Err(FallbackReason::Encrypted);
    }

    doc.prune_objects();
    doc.delete_zero_length_streams();
    doc.compress();

    doc.save(output)
        .map_err(|e| FallbackReason::Unknown(format!("Failed to save compressed PDF: {}", e)))?;
    Ok(())
}

/// Maps a parser error message onto a fallback reason.
pub fn classify_error(message: &str) -> FallbackReason {
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") || lower.contains("decrypt") {
        FallbackReason::Encrypted
    } else if ["trailer", "xref", "root", "invalid", "parse", "corrupt", "header", "eof"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        FallbackReason::Corrupt(message.to_string())
    } else {
        FallbackReason::Unknown(message.to_string())
    }
}

fn read_header(input: &Path) -> Result<Vec<u8>> {
    let mut header = Vec::with_capacity(PDF_MAGIC.len());
    fs::File::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut header)?;
    Ok(header)
}

fn fallback(
    input: &Path,
    output: &Path,
    original_size: u64,
    reason: FallbackReason,
) -> Result<CompressionOutcome> {
    let copied = copy_original(input, output)?;
    info!("Using original file ({} bytes) without compression", copied);
    Ok(outcome(
        input,
        output,
        original_size,
        copied,
        CompressionStatus::FallbackCopied(reason),
    ))
}

fn copy_original(input: &Path, output: &Path) -> Result<u64> {
    if output.exists() {
        let _ = fs::remove_file(output);
    }
    fs::copy(input, output).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            input.display(),
            output.display()
        )
    })
}

fn outcome(
    input: &Path,
    output: &Path,
    original_size: u64,
    compressed_size: u64,
    status: CompressionStatus,
) -> CompressionOutcome {
    CompressionOutcome {
        input_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
        original_size,
        compressed_size,
        status,
    }
}
