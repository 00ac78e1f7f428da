//! Pure formatting of the response body. No I/O happens here.

use crate::models::{CompressionStatus, ReportKind, ReportLine};
use std::fmt::Write;

pub const RESULTS_HEADER: &str = "Compression Results:";

/// Human-readable size using binary units with two decimals.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    let gb = mb / 1024.0;

    if gb >= 1.0 {
        format!("{:.2} GB", gb)
    } else if mb >= 1.0 {
        format!("{:.2} MB", mb)
    } else if kb >= 1.0 {
        format!("{:.2} KB", kb)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Integer percentage saved; 0 for empty originals or growth.
pub fn reduction_percent(original: u64, new: u64) -> u64 {
    if original == 0 {
        return 0;
    }
    original.saturating_sub(new) * 100 / original
}

pub fn render_line(line: &ReportLine) -> String {
    match &line.kind {
        ReportKind::Failed(reason) => {
            format!("✗ {}: {}", line.name, reason)
        }
        ReportKind::Outcome(outcome) => {
            let (mark, label) = match outcome.status {
                CompressionStatus::Compressed => ("✓", "Compressed"),
                CompressionStatus::FallbackCopied(_) => ("≈", "Stored as-is"),
                CompressionStatus::Skipped => ("-", "Stored as-is"),
            };
            let mut rendered = format!(
                "{} {}: {} → {} ({}% reduction)",
                mark,
                line.name,
                format_size(outcome.original_size),
                format_size(outcome.compressed_size),
                reduction_percent(outcome.original_size, outcome.compressed_size)
            );
            if let CompressionStatus::FallbackCopied(reason) = &outcome.status {
                let _ = write!(rendered, " [{}]", reason);
            }
            let _ = write!(
                rendered,
                "\n  {}: {}",
                label,
                outcome.output_path.display()
            );
            rendered
        }
    }
}

/// Answer text first, then a "Compression Results" section when anything was processed.
pub fn render_report(answer: &str, lines: &[ReportLine]) -> String {
    let mut body = String::with_capacity(answer.len() + 128 * lines.len());
    body.push_str(answer);
    body.push('\n');

    if !lines.is_empty() {
        body.push('\n');
        body.push_str(RESULTS_HEADER);
        body.push('\n');
        for line in lines {
            body.push_str(&render_line(line));
            body.push('\n');
        }
    }

    body
}
