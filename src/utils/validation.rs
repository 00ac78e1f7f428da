/// Name used when a file part carries no filename
pub const DEFAULT_UPLOAD_NAME: &str = "upload.dat";

/// `%PDF`
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Replaces every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Path separators are replaced like any other character, so the result can
/// never escape the upload directory.
pub fn sanitize_filename(filename: &str) -> String {
    if filename.is_empty() {
        return DEFAULT_UPLOAD_NAME.to_string();
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path-like upload filename sanitized: {}", filename);
    }

    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Whether the client-supplied name ends in `.pdf`, case-insensitively.
pub fn is_pdf_name(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

pub fn has_pdf_magic(header: &[u8]) -> bool {
    header.starts_with(PDF_MAGIC)
}
