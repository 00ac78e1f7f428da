use std::fmt;
use std::path::PathBuf;

/// A multipart file part that has been written completely to disk.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub sanitized_name: String,
    /// `<timestamp>_<sanitized_name>`
    pub stored_name: String,
    pub stored_path: PathBuf,
    pub size: u64,
}

impl UploadedFile {
    pub fn is_pdf(&self) -> bool {
        crate::utils::validation::is_pdf_name(&self.original_name)
    }
}

/// Why the normalizer kept the original bytes instead of a compressed rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Missing `%PDF` magic header
    NotPdf,
    /// Broken trailer, xref table or root object
    Corrupt(String),
    Encrypted,
    Unknown(String),
    /// The rewrite produced no bytes
    EmptyOutput,
    /// The rewrite was larger than the original
    NoReduction,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NotPdf => write!(f, "not a PDF"),
            FallbackReason::Corrupt(msg) => write!(f, "corrupted PDF: {}", msg),
            FallbackReason::Encrypted => write!(f, "encrypted PDF"),
            FallbackReason::Unknown(msg) => write!(f, "{}", msg),
            FallbackReason::EmptyOutput => write!(f, "compressed output was empty"),
            FallbackReason::NoReduction => write!(f, "no size reduction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionStatus {
    Compressed,
    FallbackCopied(FallbackReason),
    /// Input missing or empty, nothing worth compressing
    Skipped,
}

/// Result of normalizing one PDF. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
    pub status: CompressionStatus,
}

impl CompressionOutcome {
    /// Path holding usable bytes for downstream consumers, if any.
    pub fn usable_path(&self) -> Option<&PathBuf> {
        match self.status {
            CompressionStatus::Skipped if self.compressed_size == 0 => None,
            _ => Some(&self.output_path),
        }
    }
}

/// Compression quality, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CompressionQuality(f32);

impl CompressionQuality {
    pub const MIN: f32 = 0.1;
    pub const MAX: f32 = 1.0;
    pub const DEFAULT: f32 = 0.5;

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    /// Parses a form value; anything that is not a float yields the default.
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<f32>()
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for CompressionQuality {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// One entry of the "Compression Results" section.
#[derive(Debug, Clone)]
pub struct ReportLine {
    pub name: String,
    pub kind: ReportKind,
}

#[derive(Debug, Clone)]
pub enum ReportKind {
    Outcome(CompressionOutcome),
    Failed(String),
}

impl ReportLine {
    pub fn outcome(name: impl Into<String>, outcome: CompressionOutcome) -> Self {
        Self {
            name: name.into(),
            kind: ReportKind::Outcome(outcome),
        }
    }

    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ReportKind::Failed(reason.into()),
        }
    }
}

/// State collected while walking the parts of one upload request.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub quality: CompressionQuality,
    pub question: Option<String>,
    /// File parts that could not be stored, with the reason
    pub rejected: Vec<ReportLine>,
}
