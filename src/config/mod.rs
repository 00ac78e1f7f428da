use std::env;
use std::path::{Path, PathBuf};

/// Placeholder written into freshly generated properties files.
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Service configuration, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port (default: 8084)
    pub port: u16,

    /// Directory receiving uploads (default: `$HOME/uploads`)
    pub upload_dir: PathBuf,

    /// Maximum request body size in bytes (default: 64 MB)
    pub max_upload_size: usize,

    /// Gemini API key. `None` means every AI request fails with a descriptive error.
    pub gemini_api_key: Option<String>,

    /// Gemini model name (default: "gemini-2.5-flash")
    pub gemini_model: String,

    /// Gemini API base URL
    pub gemini_base_url: String,

    /// Prompt sent alongside the file when the request carries no question
    pub default_prompt: String,

    /// Timeout for the whole AI request in seconds (default: 120)
    pub request_timeout_secs: u64,

    /// PNG uploads larger than this in either dimension are downscaled (default: 1920)
    pub max_image_dimension: u32,

    /// Age after which stored uploads are swept, in hours. 0 disables the sweeper.
    pub upload_retention_hours: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8084,
            upload_dir: default_upload_dir(),
            max_upload_size: 64 * 1024 * 1024, // 64 MB
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            default_prompt: "please answer this".to_string(),
            request_timeout_secs: 120,
            max_image_dimension: 1920,
            upload_retention_hours: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// The API key comes from `GEMINI_API_KEY`, or else from the `apikey` entry of
    /// the properties file named by `CONFIG_FILE` (default: `config.properties`).
    pub fn from_env() -> Self {
        let default = Self::default();

        let config_file =
            env::var("CONFIG_FILE").unwrap_or_else(|_| "config.properties".to_string());
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .and_then(|k| normalize_api_key(&k))
            .or_else(|| read_api_key_file(Path::new(&config_file)));

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            gemini_api_key,

            gemini_model: env::var("GEMINI_MODEL").unwrap_or(default.gemini_model),

            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or(default.gemini_base_url),

            default_prompt: env::var("DEFAULT_PROMPT").unwrap_or(default.default_prompt),

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.request_timeout_secs),

            max_image_dimension: env::var("MAX_IMAGE_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_image_dimension),

            upload_retention_hours: env::var("UPLOAD_RETENTION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.upload_retention_hours),
        }
    }

    /// Create config for local development and tests (no API key, no sweeper)
    pub fn development(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            request_timeout_secs: 30,
            ..Self::default()
        }
    }

    /// Directory holding normalized PDF outputs
    pub fn compressed_dir(&self) -> PathBuf {
        self.upload_dir.join("compressed")
    }
}

fn default_upload_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("uploads")
}

fn normalize_api_key(raw: &str) -> Option<String> {
    let key = raw.trim();
    if key.is_empty() || key == API_KEY_PLACEHOLDER {
        None
    } else {
        Some(key.to_string())
    }
}

/// Reads the `apikey` entry from a `key=value` properties file.
pub fn read_api_key_file(path: &Path) -> Option<String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("No properties file at {}: {}", path.display(), e);
            return None;
        }
    };

    entries
        .filter_map(Result::ok)
        .find(|(key, _)| key == "apikey")
        .and_then(|(_, value)| normalize_api_key(&value))
}
